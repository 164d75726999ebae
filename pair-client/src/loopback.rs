//! In-memory "air" shared by simulated devices.
//!
//! A [`LoopbackNetwork`] places devices on a line. Each [`LoopbackDevice`]
//! implements every collaborator trait, so several pairing sessions can run
//! against each other inside one process:
//!
//! - ranging reports the beacons of other advertising devices, classified by
//!   distance
//! - discovery reports the names of other advertising devices, each once
//! - profiles travel as MessagePack bytes through per-pair mailboxes
//!
//! The ranging model is deliberately crude. Up to 0.5 m is immediate, up to
//! 3 m near, up to 30 m far, and anything beyond is out of range. Accuracy is
//! the distance itself and RSSI follows a log-distance path loss from -59 dBm
//! at one metre.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use beampair_types::{BeaconId, BeaconObservation, PeerIdentity, Proximity, UserProfile};
use futures_util::stream::{self, StreamExt};
use tokio::sync::{watch, Notify};
use tracing::debug;

use crate::collaborators::{
    BeaconStream, Collaborators, Environment, EnvironmentError, PeerFeed, PeerStream,
    ProximityFeed,
};
use crate::transport::{Transport, TransportError};

const IMMEDIATE_M: f64 = 0.5;
const NEAR_M: f64 = 3.0;
const FAR_M: f64 = 30.0;
const RSSI_AT_ONE_M: f64 = -59.0;

/// Shared medium for simulated devices.
#[derive(Clone, Default)]
pub struct LoopbackNetwork {
    shared: Arc<Shared>,
}

struct Shared {
    air: Mutex<Air>,
    changed: watch::Sender<u64>,
    mail: Notify,
}

impl Default for Shared {
    fn default() -> Self {
        Self {
            air: Mutex::new(Air::default()),
            changed: watch::channel(0).0,
            mail: Notify::new(),
        }
    }
}

#[derive(Default)]
struct Air {
    devices: Vec<Slot>,
    mailboxes: HashMap<(String, String), VecDeque<Vec<u8>>>,
}

#[derive(Default)]
struct Slot {
    position_m: f64,
    beacon: Option<BeaconId>,
    name: Option<String>,
    horizontal: bool,
    covered: bool,
}

impl Shared {
    fn air(&self) -> MutexGuard<'_, Air> {
        self.air.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn bump(&self) {
        self.changed.send_modify(|generation| *generation += 1);
    }
}

impl LoopbackNetwork {
    /// Create an empty network.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a device at `position_m` metres along the line.
    pub fn device(&self, position_m: f64) -> LoopbackDevice {
        let index = {
            let mut air = self.shared.air();
            air.devices.push(Slot {
                position_m,
                ..Slot::default()
            });
            air.devices.len() - 1
        };
        LoopbackDevice {
            shared: Arc::clone(&self.shared),
            index,
        }
    }
}

impl std::fmt::Debug for LoopbackNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopbackNetwork")
            .field("devices", &self.shared.air().devices.len())
            .finish()
    }
}

/// One simulated device on a [`LoopbackNetwork`].
#[derive(Clone)]
pub struct LoopbackDevice {
    shared: Arc<Shared>,
    index: usize,
}

impl LoopbackDevice {
    /// Move the device. Running ranging streams report the new distances.
    pub fn move_to(&self, position_m: f64) {
        self.shared.air().devices[self.index].position_m = position_m;
        self.shared.bump();
    }

    /// Set what the posture sensors report.
    pub fn set_posture(&self, horizontal: bool, covered: bool) {
        let mut air = self.shared.air();
        let slot = &mut air.devices[self.index];
        slot.horizontal = horizontal;
        slot.covered = covered;
    }

    /// Name this device advertises, once its peer feed has started.
    pub fn name(&self) -> Option<String> {
        self.shared.air().devices[self.index].name.clone()
    }

    /// Bundle this device as every collaborator of one session.
    pub fn collaborators(&self) -> Collaborators {
        let device = Arc::new(self.clone());
        Collaborators::new(device.clone(), device.clone(), device.clone(), device)
    }

    fn ranged(&self) -> Vec<BeaconObservation> {
        let air = self.shared.air();
        let me = &air.devices[self.index];
        air.devices
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != self.index)
            .filter_map(|(_, other)| {
                let beacon = other.beacon?;
                observe(beacon, (other.position_m - me.position_m).abs())
            })
            .collect()
    }

    fn other_names(&self) -> Vec<String> {
        let air = self.shared.air();
        air.devices
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != self.index)
            .filter_map(|(_, other)| other.name.clone())
            .collect()
    }

    fn own_name(&self) -> Result<String, TransportError> {
        self.name().ok_or(TransportError::NotConnected)
    }

    fn is_registered(&self, name: &str) -> bool {
        self.shared
            .air()
            .devices
            .iter()
            .any(|slot| slot.name.as_deref() == Some(name))
    }
}

impl std::fmt::Debug for LoopbackDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopbackDevice")
            .field("index", &self.index)
            .field("name", &self.name())
            .finish()
    }
}

fn observe(beacon: BeaconId, distance_m: f64) -> Option<BeaconObservation> {
    let proximity = if distance_m <= IMMEDIATE_M {
        Proximity::Immediate
    } else if distance_m <= NEAR_M {
        Proximity::Near
    } else if distance_m <= FAR_M {
        Proximity::Far
    } else {
        return None;
    };
    let rssi = (RSSI_AT_ONE_M - 20.0 * distance_m.max(0.1).log10()).round() as i32;
    Some(BeaconObservation::new(beacon, proximity, distance_m, rssi))
}

impl ProximityFeed for LoopbackDevice {
    fn start(&self, beacon: BeaconId) -> BeaconStream {
        self.shared.air().devices[self.index].beacon = Some(beacon);
        self.shared.bump();
        let changed = self.shared.changed.subscribe();
        debug!("Loopback device {} advertising beacon {}", self.index, beacon);

        stream::unfold(
            (self.clone(), changed, true),
            |(device, mut changed, first)| async move {
                if !first {
                    changed.changed().await.ok()?;
                }
                let snapshot = device.ranged();
                Some((Ok(snapshot), (device, changed, false)))
            },
        )
        .boxed()
    }
}

struct Discovery {
    device: LoopbackDevice,
    changed: watch::Receiver<u64>,
    seen: HashSet<String>,
    pending: VecDeque<String>,
}

impl PeerFeed for LoopbackDevice {
    fn start(&self, local_identifier: &str) -> PeerStream {
        self.shared.air().devices[self.index].name = Some(local_identifier.to_string());
        self.shared.bump();
        let changed = self.shared.changed.subscribe();
        debug!("Loopback device {} advertising as {}", self.index, local_identifier);

        let discovery = Discovery {
            device: self.clone(),
            changed,
            seen: HashSet::new(),
            pending: VecDeque::new(),
        };

        stream::unfold(discovery, |mut d| async move {
            loop {
                if let Some(name) = d.pending.pop_front() {
                    return Some((Ok(PeerIdentity::new(name)), d));
                }
                for name in d.device.other_names() {
                    if d.seen.insert(name.clone()) {
                        d.pending.push_back(name);
                    }
                }
                if d.pending.is_empty() {
                    d.changed.changed().await.ok()?;
                }
            }
        })
        .boxed()
    }
}

#[async_trait]
impl Transport for LoopbackDevice {
    async fn send(&self, profile: &UserProfile, to: &PeerIdentity) -> Result<(), TransportError> {
        let from = self.own_name()?;
        if !self.is_registered(&to.name) {
            return Err(TransportError::UnknownPeer(to.name.clone()));
        }
        let bytes = profile.to_bytes()?;

        self.shared
            .air()
            .mailboxes
            .entry((from, to.name.clone()))
            .or_default()
            .push_back(bytes);
        self.shared.mail.notify_waiters();
        Ok(())
    }

    async fn receive(&self, from: &PeerIdentity) -> Result<UserProfile, TransportError> {
        let me = self.own_name()?;
        let key = (from.name.clone(), me);

        loop {
            let arrived = self.shared.mail.notified();
            if !self.is_registered(&from.name) {
                return Err(TransportError::UnknownPeer(from.name.clone()));
            }
            let delivered = self
                .shared
                .air()
                .mailboxes
                .get_mut(&key)
                .and_then(VecDeque::pop_front);
            if let Some(bytes) = delivered {
                return Ok(UserProfile::from_bytes(&bytes)?);
            }
            arrived.await;
        }
    }
}

#[async_trait]
impl Environment for LoopbackDevice {
    async fn is_horizontal(&self) -> Result<bool, EnvironmentError> {
        Ok(self.shared.air().devices[self.index].horizontal)
    }

    async fn sensed_proximity(&self) -> Result<bool, EnvironmentError> {
        Ok(self.shared.air().devices[self.index].covered)
    }
}
