//! Pairing state machine for beampair.
//!
//! [`PairingMachine`] owns everything a pairing session knows: the current
//! [`SessionState`], the observation store, the local profile and the last
//! result. It is driven by [`Event`]s and answers each with a list of
//! [`Action`]s for the runtime to perform.
//!
//! There is no I/O here. The runtime (pair-client) serializes every event
//! through one queue, so `apply` always sees the observation snapshot as it
//! stands between two events. That is what lets the Matcher run inline: the
//! beacons and peers it reads can never belong to different instants.

use std::sync::Arc;

use beampair_types::{
    BeaconId, BeaconObservation, ExchangeError, FailureReason, PeerIdentifierConvention,
    PeerIdentity, SessionId, UserProfile,
};
use serde::Serialize;
use thiserror::Error;

use crate::matcher;
use crate::observations::Observations;
use crate::state::{EnvironmentReading, Offer, Phase, SessionState};

/// Which discovery feed an event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Feed {
    /// Proximity beacon ranging.
    Beacons,
    /// Network peer discovery.
    Peers,
}

/// Inputs to the state machine.
///
/// The first four are user triggers and may be rejected. The rest are results
/// reported by runtime tasks and are never rejected; results that arrive in a
/// state that no longer expects them are dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Start (or restart) the discovery feeds.
    StartRequested,
    /// User wants to share with the closest device.
    ShareRequested,
    /// User confirmed the current offer.
    ConfirmRequested,
    /// User dismissed the current offer.
    CancelRequested,
    /// New beacon snapshot.
    BeaconsObserved {
        /// Full replacement snapshot.
        beacons: Vec<BeaconObservation>,
    },
    /// A peer was discovered.
    PeerDiscovered {
        /// The new peer.
        peer: PeerIdentity,
    },
    /// A feed stopped emitting.
    FeedEnded {
        /// Which feed.
        feed: Feed,
        /// Error message, if it ended with one.
        error: Option<String>,
    },
    /// Environment signals were sampled.
    EnvironmentRead {
        /// Share intent the reading was taken for.
        intent: u64,
        /// The sampled signals.
        reading: EnvironmentReading,
    },
    /// Both halves of the exchange succeeded.
    ExchangeSucceeded {
        /// Profile received from the peer.
        profile: UserProfile,
    },
    /// The exchange failed.
    ExchangeFailed {
        /// The first failure observed.
        error: ExchangeError,
    },
}

/// Work for the runtime.
///
/// These are instructions, not side effects. The runtime interprets them
/// and performs the actual I/O.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Start ranging, advertising the local beacon.
    StartBeaconFeed {
        /// Beacon this device advertises.
        beacon: BeaconId,
    },
    /// Start peer discovery, advertising the local peer name.
    StartPeerFeed {
        /// Name derived from the local beacon via the convention.
        local_identifier: String,
    },
    /// Sample both environment signals concurrently.
    ReadEnvironment {
        /// Share intent to report the reading against.
        intent: u64,
    },
    /// Abandon the environment read of a cancelled share.
    CancelEnvironmentRead,
    /// Send our profile to and receive theirs from the peer, concurrently.
    StartExchange {
        /// Our profile.
        profile: UserProfile,
        /// The peer fixed by the offer.
        peer: PeerIdentity,
    },
    /// Publish a notification.
    Emit(SessionEvent),
}

/// Notifications published to observers of the session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// The session moved to a new state.
    StateChanged {
        /// The new state.
        state: SessionState,
    },
    /// A new beacon snapshot replaced the previous one.
    BeaconsUpdated {
        /// Number of beacons in the snapshot.
        count: usize,
    },
    /// A peer was appended to the observed peers.
    PeerDiscovered {
        /// The new peer.
        peer: PeerIdentity,
    },
    /// A feed stopped; `start` restarts it.
    FeedEnded {
        /// Which feed.
        feed: Feed,
        /// Error message, if it ended with one.
        error: Option<String>,
    },
}

/// A user trigger that is not valid in the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TriggerError {
    /// Share requested before the session was started.
    #[error("session not started")]
    NotStarted,

    /// Share requested while another share is in flight.
    #[error("a share is already in progress ({phase})")]
    Busy {
        /// Phase of the share in flight.
        phase: Phase,
    },

    /// Confirm or cancel requested without an offer to act on.
    #[error("no offer pending")]
    NoPendingOffer,

    /// Confirm or cancel requested while the exchange runs.
    #[error("exchange in flight")]
    ExchangeInFlight,
}

/// Immutable copy of everything observers may read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    /// Session identifier.
    pub session_id: SessionId,
    /// Current state.
    pub state: SessionState,
    /// Beacon this device advertises.
    pub local_beacon: BeaconId,
    /// Profile this device shares.
    pub local_profile: UserProfile,
    /// Latest beacon snapshot.
    pub beacons: Vec<BeaconObservation>,
    /// All peers discovered, in order.
    pub peers: Vec<PeerIdentity>,
    /// Profile from the most recent successful exchange.
    pub remote_profile: Option<UserProfile>,
    /// Failure of the most recent share, cleared by the next share.
    pub last_failure: Option<FailureReason>,
    /// A share is between intent and result.
    pub offer_in_progress: bool,
    /// Beacon feed is running.
    pub beacon_feed_active: bool,
    /// Peer feed is running.
    pub peer_feed_active: bool,
}

/// The pairing state machine - NO I/O, just state transitions.
pub struct PairingMachine {
    session_id: SessionId,
    state: SessionState,
    observations: Observations,
    local_beacon: BeaconId,
    local_profile: UserProfile,
    convention: Arc<dyn PeerIdentifierConvention>,
    remote_profile: Option<UserProfile>,
    last_failure: Option<FailureReason>,
    beacon_feed_active: bool,
    peer_feed_active: bool,
    /// Incremented by every accepted share.
    intent: u64,
}

impl PairingMachine {
    /// Create a machine in the Idle state.
    pub fn new(
        local_beacon: BeaconId,
        local_profile: UserProfile,
        convention: Arc<dyn PeerIdentifierConvention>,
    ) -> Self {
        Self {
            session_id: SessionId::new(),
            state: SessionState::Idle,
            observations: Observations::new(),
            local_beacon,
            local_profile,
            convention,
            remote_profile: None,
            last_failure: None,
            beacon_feed_active: false,
            peer_feed_active: false,
            intent: 0,
        }
    }

    /// Session identifier.
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Current state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Current observations.
    pub fn observations(&self) -> &Observations {
        &self.observations
    }

    /// The peer name this device advertises.
    pub fn local_identifier(&self) -> String {
        self.convention.peer_name(self.local_beacon)
    }

    /// Copy out everything observers may read.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id,
            state: self.state.clone(),
            local_beacon: self.local_beacon,
            local_profile: self.local_profile.clone(),
            beacons: self.observations.beacons().to_vec(),
            peers: self.observations.peers().to_vec(),
            remote_profile: self.remote_profile.clone(),
            last_failure: self.last_failure.clone(),
            offer_in_progress: self.state.is_offer_in_progress(),
            beacon_feed_active: self.beacon_feed_active,
            peer_feed_active: self.peer_feed_active,
        }
    }

    /// Process one event and return the actions to execute.
    ///
    /// # Errors
    ///
    /// Returns a [`TriggerError`] when a user trigger is not valid in the
    /// current state. The machine is left unchanged in that case.
    pub fn apply(&mut self, event: Event) -> Result<Vec<Action>, TriggerError> {
        match event {
            Event::StartRequested => Ok(self.on_start()),
            Event::ShareRequested => self.on_share(),
            Event::ConfirmRequested => self.on_confirm(),
            Event::CancelRequested => self.on_cancel(),
            Event::BeaconsObserved { beacons } => {
                let count = beacons.len();
                self.observations.replace_beacons(beacons);
                Ok(vec![Action::Emit(SessionEvent::BeaconsUpdated { count })])
            }
            Event::PeerDiscovered { peer } => {
                self.observations.record_peer(peer.clone());
                Ok(vec![Action::Emit(SessionEvent::PeerDiscovered { peer })])
            }
            Event::FeedEnded { feed, error } => {
                match feed {
                    Feed::Beacons => self.beacon_feed_active = false,
                    Feed::Peers => self.peer_feed_active = false,
                }
                Ok(vec![Action::Emit(SessionEvent::FeedEnded { feed, error })])
            }
            Event::EnvironmentRead { intent, reading } => Ok(self.on_environment(intent, reading)),
            Event::ExchangeSucceeded { profile } => Ok(self.on_exchange_succeeded(profile)),
            Event::ExchangeFailed { error } => Ok(self.on_exchange_failed(error)),
        }
    }

    fn on_start(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();

        if !self.beacon_feed_active {
            self.beacon_feed_active = true;
            actions.push(Action::StartBeaconFeed {
                beacon: self.local_beacon,
            });
        }
        if !self.peer_feed_active {
            self.peer_feed_active = true;
            actions.push(Action::StartPeerFeed {
                local_identifier: self.local_identifier(),
            });
        }
        if matches!(self.state, SessionState::Idle) {
            actions.push(self.transition(SessionState::Listening));
        }

        actions
    }

    fn on_share(&mut self) -> Result<Vec<Action>, TriggerError> {
        let phase = self.state.phase();
        if phase == Phase::Idle {
            return Err(TriggerError::NotStarted);
        }
        if !phase.accepts_share() {
            return Err(TriggerError::Busy { phase });
        }

        self.last_failure = None;
        self.intent += 1;
        Ok(vec![
            self.transition(SessionState::AwaitingEnvironmentalRead),
            Action::ReadEnvironment {
                intent: self.intent,
            },
        ])
    }

    fn on_environment(&mut self, intent: u64, reading: EnvironmentReading) -> Vec<Action> {
        // A reading taken for an earlier share never completes the current one.
        if intent != self.intent || !matches!(self.state, SessionState::AwaitingEnvironmentalRead) {
            return Vec::new();
        }

        let selected = matcher::select(
            self.observations.beacons(),
            self.observations.peers(),
            self.convention.as_ref(),
        );

        match selected {
            Ok(m) => {
                let offer = Offer {
                    beacon: m.beacon,
                    peer: m.peer,
                    environment: reading,
                };
                vec![
                    self.transition(SessionState::Offering {
                        offer: offer.clone(),
                    }),
                    self.transition(SessionState::AwaitingConfirmation { offer }),
                ]
            }
            Err(e) => vec![self.fail(e.into())],
        }
    }

    fn on_confirm(&mut self) -> Result<Vec<Action>, TriggerError> {
        let offer = match &self.state {
            SessionState::AwaitingConfirmation { offer } => offer.clone(),
            SessionState::Exchanging { .. } => return Err(TriggerError::ExchangeInFlight),
            _ => return Err(TriggerError::NoPendingOffer),
        };

        let peer = offer.peer.clone();
        Ok(vec![
            self.transition(SessionState::Exchanging { offer }),
            Action::StartExchange {
                profile: self.local_profile.clone(),
                peer,
            },
        ])
    }

    fn on_cancel(&mut self) -> Result<Vec<Action>, TriggerError> {
        match self.state.phase() {
            Phase::AwaitingEnvironmentalRead => Ok(vec![
                Action::CancelEnvironmentRead,
                self.transition(SessionState::Listening),
            ]),
            Phase::Offering | Phase::AwaitingConfirmation => {
                Ok(vec![self.transition(SessionState::Listening)])
            }
            Phase::Exchanging => Err(TriggerError::ExchangeInFlight),
            _ => Err(TriggerError::NoPendingOffer),
        }
    }

    fn on_exchange_succeeded(&mut self, profile: UserProfile) -> Vec<Action> {
        let peer = match &self.state {
            SessionState::Exchanging { offer } => offer.peer.clone(),
            _ => return Vec::new(),
        };

        self.remote_profile = Some(profile.clone());
        vec![self.transition(SessionState::Completed { peer, profile })]
    }

    fn on_exchange_failed(&mut self, error: ExchangeError) -> Vec<Action> {
        if !matches!(self.state, SessionState::Exchanging { .. }) {
            return Vec::new();
        }
        vec![self.fail(error.into())]
    }

    fn fail(&mut self, reason: FailureReason) -> Action {
        self.last_failure = Some(reason.clone());
        self.transition(SessionState::Failed { reason })
    }

    fn transition(&mut self, state: SessionState) -> Action {
        self.state = state.clone();
        Action::Emit(SessionEvent::StateChanged { state })
    }
}

impl std::fmt::Debug for PairingMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PairingMachine")
            .field("session_id", &self.session_id)
            .field("phase", &self.state.phase())
            .field("local_beacon", &self.local_beacon)
            .field("convention_version", &self.convention.version())
            .field("intent", &self.intent)
            .field("beacons", &self.observations.beacons().len())
            .field("peers", &self.observations.peers().len())
            .finish()
    }
}
