//! Discovery feeds and environment sensors.
//!
//! These are the device-facing collaborators a pairing session consumes.
//! beampair never ranges beacons or browses the network itself; platform
//! adapters implement these traits and the session drives them.
//!
//! - [`ProximityFeed`] advertises our beacon and yields full snapshots of the
//!   beacons in range
//! - [`PeerFeed`] advertises our peer name and yields each newly discovered
//!   peer once
//! - [`Environment`] answers two advisory questions about how the device is
//!   being held
//!
//! Both feeds are infinite and restartable: calling `start` again yields a
//! fresh stream. A stream that yields an error is treated as finished.

mod mock;

pub use mock::{MockEnvironment, MockPeerFeed, MockProximityFeed};

use std::sync::Arc;

use async_trait::async_trait;
use beampair_types::{
    BeaconId, BeaconObservation, PeerIdentifierConvention, PeerIdentity, ZeroPaddedDecimal,
};
use futures_util::stream::BoxStream;
use thiserror::Error;

use crate::transport::Transport;

/// Stream of beacon snapshots; each item replaces the previous one.
pub type BeaconStream = BoxStream<'static, Result<Vec<BeaconObservation>, FeedError>>;

/// Stream of discovered peers; each item is one new peer.
pub type PeerStream = BoxStream<'static, Result<PeerIdentity, FeedError>>;

/// A discovery feed failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    /// The platform denied access to the radio or network.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The radio or network interface is off or unavailable.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// Any other platform failure.
    #[error("feed failed: {0}")]
    Failed(String),
}

/// An environment sensor could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("sensor unavailable: {0}")]
pub struct EnvironmentError(pub String);

/// Beacon advertising and ranging.
pub trait ProximityFeed: Send + Sync {
    /// Advertise `beacon` and start ranging nearby beacons.
    fn start(&self, beacon: BeaconId) -> BeaconStream;
}

/// Peer advertising and discovery.
pub trait PeerFeed: Send + Sync {
    /// Advertise as `local_identifier` and start discovering peers.
    fn start(&self, local_identifier: &str) -> PeerStream;
}

/// Advisory device-posture sensors.
#[async_trait]
pub trait Environment: Send + Sync {
    /// Whether the device is lying flat.
    async fn is_horizontal(&self) -> Result<bool, EnvironmentError>;

    /// Whether the proximity sensor is covered.
    async fn sensed_proximity(&self) -> Result<bool, EnvironmentError>;
}

/// Everything a pairing session talks to.
#[derive(Clone)]
pub struct Collaborators {
    /// Beacon feed.
    pub proximity: Arc<dyn ProximityFeed>,
    /// Peer feed.
    pub peers: Arc<dyn PeerFeed>,
    /// Posture sensors.
    pub environment: Arc<dyn Environment>,
    /// Profile transport.
    pub transport: Arc<dyn Transport>,
    /// Beacon-to-peer naming rule shared with every other device.
    pub convention: Arc<dyn PeerIdentifierConvention>,
}

impl Collaborators {
    /// Bundle collaborators with the default [`ZeroPaddedDecimal`] convention.
    pub fn new(
        proximity: Arc<dyn ProximityFeed>,
        peers: Arc<dyn PeerFeed>,
        environment: Arc<dyn Environment>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            proximity,
            peers,
            environment,
            transport,
            convention: Arc::new(ZeroPaddedDecimal),
        }
    }

    /// Use a different peer identifier convention.
    pub fn with_convention(mut self, convention: Arc<dyn PeerIdentifierConvention>) -> Self {
        self.convention = convention;
        self
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("convention_version", &self.convention.version())
            .finish_non_exhaustive()
    }
}
