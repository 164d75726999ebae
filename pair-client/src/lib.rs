//! # pair-client
//!
//! Async runtime for beampair proximity pairing.
//!
//! This is the library applications embed to pair two nearby devices and swap
//! profiles.
//!
//! ## Features
//!
//! - **Single-owner session loop**: one task owns the state machine, everything
//!   else reports through one queue
//! - **Pluggable collaborators**: beacon ranging, peer discovery, posture
//!   sensors and transport are traits (mock and loopback provided)
//! - **Pure State Machine**: Uses pair-core for side-effect-free logic
//!
//! ## Example
//!
//! ```ignore
//! use beampair_client::{LoopbackNetwork, PairingConfig, PairingSession};
//!
//! let network = LoopbackNetwork::new();
//! let session = PairingSession::spawn(
//!     &PairingConfig::default().with_display_name("Alpha"),
//!     network.device(0.0).collaborators(),
//! )?;
//!
//! session.start().await?;
//! session.share_intent().await?;
//! // ...wait for AwaitingConfirmation on session.watch()...
//! session.confirm_intent().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod collaborators;
pub mod config;
pub mod exchange;
pub mod loopback;
pub mod session;
pub mod transport;

pub use collaborators::{
    Collaborators, Environment, EnvironmentError, FeedError, MockEnvironment, MockPeerFeed,
    MockProximityFeed, PeerFeed, ProximityFeed,
};
pub use config::{BeaconRole, ConfigError, DeviceConfig, PairingConfig, SessionConfig};
pub use exchange::ExchangeCoordinator;
pub use loopback::{LoopbackDevice, LoopbackNetwork};
pub use session::{PairingSession, SessionError};
pub use transport::{MockTransport, Transport, TransportError};
