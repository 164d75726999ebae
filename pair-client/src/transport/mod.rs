//! Transport abstraction for beampair.
//!
//! This module provides a pluggable transport layer that abstracts the
//! peer-to-peer channel profiles travel over (a local-network session, an
//! in-memory loopback, a mock for testing).
//!
//! # Design
//!
//! The transport trait is peer-addressed and stateless from the caller's
//! point of view:
//! - `send()` delivers our profile to a peer, at most once per call
//! - `receive()` waits for the profile a peer sends us
//!
//! Neither call retries. Retry policy belongs to whoever drives the exchange.
//!
//! # Example
//!
//! ```ignore
//! let transport = MockTransport::new();
//! transport.queue_response(&peer, UserProfile::new("them"));
//! transport.send(&UserProfile::new("me"), &peer).await?;
//! let theirs = transport.receive(&peer).await?;
//! ```

mod mock;

pub use mock::MockTransport;

use async_trait::async_trait;
use beampair_types::{PeerIdentity, ProfileCodecError, UserProfile};
use thiserror::Error;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// This device is not advertising on the network yet.
    #[error("not connected")]
    NotConnected,

    /// No reachable peer with that name.
    #[error("unknown peer: {0}")]
    UnknownPeer(String),

    /// Connection closed.
    #[error("connection closed")]
    ConnectionClosed,

    /// Send failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Receive failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// Profile bytes could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] ProfileCodecError),

    /// Operation timed out.
    #[error("operation timed out")]
    Timeout,
}

/// Transport trait for exchanging profiles with a peer.
///
/// Implementations handle the underlying connection mechanism.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send our profile to `to`.
    async fn send(&self, profile: &UserProfile, to: &PeerIdentity) -> Result<(), TransportError>;

    /// Receive the profile `from` sends us.
    ///
    /// Blocks until the peer sends or the channel fails.
    async fn receive(&self, from: &PeerIdentity) -> Result<UserProfile, TransportError>;
}
