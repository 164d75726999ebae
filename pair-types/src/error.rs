//! Error types for beampair.

use crate::BeaconId;
use serde::Serialize;
use thiserror::Error;

/// Why the Matcher could not produce a pairing candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
pub enum MatchError {
    /// No beacon in the current snapshot is `Immediate` or `Near`.
    #[error("no beacon in range")]
    NoBeaconInRange,

    /// The closest beacon has no peer advertising its derived name.
    #[error("no peer advertising beacon {beacon}")]
    NoPeerForBeacon {
        /// The beacon the Matcher selected.
        beacon: BeaconId,
    },
}

/// Why an exchange with a matched peer failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
pub enum ExchangeError {
    /// Sending or receiving failed; carries the transport's message.
    #[error("transport error: {0}")]
    Transport(String),
}

/// The failure that moved a session into its failed state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
pub enum FailureReason {
    /// Matching failed before any exchange started.
    #[error("match failed: {0}")]
    Match(#[from] MatchError),

    /// The exchange with the matched peer failed.
    #[error("exchange failed: {0}")]
    Exchange(#[from] ExchangeError),
}

/// Errors from the profile wire codec.
#[derive(Debug, Error)]
pub enum ProfileCodecError {
    /// MessagePack serialization failed
    #[error("serialization failed: {0}")]
    Serialization(#[source] rmp_serde::encode::Error),

    /// MessagePack deserialization failed
    #[error("deserialization failed: {0}")]
    Deserialization(#[source] rmp_serde::decode::Error),

    /// Payload exceeds the accepted size
    #[error("profile too large: {size} bytes (limit: {limit} bytes)")]
    TooLarge {
        /// Size of the rejected payload.
        size: usize,
        /// Maximum accepted size.
        limit: usize,
    },
}
