//! # pair-types
//!
//! Shared data model for beampair.
//!
//! This crate provides the foundational types used across all beampair crates:
//! - [`BeaconId`], [`PeerIdentity`], [`SessionId`] - Identity types for the two observation domains
//! - [`BeaconObservation`], [`Proximity`] - One ranged beacon from a proximity snapshot
//! - [`UserProfile`] - The payload exchanged between paired devices
//! - [`PeerIdentifierConvention`] - The cross-device rule bridging beacons to peer names
//! - [`MatchError`], [`ExchangeError`] - Error kinds surfaced by a pairing attempt

#![warn(missing_docs)]
#![warn(clippy::all)]

mod convention;
mod error;
mod ids;
mod observation;
mod profile;

pub use convention::{PeerIdentifierConvention, ZeroPaddedDecimal};
pub use error::{ExchangeError, FailureReason, MatchError, ProfileCodecError};
pub use ids::{BeaconId, PeerIdentity, SessionId};
pub use observation::{BeaconObservation, Proximity};
pub use profile::{UserProfile, MAX_PROFILE_SIZE};
