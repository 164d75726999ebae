//! Pairing session states.

use beampair_types::{BeaconObservation, FailureReason, PeerIdentity, UserProfile};
use serde::Serialize;
use std::fmt;

/// Advisory environment signals sampled when a share starts.
///
/// `None` means the read failed. The signals are carried through to the UI
/// with the offer; matching never looks at them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EnvironmentReading {
    /// Device is lying flat.
    pub is_horizontal: Option<bool>,
    /// The proximity sensor reports something covering the device.
    pub sensed_proximity: Option<bool>,
}

/// The candidate fixed for one share intent.
///
/// Once created, an offer is never re-matched: confirmation and the exchange
/// both use exactly this peer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Offer {
    /// The beacon selected as closest.
    pub beacon: BeaconObservation,
    /// The peer advertising that beacon.
    pub peer: PeerIdentity,
    /// Environment signals sampled for this intent.
    pub environment: EnvironmentReading,
}

/// Pairing session state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum SessionState {
    /// Session created, feeds not started.
    Idle,
    /// Feeds running, no share in progress.
    Listening,
    /// Share requested, sampling environment signals.
    AwaitingEnvironmentalRead,
    /// A match was found and is being presented.
    Offering {
        /// The fixed candidate.
        offer: Offer,
    },
    /// Waiting for the user to confirm the offer.
    AwaitingConfirmation {
        /// The fixed candidate.
        offer: Offer,
    },
    /// Sending and receiving profiles with the offered peer.
    Exchanging {
        /// The fixed candidate.
        offer: Offer,
    },
    /// Exchange finished; new shares are accepted.
    Completed {
        /// The peer profiles were exchanged with.
        peer: PeerIdentity,
        /// The profile received from that peer.
        profile: UserProfile,
    },
    /// Matching or exchange failed; new shares are accepted.
    Failed {
        /// What went wrong.
        reason: FailureReason,
    },
}

impl SessionState {
    /// Create a new session in the Idle state.
    pub fn new() -> Self {
        Self::Idle
    }

    /// The fieldless phase of this state.
    pub fn phase(&self) -> Phase {
        match self {
            Self::Idle => Phase::Idle,
            Self::Listening => Phase::Listening,
            Self::AwaitingEnvironmentalRead => Phase::AwaitingEnvironmentalRead,
            Self::Offering { .. } => Phase::Offering,
            Self::AwaitingConfirmation { .. } => Phase::AwaitingConfirmation,
            Self::Exchanging { .. } => Phase::Exchanging,
            Self::Completed { .. } => Phase::Completed,
            Self::Failed { .. } => Phase::Failed,
        }
    }

    /// The offer being worked on, if a share is between matching and result.
    pub fn offer(&self) -> Option<&Offer> {
        match self {
            Self::Offering { offer }
            | Self::AwaitingConfirmation { offer }
            | Self::Exchanging { offer } => Some(offer),
            _ => None,
        }
    }

    /// Check if a share intent is in flight.
    pub fn is_offer_in_progress(&self) -> bool {
        self.phase().is_offer_in_progress()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Fieldless view of [`SessionState`], for logging and error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// See [`SessionState::Idle`].
    Idle,
    /// See [`SessionState::Listening`].
    Listening,
    /// See [`SessionState::AwaitingEnvironmentalRead`].
    AwaitingEnvironmentalRead,
    /// See [`SessionState::Offering`].
    Offering,
    /// See [`SessionState::AwaitingConfirmation`].
    AwaitingConfirmation,
    /// See [`SessionState::Exchanging`].
    Exchanging,
    /// See [`SessionState::Completed`].
    Completed,
    /// See [`SessionState::Failed`].
    Failed,
}

impl Phase {
    /// Phases between a share intent and its result.
    pub fn is_offer_in_progress(self) -> bool {
        matches!(
            self,
            Self::AwaitingEnvironmentalRead
                | Self::Offering
                | Self::AwaitingConfirmation
                | Self::Exchanging
        )
    }

    /// Phases in which a new share intent is accepted.
    pub fn accepts_share(self) -> bool {
        matches!(self, Self::Listening | Self::Completed | Self::Failed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Listening => "listening",
            Self::AwaitingEnvironmentalRead => "awaiting environmental read",
            Self::Offering => "offering",
            Self::AwaitingConfirmation => "awaiting confirmation",
            Self::Exchanging => "exchanging",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}
