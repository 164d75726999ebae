//! Beacon observations reported by the proximity feed.

use crate::BeaconId;
use serde::{Deserialize, Serialize};

/// Coarse closeness bucket reported by beacon ranging.
///
/// Ordered from farthest to closest, so `Immediate` is the maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Proximity {
    /// Ranging could not estimate a distance.
    Unknown,
    /// More than a few meters away.
    Far,
    /// Within a few meters.
    Near,
    /// Practically touching.
    Immediate,
}

impl Proximity {
    /// Whether a beacon in this bucket is close enough to pair with.
    ///
    /// Only `Immediate` and `Near` qualify; `Far` and `Unknown` never do,
    /// whatever their accuracy or signal strength.
    pub fn is_in_range(self) -> bool {
        matches!(self, Self::Immediate | Self::Near)
    }
}

/// One beacon from a proximity snapshot.
///
/// Observations are never mutated: each feed emission replaces the whole set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeaconObservation {
    /// The beacon's advertised identity.
    pub beacon: BeaconId,
    /// Closeness bucket.
    pub proximity: Proximity,
    /// Distance estimate in meters. Lower is closer; may be negative or NaN
    /// when ranging has no estimate.
    pub accuracy: f64,
    /// Received signal strength in dBm. Higher is stronger.
    pub rssi: i32,
}

impl BeaconObservation {
    /// Create a new observation.
    pub fn new(beacon: BeaconId, proximity: Proximity, accuracy: f64, rssi: i32) -> Self {
        Self {
            beacon,
            proximity,
            accuracy,
            rssi,
        }
    }
}
