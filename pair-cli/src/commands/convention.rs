//! Peer identifier conversions.

use anyhow::Result;
use beampair_types::{BeaconId, PeerIdentifierConvention, ZeroPaddedDecimal};

/// Peer identifier a device advertising `major.minor` uses.
pub fn identifier_for(major: u16, minor: u16) -> String {
    ZeroPaddedDecimal.peer_name(BeaconId::new(major, minor))
}

/// Beacon encoded in a peer identifier.
pub fn beacon_for(name: &str) -> Result<BeaconId> {
    ZeroPaddedDecimal.parse(name).ok_or_else(|| {
        anyhow::anyhow!(
            "'{}' is not a version {} peer identifier",
            name,
            ZeroPaddedDecimal.version()
        )
    })
}
