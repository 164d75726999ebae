//! Peer identifier convention.
//!
//! The beacon feed and the peer feed key their observations differently: one
//! by `(major, minor)`, the other by an advertised peer name. A device
//! advertises a peer name derived from its own beacon, so a ranged beacon can
//! be mapped back to the peer that owns it.
//!
//! This mapping is a wire-level agreement. Every device taking part in a
//! pairing must use the same convention and the same version of it, so
//! changing the format means bumping [`PeerIdentifierConvention::version`].

use crate::BeaconId;

/// Maps beacon identities into the peer-name namespace.
pub trait PeerIdentifierConvention: Send + Sync {
    /// Version of the naming rule. Devices with different versions cannot pair.
    fn version(&self) -> u8;

    /// The peer name a device advertising `beacon` uses on the peer feed.
    fn peer_name(&self, beacon: BeaconId) -> String;

    /// Recover the beacon from a peer name, if the name follows this convention.
    fn parse(&self, name: &str) -> Option<BeaconId>;
}

/// Version 1 convention: `major` and `minor` as 16-digit zero-padded decimals
/// joined by a hyphen.
///
/// `(1, 1)` becomes `"0000000000000001-0000000000000001"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ZeroPaddedDecimal;

impl ZeroPaddedDecimal {
    /// Digits per field.
    pub const WIDTH: usize = 16;
}

impl PeerIdentifierConvention for ZeroPaddedDecimal {
    fn version(&self) -> u8 {
        1
    }

    fn peer_name(&self, beacon: BeaconId) -> String {
        format!(
            "{:0width$}-{:0width$}",
            beacon.major,
            beacon.minor,
            width = Self::WIDTH
        )
    }

    fn parse(&self, name: &str) -> Option<BeaconId> {
        let (major, minor) = name.split_once('-')?;
        if major.len() != Self::WIDTH || minor.len() != Self::WIDTH {
            return None;
        }
        if !major.bytes().all(|b| b.is_ascii_digit()) || !minor.bytes().all(|b| b.is_ascii_digit())
        {
            return None;
        }
        Some(BeaconId::new(major.parse().ok()?, minor.parse().ok()?))
    }
}
