//! Observation store for the two discovery feeds.
//!
//! Beacons and peers arrive on independent feeds with different update
//! semantics:
//! - a beacon emission is a complete snapshot and replaces everything before it
//! - a peer emission is one newly discovered peer and is appended
//!
//! Peers are never removed or deduplicated during a session. If discovery
//! reports the same name twice both entries are kept, and lookups return the
//! earliest one.

use beampair_types::{BeaconObservation, PeerIdentity};

/// The latest beacon snapshot plus every peer seen so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Observations {
    beacons: Vec<BeaconObservation>,
    peers: Vec<PeerIdentity>,
}

impl Observations {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the beacon snapshot wholesale.
    pub fn replace_beacons(&mut self, beacons: Vec<BeaconObservation>) {
        self.beacons = beacons;
    }

    /// Append a discovered peer.
    pub fn record_peer(&mut self, peer: PeerIdentity) {
        self.peers.push(peer);
    }

    /// Beacons from the most recent snapshot.
    pub fn beacons(&self) -> &[BeaconObservation] {
        &self.beacons
    }

    /// Peers in discovery order, duplicates included.
    pub fn peers(&self) -> &[PeerIdentity] {
        &self.peers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beampair_types::{BeaconId, Proximity};

    fn beacon(major: u16) -> BeaconObservation {
        BeaconObservation::new(BeaconId::new(major, 0), Proximity::Near, 1.0, -50)
    }

    #[test]
    fn starts_empty() {
        let obs = Observations::new();
        assert!(obs.beacons().is_empty());
        assert!(obs.peers().is_empty());
    }

    #[test]
    fn beacon_snapshots_replace_not_merge() {
        let mut obs = Observations::new();
        obs.replace_beacons(vec![beacon(1), beacon(2)]);
        obs.replace_beacons(vec![beacon(3)]);

        assert_eq!(obs.beacons(), &[beacon(3)]);
    }

    #[test]
    fn empty_snapshot_clears_beacons() {
        let mut obs = Observations::new();
        obs.replace_beacons(vec![beacon(1)]);
        obs.replace_beacons(vec![]);
        assert!(obs.beacons().is_empty());
    }

    #[test]
    fn peers_append_and_keep_duplicates() {
        let mut obs = Observations::new();
        obs.record_peer(PeerIdentity::new("a"));
        obs.record_peer(PeerIdentity::new("b"));
        obs.record_peer(PeerIdentity::new("a"));

        let names: Vec<_> = obs.peers().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["a", "b", "a"]);
    }

    #[test]
    fn beacon_updates_do_not_touch_peers() {
        let mut obs = Observations::new();
        obs.record_peer(PeerIdentity::new("a"));
        obs.replace_beacons(vec![beacon(1)]);
        obs.replace_beacons(vec![]);
        assert_eq!(obs.peers().len(), 1);
    }
}
