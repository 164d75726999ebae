//! Beacon-to-peer matching.
//!
//! Given one consistent snapshot of ranged beacons and discovered peers, pick
//! the beacon that is physically closest and find the peer that advertises
//! it.
//!
//! # Selection policy
//!
//! Only `Immediate` and `Near` beacons are candidates. Among them the scan
//! keeps an incumbent and replaces it only when a candidate *dominates* it:
//! strictly lower accuracy AND strictly stronger rssi. A candidate that wins
//! on one axis and loses (or ties) on the other is incomparable and the
//! incumbent stays.
//!
//! This is not a total order. The result depends on iteration order and can
//! be a beacon that is not Pareto-optimal, e.g. `[(2.0, -30), (1.0, -50),
//! (1.5, -40)]` selects the first element even though the second has better
//! accuracy. Both devices of a pair must make the same choice, so this stays
//! an explicit comparison rather than a sort key.

use beampair_types::{BeaconObservation, MatchError, PeerIdentifierConvention, PeerIdentity};
use serde::Serialize;
use std::cmp::Ordering;

/// Outcome of comparing a candidate beacon against the current incumbent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preference {
    /// Candidate has strictly lower accuracy and strictly stronger rssi.
    Better,
    /// Candidate has strictly higher accuracy and strictly weaker rssi.
    Worse,
    /// Neither dominates; the incumbent is kept.
    Incomparable,
}

/// A beacon paired with the peer that advertises it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Match {
    /// The selected beacon.
    pub beacon: BeaconObservation,
    /// The first peer whose name matches the beacon's derived name.
    pub peer: PeerIdentity,
}

/// Compare a candidate against the incumbent on both axes at once.
///
/// NaN accuracy never compares, so a beacon without a distance estimate is
/// always incomparable.
pub fn compare(candidate: &BeaconObservation, incumbent: &BeaconObservation) -> Preference {
    let accuracy = candidate.accuracy.partial_cmp(&incumbent.accuracy);
    let rssi = candidate.rssi.cmp(&incumbent.rssi);

    match (accuracy, rssi) {
        (Some(Ordering::Less), Ordering::Greater) => Preference::Better,
        (Some(Ordering::Greater), Ordering::Less) => Preference::Worse,
        _ => Preference::Incomparable,
    }
}

/// The closest in-range beacon under the dominance rule, if any.
pub fn closest_in_range(beacons: &[BeaconObservation]) -> Option<&BeaconObservation> {
    beacons
        .iter()
        .filter(|b| b.proximity.is_in_range())
        .fold(None, |incumbent, candidate| match incumbent {
            None => Some(candidate),
            Some(current) => match compare(candidate, current) {
                Preference::Better => Some(candidate),
                Preference::Worse | Preference::Incomparable => Some(current),
            },
        })
}

/// Select the closest beacon and the peer that owns it.
///
/// # Errors
///
/// - [`MatchError::NoBeaconInRange`] if no beacon is `Immediate` or `Near`
/// - [`MatchError::NoPeerForBeacon`] if no peer advertises the selected beacon
pub fn select(
    beacons: &[BeaconObservation],
    peers: &[PeerIdentity],
    convention: &dyn PeerIdentifierConvention,
) -> Result<Match, MatchError> {
    let beacon = closest_in_range(beacons).ok_or(MatchError::NoBeaconInRange)?;

    let expected = convention.peer_name(beacon.beacon);
    let peer = peers
        .iter()
        .find(|p| p.name == expected)
        .ok_or(MatchError::NoPeerForBeacon {
            beacon: beacon.beacon,
        })?;

    Ok(Match {
        beacon: beacon.clone(),
        peer: peer.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use beampair_types::{BeaconId, Proximity, ZeroPaddedDecimal};

    fn obs(id: u16, proximity: Proximity, accuracy: f64, rssi: i32) -> BeaconObservation {
        BeaconObservation::new(BeaconId::new(id, id), proximity, accuracy, rssi)
    }

    fn peer_for(id: u16) -> PeerIdentity {
        PeerIdentity::new(ZeroPaddedDecimal.peer_name(BeaconId::new(id, id)))
    }

    // ===========================================
    // Comparison
    // ===========================================

    #[test]
    fn dominating_candidate_is_better() {
        let a = obs(1, Proximity::Near, 1.0, -40);
        let b = obs(2, Proximity::Near, 2.0, -60);
        assert_eq!(compare(&a, &b), Preference::Better);
        assert_eq!(compare(&b, &a), Preference::Worse);
    }

    #[test]
    fn split_decision_is_incomparable() {
        let a = obs(1, Proximity::Near, 1.0, -40);
        let b = obs(2, Proximity::Near, 2.0, -30);
        assert_eq!(compare(&a, &b), Preference::Incomparable);
        assert_eq!(compare(&b, &a), Preference::Incomparable);
    }

    #[test]
    fn ties_are_incomparable() {
        let a = obs(1, Proximity::Near, 1.0, -40);
        let same_accuracy = obs(2, Proximity::Near, 1.0, -30);
        let same_rssi = obs(3, Proximity::Near, 0.5, -40);
        assert_eq!(compare(&same_accuracy, &a), Preference::Incomparable);
        assert_eq!(compare(&same_rssi, &a), Preference::Incomparable);
    }

    #[test]
    fn nan_accuracy_is_incomparable() {
        let a = obs(1, Proximity::Near, f64::NAN, -20);
        let b = obs(2, Proximity::Near, 2.0, -90);
        assert_eq!(compare(&a, &b), Preference::Incomparable);
        assert_eq!(compare(&b, &a), Preference::Incomparable);
    }

    // ===========================================
    // Beacon selection
    // ===========================================

    #[test]
    fn never_selects_far_or_unknown_when_in_range_exists() {
        let in_range = [
            obs(1, Proximity::Near, 3.0, -80),
            obs(2, Proximity::Immediate, 2.5, -75),
        ];
        let out_of_range = [
            obs(10, Proximity::Far, 0.1, -10),
            obs(11, Proximity::Unknown, -1.0, 0),
            obs(12, Proximity::Far, 0.01, -5),
        ];

        // Interleave every in-range beacon with every out-of-range one in
        // both orders, with the strong out-of-range beacons first.
        for near in &in_range {
            for far in &out_of_range {
                for set in [
                    vec![far.clone(), near.clone()],
                    vec![near.clone(), far.clone()],
                    out_of_range.iter().cloned().chain([near.clone()]).collect(),
                ] {
                    let chosen = closest_in_range(&set).unwrap();
                    assert!(chosen.proximity.is_in_range(), "selected {:?}", chosen);
                }
            }
        }
    }

    #[test]
    fn only_out_of_range_beacons_select_nothing() {
        let set = [
            obs(1, Proximity::Far, 0.1, -10),
            obs(2, Proximity::Unknown, -1.0, 0),
        ];
        assert!(closest_in_range(&set).is_none());
    }

    #[test]
    fn first_wins_without_full_dominance() {
        // B2 is louder but farther: it does not dominate B1.
        let b1 = obs(1, Proximity::Near, 1.0, -40);
        let b2 = obs(2, Proximity::Near, 2.0, -30);

        assert_eq!(closest_in_range(&[b1.clone(), b2.clone()]), Some(&b1));
        assert_eq!(closest_in_range(&[b2.clone(), b1.clone()]), Some(&b2));
    }

    #[test]
    fn dominating_beacon_replaces_incumbent() {
        let far_ish = obs(1, Proximity::Near, 3.0, -70);
        let close = obs(2, Proximity::Immediate, 0.3, -35);
        assert_eq!(closest_in_range(&[far_ish, close.clone()]), Some(&close));
    }

    #[test]
    fn selection_can_skip_the_most_accurate_beacon() {
        let first = obs(1, Proximity::Near, 2.0, -30);
        let best_accuracy = obs(2, Proximity::Near, 1.0, -50);
        let middle = obs(3, Proximity::Near, 1.5, -40);

        let scan = [first.clone(), best_accuracy, middle];
        let chosen = closest_in_range(&scan).unwrap();
        assert_eq!(chosen, &first);
    }

    #[test]
    fn selection_depends_on_iteration_order() {
        let x = obs(1, Proximity::Near, 3.0, -70);
        let y = obs(2, Proximity::Near, 2.0, -60);
        let z = obs(3, Proximity::Near, 1.0, -80);

        let forward_scan = [x.clone(), y.clone(), z.clone()];
        let reverse_scan = [z.clone(), y.clone(), x];
        let forward = closest_in_range(&forward_scan).unwrap();
        let reverse = closest_in_range(&reverse_scan).unwrap();

        assert_eq!(forward, &y);
        assert_eq!(reverse, &z);
    }

    // ===========================================
    // Full selection
    // ===========================================

    #[test]
    fn single_immediate_beacon_matches_its_peer() {
        let beacons = [BeaconObservation::new(
            BeaconId::new(1, 1),
            Proximity::Immediate,
            0.3,
            -35,
        )];
        let peers = [PeerIdentity::new("0000000000000001-0000000000000001")];

        let m = select(&beacons, &peers, &ZeroPaddedDecimal).unwrap();
        assert_eq!(m.beacon, beacons[0]);
        assert_eq!(m.peer, peers[0]);
    }

    #[test]
    fn empty_beacons_is_no_beacon_in_range() {
        let peers = [peer_for(1)];
        assert_eq!(
            select(&[], &peers, &ZeroPaddedDecimal),
            Err(MatchError::NoBeaconInRange)
        );
    }

    #[test]
    fn out_of_range_only_is_no_beacon_in_range() {
        let beacons = [obs(1, Proximity::Far, 0.2, -30)];
        let peers = [peer_for(1)];
        assert_eq!(
            select(&beacons, &peers, &ZeroPaddedDecimal),
            Err(MatchError::NoBeaconInRange)
        );
    }

    #[test]
    fn missing_peer_is_no_peer_for_beacon() {
        let beacons = [obs(1, Proximity::Near, 0.5, -40)];
        let peers = [peer_for(2), PeerIdentity::new("someone-else")];
        assert_eq!(
            select(&beacons, &peers, &ZeroPaddedDecimal),
            Err(MatchError::NoPeerForBeacon {
                beacon: BeaconId::new(1, 1)
            })
        );
    }

    #[test]
    fn empty_peers_is_no_peer_for_beacon() {
        let beacons = [obs(1, Proximity::Near, 0.5, -40)];
        assert!(matches!(
            select(&beacons, &[], &ZeroPaddedDecimal),
            Err(MatchError::NoPeerForBeacon { .. })
        ));
    }

    #[test]
    fn does_not_fall_back_to_another_beacon_when_peer_missing() {
        // Beacon 1 wins selection; beacon 2's peer is present but must not be used.
        let beacons = [
            obs(1, Proximity::Immediate, 0.2, -30),
            obs(2, Proximity::Near, 2.0, -70),
        ];
        let peers = [peer_for(2)];
        assert!(matches!(
            select(&beacons, &peers, &ZeroPaddedDecimal),
            Err(MatchError::NoPeerForBeacon { beacon }) if beacon == BeaconId::new(1, 1)
        ));
    }

    #[test]
    fn duplicate_peers_resolve_to_first_entry() {
        let beacons = [obs(1, Proximity::Near, 0.5, -40)];
        let peers = [PeerIdentity::new("other"), peer_for(1), peer_for(1)];

        let m = select(&beacons, &peers, &ZeroPaddedDecimal).unwrap();
        assert_eq!(m.peer, peers[1]);
    }

    #[test]
    fn custom_convention_is_honored() {
        struct Hex;
        impl PeerIdentifierConvention for Hex {
            fn version(&self) -> u8 {
                99
            }
            fn peer_name(&self, beacon: BeaconId) -> String {
                format!("{:04x}{:04x}", beacon.major, beacon.minor)
            }
            fn parse(&self, _name: &str) -> Option<BeaconId> {
                None
            }
        }

        let beacons = [BeaconObservation::new(
            BeaconId::new(0xab, 0xcd),
            Proximity::Near,
            1.0,
            -50,
        )];
        let peers = [PeerIdentity::new("00ab00cd")];
        let m = select(&beacons, &peers, &Hex).unwrap();
        assert_eq!(m.peer.name, "00ab00cd");
    }
}
