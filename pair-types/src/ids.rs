//! Identity types for beampair.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The advertised identity of a proximity beacon.
///
/// A `(major, minor)` pair of 16-bit values. Every device advertises exactly
/// one of these while a session is listening.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BeaconId {
    /// Major value of the beacon.
    pub major: u16,
    /// Minor value of the beacon.
    pub minor: u16,
}

impl BeaconId {
    /// Create a BeaconId from its major and minor values.
    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for BeaconId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// A network peer reported by the peer-discovery feed.
///
/// The name is opaque to beampair except for equality: it is compared
/// against the name a [`PeerIdentifierConvention`](crate::PeerIdentifierConvention)
/// derives from a beacon.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerIdentity {
    /// Advertised peer name.
    pub name: String,
}

impl PeerIdentity {
    /// Create a PeerIdentity from a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl fmt::Display for PeerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Identifier for one pairing session, used to correlate log lines.
///
/// UUID v4 format (16 bytes).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(uuid::Uuid);

impl SessionId {
    /// Create a new random SessionId.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", &self.to_string()[..8])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beacon_id_display() {
        assert_eq!(BeaconId::new(1, 42).to_string(), "1.42");
    }

    #[test]
    fn beacon_id_serde_shape() {
        let json = serde_json::to_string(&BeaconId::new(3, 4)).unwrap();
        assert_eq!(json, r#"{"major":3,"minor":4}"#);
    }

    #[test]
    fn peer_identity_equality_is_by_name() {
        assert_eq!(PeerIdentity::new("a"), PeerIdentity::new("a".to_string()));
        assert_ne!(PeerIdentity::new("a"), PeerIdentity::new("b"));
    }

    #[test]
    fn session_ids_are_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
    }

    #[test]
    fn session_id_debug_is_truncated() {
        let id = SessionId::new();
        let debug = format!("{:?}", id);
        assert!(debug.starts_with("SessionId("));
        assert_eq!(debug.len(), "SessionId(".len() + 8 + 1);
    }
}
