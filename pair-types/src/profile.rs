//! The identity payload exchanged between paired devices.

use crate::error::ProfileCodecError;
use serde::{Deserialize, Serialize};

/// Maximum encoded profile size, enforced on both encode and decode.
pub const MAX_PROFILE_SIZE: usize = 16 * 1024;

/// A user's shareable profile.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserProfile {
    /// Display name shown to the other party.
    pub name: String,
}

impl UserProfile {
    /// Create a profile with the given display name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Serialize to MessagePack bytes for byte-oriented transports.
    ///
    /// Fails with [`ProfileCodecError::TooLarge`] if the peer would reject the
    /// encoded profile.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ProfileCodecError> {
        let bytes = rmp_serde::to_vec(self).map_err(ProfileCodecError::Serialization)?;
        check_size(bytes.len())?;
        Ok(bytes)
    }

    /// Deserialize from MessagePack bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProfileCodecError> {
        check_size(bytes.len())?;
        rmp_serde::from_slice(bytes).map_err(ProfileCodecError::Deserialization)
    }
}

fn check_size(size: usize) -> Result<(), ProfileCodecError> {
    if size > MAX_PROFILE_SIZE {
        return Err(ProfileCodecError::TooLarge {
            size,
            limit: MAX_PROFILE_SIZE,
        });
    }
    Ok(())
}
