//! Configuration for a pairing session.
//!
//! Configuration is loaded from a TOML file or built in code. Every field has
//! a default, so an empty file is a valid configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use beampair_types::{BeaconId, UserProfile};
use serde::Deserialize;

/// Root configuration for a pairing session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PairingConfig {
    /// Device identity.
    #[serde(default)]
    pub device: DeviceConfig,
    /// Session runtime tuning.
    #[serde(default)]
    pub session: SessionConfig,
}

/// Which of the two preset beacons this device advertises.
///
/// Two devices pair with each other when one is `One` and the other `Two`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BeaconRole {
    /// Advertise beacon 1.1.
    #[default]
    One,
    /// Advertise beacon 0.0.
    Two,
}

impl BeaconRole {
    /// The beacon this role advertises.
    pub const fn beacon(self) -> BeaconId {
        match self {
            Self::One => BeaconId::new(1, 1),
            Self::Two => BeaconId::new(0, 0),
        }
    }
}

/// Device identity configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeviceConfig {
    /// Name shared with the peer (default: "beampair").
    #[serde(default = "default_display_name")]
    pub display_name: String,
    /// Beacon preset (default: one).
    #[serde(default)]
    pub role: BeaconRole,
    /// Explicit beacon major. Requires `minor`; overrides `role`.
    pub major: Option<u16>,
    /// Explicit beacon minor. Requires `major`; overrides `role`.
    pub minor: Option<u16>,
}

/// Session runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionConfig {
    /// Capacity of the session's event queue (default: 64).
    #[serde(default = "default_event_queue_capacity")]
    pub event_queue_capacity: usize,
    /// Capacity of the notification broadcast (default: 32).
    /// Subscribers that fall further behind skip ahead.
    #[serde(default = "default_notification_capacity")]
    pub notification_capacity: usize,
    /// Upper bound on one profile exchange, in seconds (default: 30).
    /// Zero disables the bound.
    #[serde(default = "default_exchange_timeout_secs")]
    pub exchange_timeout_secs: u64,
}

// Default value functions
fn default_display_name() -> String {
    "beampair".to_string()
}

fn default_event_queue_capacity() -> usize {
    64
}

fn default_notification_capacity() -> usize {
    32
}

fn default_exchange_timeout_secs() -> u64 {
    30
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            display_name: default_display_name(),
            role: BeaconRole::default(),
            major: None,
            minor: None,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            event_queue_capacity: default_event_queue_capacity(),
            notification_capacity: default_notification_capacity(),
            exchange_timeout_secs: default_exchange_timeout_secs(),
        }
    }
}

impl PairingConfig {
    /// Load and validate configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails
    /// validation.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::parse(&content, path)
    }

    /// Parse and validate configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string cannot be parsed or fails validation.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Self::parse(content, Path::new("<inline>"))
    }

    fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Set the display name.
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.device.display_name = name.into();
        self
    }

    /// Set the beacon preset and clear any explicit beacon.
    pub fn with_role(mut self, role: BeaconRole) -> Self {
        self.device.role = role;
        self.device.major = None;
        self.device.minor = None;
        self
    }

    /// Advertise an explicit beacon instead of a role preset.
    pub fn with_beacon(mut self, beacon: BeaconId) -> Self {
        self.device.major = Some(beacon.major);
        self.device.minor = Some(beacon.minor);
        self
    }

    /// Set the exchange timeout. `None` disables it.
    pub fn with_exchange_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.session.exchange_timeout_secs = timeout.map_or(0, |t| t.as_secs().max(1));
        self
    }

    /// Check invariants serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device.display_name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "device.display_name must not be empty".into(),
            ));
        }
        if let Err(e) = self.local_profile().to_bytes() {
            return Err(ConfigError::Invalid(format!(
                "device.display_name cannot be shared: {}",
                e
            )));
        }
        if self.device.major.is_some() != self.device.minor.is_some() {
            return Err(ConfigError::Invalid(
                "device.major and device.minor must be set together".into(),
            ));
        }
        if self.session.event_queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "session.event_queue_capacity must be at least 1".into(),
            ));
        }
        if self.session.notification_capacity == 0 {
            return Err(ConfigError::Invalid(
                "session.notification_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// The beacon this device advertises.
    pub fn local_beacon(&self) -> BeaconId {
        match (self.device.major, self.device.minor) {
            (Some(major), Some(minor)) => BeaconId::new(major, minor),
            _ => self.device.role.beacon(),
        }
    }

    /// The profile this device shares.
    pub fn local_profile(&self) -> UserProfile {
        UserProfile::new(self.device.display_name.clone())
    }

    /// Exchange timeout, if enabled.
    pub fn exchange_timeout(&self) -> Option<Duration> {
        match self.session.exchange_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
    /// Configuration parsed but is not usable.
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use beampair_types::MAX_PROFILE_SIZE;

    #[test]
    fn default_config_is_valid() {
        let config = PairingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.local_beacon(), BeaconId::new(1, 1));
        assert_eq!(config.session.event_queue_capacity, 64);
        assert_eq!(config.session.notification_capacity, 32);
        assert_eq!(config.exchange_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn empty_string_uses_defaults() {
        let config = PairingConfig::from_toml_str("").unwrap();
        assert_eq!(config, PairingConfig::default());
    }

    #[test]
    fn config_from_toml_string() {
        let toml = r#"
[device]
display_name = "Nikita"
role = "two"

[session]
event_queue_capacity = 8
notification_capacity = 4
exchange_timeout_secs = 0
"#;

        let config = PairingConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.local_profile(), UserProfile::new("Nikita"));
        assert_eq!(config.local_beacon(), BeaconId::new(0, 0));
        assert_eq!(config.session.event_queue_capacity, 8);
        assert_eq!(config.session.notification_capacity, 4);
        assert_eq!(config.exchange_timeout(), None);
    }

    #[test]
    fn explicit_beacon_overrides_role() {
        let toml = r#"
[device]
role = "two"
major = 7
minor = 9
"#;
        let config = PairingConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.local_beacon(), BeaconId::new(7, 9));
    }

    #[test]
    fn lone_major_is_rejected() {
        let toml = r#"
[device]
major = 7
"#;
        let result = PairingConfig::from_toml_str(toml);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn empty_display_name_is_rejected() {
        let result = PairingConfig::from_toml_str("[device]\ndisplay_name = \"  \"\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn display_name_too_large_to_share_is_rejected() {
        let config = PairingConfig::default().with_display_name("x".repeat(MAX_PROFILE_SIZE));
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("too large")));
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let result = PairingConfig::from_toml_str("[session]\nevent_queue_capacity = 0\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));

        let result = PairingConfig::from_toml_str("[session]\nnotification_capacity = 0\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn unknown_role_is_a_parse_error() {
        let result = PairingConfig::from_toml_str("[device]\nrole = \"three\"\n");
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let result = PairingConfig::from_file(Path::new("/nonexistent/beampair.toml"));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn builders_compose() {
        let config = PairingConfig::default()
            .with_display_name("Alex")
            .with_beacon(BeaconId::new(3, 4))
            .with_exchange_timeout(None);

        assert!(config.validate().is_ok());
        assert_eq!(config.local_profile().name, "Alex");
        assert_eq!(config.local_beacon(), BeaconId::new(3, 4));
        assert_eq!(config.exchange_timeout(), None);

        let config = config.with_role(BeaconRole::Two);
        assert_eq!(config.local_beacon(), BeaconId::new(0, 0));
    }
}
