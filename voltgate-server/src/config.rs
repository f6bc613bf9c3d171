//! Server configuration
//!
//! A single TOML file enumerates the devices allowed to connect, each with
//! its authorization token and heartbeat interval. Loaded once at startup
//! into an immutable handle passed down to the HTTP surface and sessions;
//! nothing reaches configuration through globals.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use voltgate_utils::{Result, VoltgateError};

/// Default configuration as TOML (for reference/documentation)
#[allow(dead_code)]
pub const DEFAULT_CONFIG_TOML: &str = r##"
# voltgate configuration

# Address the HTTP/WebSocket endpoint binds to
listen_addr = "0.0.0.0:8080"

# Correlation store bound, per session
queue_capacity = 10

# Outbound token channel bound, per session
outbound_buffer = 16

# One table per device allowed to connect
[devices."CP-0001"]
auth_token = "sesame"
heartbeat_interval = 300
"##;

/// Per-device settings from the config file
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DeviceConfig {
    /// Token the device must present at the upgrade boundary
    pub auth_token: String,
    /// Heartbeat interval handed back in BootNotification responses, seconds
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval: u64,
}

fn default_heartbeat_interval() -> u64 {
    300
}

/// Top-level server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Correlation store capacity, per session
    pub queue_capacity: usize,
    /// Outbound token channel capacity, per session
    pub outbound_buffer: usize,
    /// Known devices keyed by device identifier
    pub devices: HashMap<String, DeviceConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            queue_capacity: 10,
            outbound_buffer: 16,
            devices: HashMap::new(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| VoltgateError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&text).map_err(|e| VoltgateError::ConfigInvalid {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Load configuration, falling back to defaults when the file is absent
    ///
    /// With no config file the server still runs; it just rejects every
    /// upgrade because the device table is empty.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::warn!(path = %path.display(), "config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Look up a device by identifier
    pub fn device(&self, device_id: &str) -> Option<&DeviceConfig> {
        self.devices.get(device_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(text: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.queue_capacity, 10);
        assert_eq!(config.outbound_buffer, 16);
        assert!(config.devices.is_empty());
    }

    #[test]
    fn test_load_full_config() {
        let file = write_config(
            r#"
listen_addr = "127.0.0.1:9090"
queue_capacity = 4

[devices."CP-0001"]
auth_token = "sesame"
heartbeat_interval = 60

[devices."CP-0002"]
auth_token = "other"
"#,
        );

        let config = ServerConfig::load(file.path()).unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:9090");
        assert_eq!(config.queue_capacity, 4);
        // outbound_buffer falls back to the default
        assert_eq!(config.outbound_buffer, 16);

        let first = config.device("CP-0001").unwrap();
        assert_eq!(first.auth_token, "sesame");
        assert_eq!(first.heartbeat_interval, 60);

        // heartbeat_interval defaults per device
        let second = config.device("CP-0002").unwrap();
        assert_eq!(second.heartbeat_interval, 300);
    }

    #[test]
    fn test_unknown_device_lookup() {
        let config = ServerConfig::default();
        assert!(config.device("CP-9999").is_none());
    }

    #[test]
    fn test_load_missing_file() {
        let result = ServerConfig::load(Path::new("/nonexistent/voltgate.toml"));
        assert!(matches!(result, Err(VoltgateError::FileRead { .. })));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = ServerConfig::load_or_default(Path::new("/nonexistent/voltgate.toml")).unwrap();
        assert!(config.devices.is_empty());
        assert_eq!(config.queue_capacity, 10);
    }

    #[test]
    fn test_load_invalid_toml() {
        let file = write_config("listen_addr = [not toml");
        let result = ServerConfig::load(file.path());
        assert!(matches!(result, Err(VoltgateError::ConfigInvalid { .. })));
    }

    #[test]
    fn test_default_config_toml_parses() {
        let config: ServerConfig = toml::from_str(DEFAULT_CONFIG_TOML).unwrap();
        assert_eq!(config.queue_capacity, 10);
        assert!(config.device("CP-0001").is_some());
    }
}
