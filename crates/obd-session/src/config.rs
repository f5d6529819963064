//! Session configuration

use obd_adapter::EVENT_CHANNEL_CAPACITY;
use obd_protocol::{ObdError, Result};
use obd_transport::TransportConfig;
use serde::{Deserialize, Serialize};

/// Prefix of environment overrides, e.g. `OBD_TRANSPORT__DEVICE`
pub const ENV_PREFIX: &str = "OBD";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Advertised name of the paired adapter, used to pick the adapter family
    pub device_name: String,
    /// Cadence at which the command queue is polled (ms)
    pub poll_interval_ms: u64,
    /// Size of the transport read buffer
    pub read_buffer_size: usize,
    /// Engine events buffered for a slow consumer before new ones are dropped
    pub event_capacity: usize,
    /// Overrides the adapter's expected init period when set (ms)
    pub init_timeout_ms: Option<u64>,
    pub transport: TransportConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            device_name: "DriveDeck W4 OBD".to_string(),
            poll_interval_ms: 200,
            read_buffer_size: 512,
            event_capacity: EVENT_CHANNEL_CAPACITY,
            init_timeout_ms: None,
            transport: TransportConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Load from an optional file (any format the `config` crate knows,
    /// extension optional) overlaid with `OBD_*` environment variables.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }
        builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| ObdError::InvalidConfiguration(e.to_string()))
            .and_then(|config: Self| config.validate().map(|_| config))
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(ObdError::InvalidConfiguration(
                "poll_interval_ms must be positive".to_string(),
            ));
        }
        if self.read_buffer_size == 0 {
            return Err(ObdError::InvalidConfiguration(
                "read_buffer_size must be positive".to_string(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(ObdError::InvalidConfiguration(
                "event_capacity must be positive".to_string(),
            ));
        }
        if self.device_name.trim().is_empty() {
            return Err(ObdError::InvalidConfiguration("device_name is empty".to_string()));
        }
        Ok(())
    }
}
