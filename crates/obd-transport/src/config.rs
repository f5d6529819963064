//! Transport configuration

use serde::{Deserialize, Serialize};

/// Default baud rate of SPP serial links
pub const DEFAULT_BAUD_RATE: u32 = 38400;

/// Where and how to reach the adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Device node of the paired adapter (e.g. "/dev/rfcomm0")
    pub device: String,
    /// Device node bound explicitly to RFCOMM channel 1, used when the
    /// primary node is missing or refuses the connection
    pub fallback_device: Option<String>,
    /// Serial baud rate
    pub baud_rate: u32,
    /// Upper bound for a single connection attempt
    pub connect_timeout_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            device: "/dev/rfcomm0".to_string(),
            fallback_device: None,
            baud_rate: DEFAULT_BAUD_RATE,
            connect_timeout_ms: 10_000,
        }
    }
}
