//! Connection strategies
//!
//! A strategy knows how to open one kind of link to the adapter. The
//! [`crate::Connector`] probes strategies and falls back when the primary one
//! is unavailable or refused.

use async_trait::async_trait;
use obd_protocol::{ObdError, Result};
use std::path::Path;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info};

/// Byte stream to the adapter
pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Transport for T {}

pub type BoxedTransport = Box<dyn Transport>;

#[async_trait]
pub trait ConnectionStrategy: Send + Sync {
    fn name(&self) -> &str;

    /// Capability probe: can this strategy be attempted on this platform?
    fn is_available(&self) -> bool;

    async fn connect(&self) -> Result<BoxedTransport>;
}

/// Opens a serial device node (RFCOMM-bound SPP link or USB serial)
#[derive(Debug, Clone)]
pub struct SerialStrategy {
    name: String,
    path: String,
    baud_rate: u32,
}

impl SerialStrategy {
    pub fn new(name: impl Into<String>, path: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            baud_rate,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

#[async_trait]
impl ConnectionStrategy for SerialStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        let available = Path::new(&self.path).exists();
        debug!("Probe {} ({}): available={}", self.name, self.path, available);
        available
    }

    async fn connect(&self) -> Result<BoxedTransport> {
        info!("Opening {} at {} ({} baud)", self.name, self.path, self.baud_rate);
        let stream = tokio_serial::new(&self.path, self.baud_rate)
            .open_native_async()
            .map_err(|e| ObdError::SerialError(format!("{}: {}", self.path, e)))?;
        Ok(Box::new(stream))
    }
}
