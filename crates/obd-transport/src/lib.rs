//! Adapter transport shim
//!
//! Byte-stream access to the adapter over a serial device node. Which way the
//! link is opened (primary node or the RFCOMM channel-1 fallback) is decided
//! by a [`Connector`] from explicit capability probes.

mod config;
mod connector;
pub mod mock;
mod strategy;

pub use config::{TransportConfig, DEFAULT_BAUD_RATE};
pub use connector::Connector;
pub use strategy::{BoxedTransport, ConnectionStrategy, SerialStrategy, Transport};
