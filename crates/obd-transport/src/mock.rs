//! In-memory strategy for tests and simulations

use crate::strategy::{BoxedTransport, ConnectionStrategy};
use async_trait::async_trait;
use obd_protocol::{ObdError, Result};
use parking_lot::Mutex;
use tokio::io::DuplexStream;

const DUPLEX_BUFFER: usize = 4096;

enum Behaviour {
    Connect(Mutex<Option<DuplexStream>>),
    Refuse,
    Unavailable,
}

/// Strategy handing out one end of a [`tokio::io::duplex`] pipe
pub struct MockStrategy {
    name: String,
    behaviour: Behaviour,
}

impl MockStrategy {
    /// Strategy that connects once; the returned stream plays the adapter
    pub fn connected(name: &str) -> (Self, DuplexStream) {
        let (local, remote) = tokio::io::duplex(DUPLEX_BUFFER);
        let strategy = Self {
            name: name.to_string(),
            behaviour: Behaviour::Connect(Mutex::new(Some(local))),
        };
        (strategy, remote)
    }

    /// Strategy that is available but refuses every connection
    pub fn refusing(name: &str) -> Self {
        Self {
            name: name.to_string(),
            behaviour: Behaviour::Refuse,
        }
    }

    /// Strategy the capability probe rejects
    pub fn unavailable(name: &str) -> Self {
        Self {
            name: name.to_string(),
            behaviour: Behaviour::Unavailable,
        }
    }
}

#[async_trait]
impl ConnectionStrategy for MockStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        !matches!(self.behaviour, Behaviour::Unavailable)
    }

    async fn connect(&self) -> Result<BoxedTransport> {
        match &self.behaviour {
            Behaviour::Connect(stream) => stream
                .lock()
                .take()
                .map(|s| Box::new(s) as BoxedTransport)
                .ok_or_else(|| ObdError::SerialError(format!("{}: already connected", self.name))),
            Behaviour::Refuse => Err(ObdError::SerialError(format!(
                "{}: connection refused",
                self.name
            ))),
            Behaviour::Unavailable => Err(ObdError::SerialError(format!(
                "{}: not available",
                self.name
            ))),
        }
    }
}
