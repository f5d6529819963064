//! Primary / fallback connection selection

use crate::config::TransportConfig;
use crate::strategy::{BoxedTransport, ConnectionStrategy, SerialStrategy};
use obd_protocol::{ObdError, Result};
use std::time::Duration;
use tracing::{info, warn};

/// Opens the adapter link, trying the primary strategy first and the
/// fallback strategy when the primary one is unavailable or refused
pub struct Connector {
    primary: Box<dyn ConnectionStrategy>,
    fallback: Option<Box<dyn ConnectionStrategy>>,
    timeout: Duration,
}

impl Connector {
    pub fn new(
        primary: Box<dyn ConnectionStrategy>,
        fallback: Option<Box<dyn ConnectionStrategy>>,
        timeout: Duration,
    ) -> Self {
        Self {
            primary,
            fallback,
            timeout,
        }
    }

    /// Serial primary strategy plus the channel-1 fallback node if configured
    pub fn from_config(config: &TransportConfig) -> Self {
        let primary = SerialStrategy::new("primary", config.device.clone(), config.baud_rate);
        let fallback = config.fallback_device.as_ref().map(|path| {
            Box::new(SerialStrategy::new("fallback", path.clone(), config.baud_rate))
                as Box<dyn ConnectionStrategy>
        });
        Self::new(
            Box::new(primary),
            fallback,
            Duration::from_millis(config.connect_timeout_ms),
        )
    }

    async fn attempt(&self, strategy: &dyn ConnectionStrategy) -> Result<BoxedTransport> {
        match tokio::time::timeout(self.timeout, strategy.connect()).await {
            Ok(result) => result,
            Err(_) => Err(ObdError::Timeout(self.timeout.as_millis() as u64)),
        }
    }

    /// Connect to the adapter.
    ///
    /// Fails with [`ObdError::TransportUnavailable`] when both strategies
    /// failed or no usable fallback exists.
    pub async fn connect(&self) -> Result<BoxedTransport> {
        let primary_error = if self.primary.is_available() {
            match self.attempt(self.primary.as_ref()).await {
                Ok(transport) => {
                    info!("Connected using {} strategy", self.primary.name());
                    return Ok(transport);
                }
                Err(e) => {
                    warn!("{} strategy refused: {}", self.primary.name(), e);
                    e.to_string()
                }
            }
        } else {
            info!("{} strategy not available on this platform", self.primary.name());
            "not available".to_string()
        };

        let Some(fallback) = self.fallback.as_deref() else {
            return Err(ObdError::TransportUnavailable(format!(
                "{}: {}; no fallback configured",
                self.primary.name(),
                primary_error
            )));
        };

        if !fallback.is_available() {
            return Err(ObdError::TransportUnavailable(format!(
                "{}: {}; {}: not available",
                self.primary.name(),
                primary_error,
                fallback.name()
            )));
        }

        match self.attempt(fallback).await {
            Ok(transport) => {
                info!("Connected using {} strategy", fallback.name());
                Ok(transport)
            }
            Err(e) => Err(ObdError::TransportUnavailable(format!(
                "{}: {}; {}: {}",
                self.primary.name(),
                primary_error,
                fallback.name(),
                e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockStrategy;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    const TIMEOUT: Duration = Duration::from_secs(1);

    #[tokio::test]
    async fn test_primary_used_when_available() {
        let (primary, mut remote) = MockStrategy::connected("primary");
        let connector = Connector::new(Box::new(primary), None, TIMEOUT);

        let mut transport = connector.connect().await.unwrap();
        transport.write_all(b"\r").await.unwrap();
        let mut buf = [0u8; 1];
        remote.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"\r");
    }

    #[tokio::test]
    async fn test_fallback_after_refusal() {
        let primary = MockStrategy::refusing("primary");
        let (fallback, _remote) = MockStrategy::connected("fallback");
        let connector = Connector::new(Box::new(primary), Some(Box::new(fallback)), TIMEOUT);
        assert!(connector.connect().await.is_ok());
    }

    #[tokio::test]
    async fn test_fallback_when_primary_unavailable() {
        let primary = MockStrategy::unavailable("primary");
        let (fallback, _remote) = MockStrategy::connected("fallback");
        let connector = Connector::new(Box::new(primary), Some(Box::new(fallback)), TIMEOUT);
        assert!(connector.connect().await.is_ok());
    }

    #[tokio::test]
    async fn test_both_fail() {
        let connector = Connector::new(
            Box::new(MockStrategy::refusing("primary")),
            Some(Box::new(MockStrategy::refusing("fallback"))),
            TIMEOUT,
        );
        assert!(matches!(
            connector.connect().await,
            Err(ObdError::TransportUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_no_fallback_configured() {
        let connector = Connector::new(Box::new(MockStrategy::refusing("primary")), None, TIMEOUT);
        assert!(matches!(
            connector.connect().await,
            Err(ObdError::TransportUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_from_config_without_devices() {
        let config = TransportConfig {
            device: "/dev/does-not-exist-obd".into(),
            fallback_device: Some("/dev/does-not-exist-obd-fallback".into()),
            ..Default::default()
        };
        let connector = Connector::from_config(&config);
        assert!(matches!(
            connector.connect().await,
            Err(ObdError::TransportUnavailable(_))
        ));
    }
}
