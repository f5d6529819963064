//! Async session driver
//!
//! Couples one [`AdapterEngine`] to one transport: inbound bytes are fed to
//! the engine under its lock, the command queue is polled on a fixed cadence
//! and written out without holding the lock.

use crate::config::SessionConfig;
use obd_adapter::{AdapterEngine, AdapterState, EngineEvent};
use obd_protocol::{BasicCommand, ObdError, Result};
use obd_transport::BoxedTransport;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

pub struct AdapterSession {
    engine: Arc<Mutex<AdapterEngine>>,
    poll_interval: Duration,
    init_timeout: Duration,
    read_buffer_size: usize,
}

impl AdapterSession {
    /// Create a session for the configured device. Also returns the
    /// receiving end of the engine's event stream.
    pub fn new(config: &SessionConfig) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;
        let (tx, rx) = mpsc::channel(config.event_capacity);
        let engine = AdapterEngine::for_device(&config.device_name, tx).ok_or_else(|| {
            ObdError::InvalidConfiguration(format!(
                "no adapter family matches device {:?}",
                config.device_name
            ))
        })?;
        let init_timeout = config
            .init_timeout_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| engine.expected_init_period());

        let session = Self {
            engine: Arc::new(Mutex::new(engine)),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            init_timeout,
            read_buffer_size: config.read_buffer_size,
        };
        Ok((session, rx))
    }

    /// Shared engine handle, e.g. for enqueueing commands from another task
    pub fn engine(&self) -> Arc<Mutex<AdapterEngine>> {
        Arc::clone(&self.engine)
    }

    pub fn state(&self) -> AdapterState {
        self.engine.lock().state()
    }

    pub fn enqueue(&self, command: BasicCommand) -> Result<()> {
        self.engine.lock().enqueue(command)
    }

    /// Drive the connection until the adapter hangs up, `stop` flips to
    /// true, or an unrecoverable error occurs. The engine is closed on
    /// every exit path.
    ///
    /// Fails with [`ObdError::Timeout`] when the adapter is not certified
    /// within the init period.
    pub async fn run(&self, transport: BoxedTransport, stop: watch::Receiver<bool>) -> Result<()> {
        info!(
            "Starting session (poll every {:?}, init deadline {:?})",
            self.poll_interval, self.init_timeout
        );
        let (reader, writer) = tokio::io::split(transport);
        let result = self.drive(reader, writer, stop).await;

        self.engine.lock().close();
        match &result {
            Ok(()) => info!("Session stopped"),
            Err(e) => error!("Session failed: {}", e),
        }
        result
    }

    async fn drive(
        &self,
        mut reader: ReadHalf<BoxedTransport>,
        mut writer: WriteHalf<BoxedTransport>,
        mut stop: watch::Receiver<bool>,
    ) -> Result<()> {
        let terminator = self.engine.lock().delimiters().command_terminator;
        let mut buf = vec![0u8; self.read_buffer_size];

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let init_deadline = tokio::time::sleep(self.init_timeout);
        tokio::pin!(init_deadline);
        let mut certified = false;

        if *stop.borrow() {
            return Ok(());
        }

        loop {
            tokio::select! {
                biased;

                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        info!("Stop requested");
                        break;
                    }
                }
                read = reader.read(&mut buf) => {
                    let n = read?;
                    if n == 0 {
                        info!("Adapter closed the connection");
                        break;
                    }
                    let decoded = self.engine.lock().on_bytes_received(&buf[..n])?;
                    if decoded > 0 {
                        debug!("Decoded {} value(s) from {} byte(s)", decoded, n);
                    }
                    certified = certified || self.engine.lock().state().is_certified();
                }
                _ = &mut init_deadline, if !certified => {
                    if !self.engine.lock().state().is_certified() {
                        warn!("Adapter not certified within {:?}", self.init_timeout);
                        return Err(ObdError::Timeout(self.init_timeout.as_millis() as u64));
                    }
                    certified = true;
                }
                _ = ticker.tick() => {
                    let command = self.engine.lock().next_command_to_send()?;
                    if let Some(command) = command {
                        debug!("-> {}", command);
                        writer.write_all(&command.to_wire(terminator)).await?;
                        writer.flush().await?;
                    }
                }
            }
        }

        if let Err(e) = writer.shutdown().await {
            debug!("Transport shutdown: {}", e);
        }
        Ok(())
    }
}
