//! obd-monitor: connect to a paired adapter and log live sensor values
//!
//! Usage: `obd-monitor [config-file]`

use anyhow::Context;
use obd_session::{init_logging, AdapterSession, LiveSnapshot, SessionConfig};
use obd_transport::Connector;
use tokio::sync::watch;
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let config_path = std::env::args().nth(1);
    let config = SessionConfig::load(config_path.as_deref()).context("loading configuration")?;
    info!("OBD monitor starting for {:?}", config.device_name);

    let (session, mut events) = AdapterSession::new(&config)?;
    let transport = Connector::from_config(&config.transport)
        .connect()
        .await
        .with_context(|| format!("connecting to {}", config.transport.device))?;

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            warn!("Unable to listen for Ctrl-C");
            return;
        }
        info!("Ctrl-C received, shutting down");
        if stop_tx.send(true).is_err() {
            debug!("Session already finished");
        }
    });

    let printer = tokio::spawn(async move {
        let mut snapshot = LiveSnapshot::new();
        while let Some(event) = events.recv().await {
            if snapshot.apply(&event) {
                match serde_json::to_string(&snapshot.frame) {
                    Ok(json) => info!("{}", json),
                    Err(e) => warn!("Unable to serialize frame: {}", e),
                }
            }
        }
        snapshot
    });

    let result = session.run(transport, stop_rx).await;
    drop(session);

    let snapshot = printer.await?;
    info!(
        "Session summary: vin={:?} protocol={} supported={}",
        snapshot.vin,
        snapshot.protocol,
        snapshot.supported_pids.len()
    );
    result?;
    Ok(())
}
