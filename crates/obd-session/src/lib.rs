//! OBD-II Session Driver
//!
//! Runs an adapter engine against a live transport and exposes the decoded
//! stream as [`obd_adapter::EngineEvent`]s and a [`LiveSnapshot`].

mod config;
mod session;
mod snapshot;

pub use config::{SessionConfig, ENV_PREFIX};
pub use session::AdapterSession;
pub use snapshot::LiveSnapshot;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Install the global fmt subscriber. `RUST_LOG` overrides the INFO default.
pub fn init_logging() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("tracing subscriber already installed");
    }
}
