//! OBD-II Adapter Engine
//!
//! Fingerprints the adapter on the other end of the wire, frames its byte
//! stream, applies vendor quirks and turns vendor frames into typed
//! [`obd_protocol::DataResponse`] values.

mod adapter;
mod decode;
pub mod drivedeck;
mod engine;
mod fingerprint;
mod framer;
mod quirk;
mod registry;
mod state;

pub use adapter::{AdapterProtocol, FrameOutcome, StatusUpdate};
pub use decode::{DecodeRule, VendorTable};
pub use drivedeck::DriveDeckAdapter;
pub use engine::{AdapterEngine, EngineEvent, EVENT_CHANNEL_CAPACITY};
pub use fingerprint::Fingerprint;
pub use framer::{FrameDelimiters, Framer, DEFAULT_MAX_FRAME_LEN};
pub use quirk::{NoQuirk, ResponseQuirk};
pub use registry::{known_adapters, select_adapter};
pub use state::AdapterState;
