//! Adapter connection states

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of one adapter connection. Transitions only move forward;
/// `Closed` is reachable from anywhere and final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AdapterState {
    /// No device matched yet
    Searching,
    /// Device matched by name, handshake not certified
    Connecting,
    /// Adapter identity confirmed
    Certified,
    /// Cyclic polling active
    Streaming,
    /// Transport closed or stopped
    Closed,
}

impl AdapterState {
    pub fn can_transition_to(self, next: AdapterState) -> bool {
        use AdapterState::*;
        match (self, next) {
            (Closed, _) => false,
            (_, Closed) => true,
            (Searching, Connecting) | (Connecting, Certified) | (Certified, Streaming) => true,
            _ => false,
        }
    }

    /// Whether the adapter identity has been confirmed
    pub fn is_certified(self) -> bool {
        matches!(self, AdapterState::Certified | AdapterState::Streaming)
    }
}

impl fmt::Display for AdapterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AdapterState::Searching => "searching",
            AdapterState::Connecting => "connecting",
            AdapterState::Certified => "certified",
            AdapterState::Streaming => "streaming",
            AdapterState::Closed => "closed",
        };
        f.write_str(label)
    }
}
