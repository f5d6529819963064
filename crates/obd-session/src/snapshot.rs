//! Latest-value view over the engine event stream

use obd_adapter::{AdapterState, EngineEvent, StatusUpdate};
use obd_protocol::{ObdProtocol, Pid, SensorFrame};
use serde::Serialize;
use std::collections::BTreeSet;

/// Folds [`EngineEvent`]s into what the recording side needs to know
#[derive(Debug, Clone, Default, Serialize)]
pub struct LiveSnapshot {
    pub state: Option<AdapterState>,
    pub vin: Option<String>,
    pub protocol: ObdProtocol,
    pub supported_pids: BTreeSet<Pid>,
    pub engine_running: Option<bool>,
    pub frame: SensorFrame,
}

impl LiveSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event. Returns true when a sensor value changed.
    pub fn apply(&mut self, event: &EngineEvent) -> bool {
        match event {
            EngineEvent::Data(response) => {
                self.frame.update_from_response(response);
                return true;
            }
            EngineEvent::StateChanged(state) => self.state = Some(*state),
            EngineEvent::Status(update) => match update {
                StatusUpdate::Vin(vin) => self.vin = Some(vin.clone()),
                StatusUpdate::Protocol(protocol) => self.protocol = *protocol,
                StatusUpdate::SupportedPids(pids) => self.supported_pids.extend(pids.iter().copied()),
                StatusUpdate::EngineOn => self.engine_running = Some(true),
                StatusUpdate::EngineOff => self.engine_running = Some(false),
                StatusUpdate::Connecting(_) | StatusUpdate::ControlUnits(_) => {}
            },
        }
        false
    }

    /// Data is flowing once the cyclic command went out
    pub fn is_streaming(&self) -> bool {
        self.state == Some(AdapterState::Streaming)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use obd_protocol::{DataResponse, Unit};

    fn rpm(value: f64, timestamp_ms: u64) -> EngineEvent {
        EngineEvent::Data(DataResponse {
            pid: Pid::Rpm,
            value,
            unit: Unit::Rpm,
            equivalence_ratio: None,
            timestamp_ms,
        })
    }

    #[test]
    fn test_data_updates_frame() {
        let mut snapshot = LiveSnapshot::new();
        assert!(snapshot.apply(&rpm(800.0, 10)));
        assert!(snapshot.apply(&rpm(1200.0, 20)));
        assert_eq!(snapshot.frame.rpm, Some(1200.0));
        assert_eq!(snapshot.frame.timestamp_ms, 20);
    }

    #[test]
    fn test_status_tracking() {
        let mut snapshot = LiveSnapshot::new();
        assert!(!snapshot.apply(&EngineEvent::Status(StatusUpdate::Vin("WVWZZZ1JZXW000001".into()))));
        snapshot.apply(&EngineEvent::Status(StatusUpdate::Protocol(ObdProtocol::KwpFast)));
        snapshot.apply(&EngineEvent::Status(StatusUpdate::SupportedPids(
            [Pid::Rpm].into_iter().collect(),
        )));
        snapshot.apply(&EngineEvent::Status(StatusUpdate::SupportedPids(
            [Pid::Speed].into_iter().collect(),
        )));
        snapshot.apply(&EngineEvent::Status(StatusUpdate::EngineOn));

        assert_eq!(snapshot.vin.as_deref(), Some("WVWZZZ1JZXW000001"));
        assert_eq!(snapshot.protocol, ObdProtocol::KwpFast);
        assert_eq!(snapshot.supported_pids.len(), 2);
        assert_eq!(snapshot.engine_running, Some(true));
    }

    #[test]
    fn test_streaming_flag() {
        let mut snapshot = LiveSnapshot::new();
        assert!(!snapshot.is_streaming());
        snapshot.apply(&EngineEvent::StateChanged(AdapterState::Streaming));
        assert!(snapshot.is_streaming());
        snapshot.apply(&EngineEvent::StateChanged(AdapterState::Closed));
        assert!(!snapshot.is_streaming());
    }
}
