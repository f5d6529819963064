//! Adapter Engine
//!
//! Owns the pending-command queue, the framer and the quirk flag of one
//! connection, and drives the [`AdapterState`] machine from the hooks of an
//! [`AdapterProtocol`]. All methods are synchronous and never block; the
//! caller does the I/O and the timing.

use crate::adapter::{AdapterProtocol, FrameOutcome, StatusUpdate};
use crate::framer::{FrameDelimiters, Framer};
use crate::quirk::ResponseQuirk;
use crate::registry::select_adapter;
use crate::state::AdapterState;
use obd_protocol::{BasicCommand, DataResponse, ObdError, Result};
use serde::Serialize;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

/// Capacity callers should give the event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Notification emitted towards the trip-recording side
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum EngineEvent {
    /// One decoded PID value
    Data(DataResponse),
    /// Adapter metadata (VIN, protocol, supported PIDs, engine on/off)
    Status(StatusUpdate),
    /// State machine transition
    StateChanged(AdapterState),
}

pub struct AdapterEngine {
    adapter: Box<dyn AdapterProtocol>,
    state: AdapterState,
    pending: VecDeque<BasicCommand>,
    framer: Framer,
    quirk: Box<dyn ResponseQuirk>,
    quirk_enabled: bool,
    cycle_command: Option<BasicCommand>,
    last_cycle_sent: Option<Instant>,
    events: mpsc::Sender<EngineEvent>,
}

impl AdapterEngine {
    /// Create an engine for one connection. It starts in
    /// [`AdapterState::Searching`] with the adapter's initial commands queued.
    pub fn new(
        adapter: Box<dyn AdapterProtocol>,
        events: mpsc::Sender<EngineEvent>,
    ) -> Self {
        info!("Creating adapter engine for {}", adapter.name());
        Self {
            pending: adapter.initial_commands().into(),
            framer: Framer::new(adapter.delimiters()),
            quirk: adapter.quirk(),
            quirk_enabled: true,
            cycle_command: None,
            last_cycle_sent: None,
            state: AdapterState::Searching,
            adapter,
            events,
        }
    }

    /// Pick the adapter family matching `device_name` and create an engine
    /// already moved to [`AdapterState::Connecting`]
    pub fn for_device(device_name: &str, events: mpsc::Sender<EngineEvent>) -> Option<Self> {
        let adapter = select_adapter(device_name)?;
        let mut engine = Self::new(adapter, events);
        engine.on_device_discovered(device_name).ok()?;
        Some(engine)
    }

    pub fn state(&self) -> AdapterState {
        self.state
    }

    pub fn adapter(&self) -> &dyn AdapterProtocol {
        self.adapter.as_ref()
    }

    pub fn delimiters(&self) -> FrameDelimiters {
        self.adapter.delimiters()
    }

    pub fn expected_init_period(&self) -> Duration {
        self.adapter.expected_init_period()
    }

    pub fn is_quirk_enabled(&self) -> bool {
        self.quirk_enabled
    }

    pub fn pending_commands(&self) -> usize {
        self.pending.len()
    }

    pub fn cycle_command(&self) -> Option<&BasicCommand> {
        self.cycle_command.as_ref()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.state == AdapterState::Closed {
            return Err(ObdError::EngineClosed);
        }
        Ok(())
    }

    /// Non-blocking; events are dropped while the consumer lags behind
    fn emit(&self, event: EngineEvent) {
        match self.events.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!("Engine event channel full, dropping {:?}", event);
            }
            Err(TrySendError::Closed(_)) => debug!("Engine event receiver dropped"),
        }
    }

    fn transition(&mut self, next: AdapterState) {
        if !self.state.can_transition_to(next) {
            warn!("Refusing state transition {} -> {}", self.state, next);
            return;
        }
        info!("{}: {} -> {}", self.adapter.name(), self.state, next);
        self.state = next;
        self.emit(EngineEvent::StateChanged(next));
    }

    /// Device-matching probe. Moves `Searching -> Connecting` on a match.
    pub fn on_device_discovered(&mut self, device_name: &str) -> Result<bool> {
        self.ensure_open()?;
        let supported = self.adapter.supports_device(device_name);
        if supported && self.state == AdapterState::Searching {
            info!("Device {:?} matches {}", device_name, self.adapter.name());
            self.transition(AdapterState::Connecting);
        }
        Ok(supported)
    }

    /// Feed a chunk of the inbound byte stream. Complete frames are
    /// dispatched; frame-level failures are logged and dropped.
    ///
    /// Returns the number of decoded PID values.
    pub fn on_bytes_received(&mut self, chunk: &[u8]) -> Result<usize> {
        self.ensure_open()?;
        let mut decoded = 0;
        for frame in self.framer.push(chunk) {
            if self.on_frame_received(&frame)?.is_some() {
                decoded += 1;
            }
        }
        Ok(decoded)
    }

    /// Dispatch one already delimited frame, swallowing frame-level errors
    pub fn on_frame_received(&mut self, frame: &[u8]) -> Result<Option<DataResponse>> {
        match self.dispatch_frame(frame) {
            Ok(response) => Ok(response),
            Err(e) if e.is_frame_error() => {
                debug!("Discarding frame {:?}: {}", String::from_utf8_lossy(frame), e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Quirk, classification and state bookkeeping for one frame
    pub fn dispatch_frame(&mut self, frame: &[u8]) -> Result<Option<DataResponse>> {
        self.ensure_open()?;
        if self.state == AdapterState::Searching {
            return Err(ObdError::UnmatchedResponse(
                "frame received before a device was matched".to_string(),
            ));
        }

        let outcome = if self.quirk_enabled {
            let frame = self.quirk.apply(frame);
            self.adapter.decode_frame(&frame)?
        } else {
            self.adapter.decode_frame(frame)?
        };

        let response = match outcome {
            FrameOutcome::Data(response) => {
                debug!("{}", response);
                if self.quirk_enabled {
                    self.disable_quirk();
                }
                self.emit(EngineEvent::Data(response.clone()));
                Some(response)
            }
            FrameOutcome::Status(update) => {
                self.emit(EngineEvent::Status(update));
                None
            }
            FrameOutcome::Skipped => None,
        };

        self.advance_state();
        Ok(response)
    }

    fn disable_quirk(&mut self) {
        info!("Genuine PID data received, disabling response quirk");
        self.quirk_enabled = false;
    }

    fn advance_state(&mut self) {
        if self.state == AdapterState::Connecting && self.adapter.has_certified_connection() {
            self.transition(AdapterState::Certified);
        }

        if self.state == AdapterState::Certified && self.cycle_command.is_none() {
            if let Some(command) = self.adapter.check_for_cycle_command() {
                self.pending.push_back(command.clone());
                self.cycle_command = Some(command);
                self.transition(AdapterState::Streaming);
            }
        }
    }

    /// Queue a command. PID reads are refused until the adapter is certified.
    pub fn enqueue(&mut self, command: BasicCommand) -> Result<()> {
        self.ensure_open()?;
        if command.awaits_results() && !self.state.is_certified() {
            return Err(ObdError::AdapterSearching);
        }
        self.pending.push_back(command);
        Ok(())
    }

    /// Next command to write, or `None` when there is nothing to send now.
    ///
    /// With an empty queue while streaming, the cyclic command is re-sent
    /// once the keepalive interval elapsed since it was last sent.
    pub fn poll_next_command(&mut self, now: Instant) -> Result<Option<BasicCommand>> {
        self.ensure_open()?;

        let mut next = self.pending.pop_front();

        if next.is_none()
            && self.state == AdapterState::Streaming
            && self.adapter.has_established_connection()
        {
            let due = self
                .last_cycle_sent
                .map_or(true, |sent| now.saturating_duration_since(sent) >= self.adapter.keepalive_interval());
            if due {
                next = self.cycle_command.clone();
            }
        }

        if next.is_some() && next == self.cycle_command {
            info!("Sending Cyclic command to {} - data should be received now", self.adapter.name());
            self.last_cycle_sent = Some(now);
        }

        Ok(next)
    }

    pub fn next_command_to_send(&mut self) -> Result<Option<BasicCommand>> {
        self.poll_next_command(Instant::now())
    }

    /// Shut the engine down. Later calls fail with [`ObdError::EngineClosed`].
    pub fn close(&mut self) {
        if self.state == AdapterState::Closed {
            return;
        }
        self.pending.clear();
        self.framer.reset();
        self.transition(AdapterState::Closed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivedeck::DriveDeckAdapter;
    use obd_protocol::{mode, Pid};

    fn engine() -> (AdapterEngine, mpsc::Receiver<EngineEvent>) {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let engine = AdapterEngine::for_device("DriveDeck W4 OBD", tx).expect("drivedeck");
        (engine, rx)
    }

    fn drain(rx: &mut mpsc::Receiver<EngineEvent>) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn state_changes(events: &[EngineEvent]) -> Vec<AdapterState> {
        events
            .iter()
            .filter_map(|e| match e {
                EngineEvent::StateChanged(s) => Some(*s),
                _ => None,
            })
            .collect()
    }

    /// Certify via protocol report, one PID report for 0C/0D, then 7 notices
    fn bring_to_streaming(engine: &mut AdapterEngine) {
        engine.on_bytes_received(b"C1\r>").unwrap();
        engine
            .on_bytes_received(b"B70000000\x00\x18\x00\x00\x00>")
            .unwrap();
        for _ in 0..7 {
            engine.on_bytes_received(b"B31\r>").unwrap();
        }
    }

    #[test]
    fn test_unmatched_device() {
        let (tx, _rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        assert!(AdapterEngine::for_device("OBDLink MX", tx).is_none());
    }

    #[test]
    fn test_device_match_moves_to_connecting() {
        let (tx, mut rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let mut engine = AdapterEngine::new(Box::new(DriveDeckAdapter::new()), tx);
        assert_eq!(engine.state(), AdapterState::Searching);
        assert!(!engine.on_device_discovered("OBDLink MX").unwrap());
        assert_eq!(engine.state(), AdapterState::Searching);
        assert!(engine.on_device_discovered("DriveDeck W4 OBD").unwrap());
        assert_eq!(engine.state(), AdapterState::Connecting);
        assert_eq!(state_changes(&drain(&mut rx)), vec![AdapterState::Connecting]);
    }

    #[test]
    fn test_frames_before_match_are_discarded() {
        let (tx, _rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let mut engine = AdapterEngine::new(Box::new(DriveDeckAdapter::new()), tx);
        assert!(matches!(engine.dispatch_frame(b"C1"), Err(ObdError::UnmatchedResponse(_))));
        assert_eq!(engine.on_bytes_received(b"C1>").unwrap(), 0);
        assert_eq!(engine.state(), AdapterState::Searching);
    }

    #[test]
    fn test_carriage_return_sent_first() {
        let (mut engine, _rx) = engine();
        let first = engine.poll_next_command(Instant::now()).unwrap().unwrap();
        assert_eq!(first, BasicCommand::carriage_return());
        assert!(engine.poll_next_command(Instant::now()).unwrap().is_none());
    }

    #[test]
    fn test_full_lifecycle() {
        let (mut engine, mut rx) = engine();
        bring_to_streaming(&mut engine);
        assert_eq!(engine.state(), AdapterState::Streaming);

        let events = drain(&mut rx);
        assert_eq!(
            state_changes(&events),
            vec![AdapterState::Connecting, AdapterState::Certified, AdapterState::Streaming]
        );
        assert!(events.contains(&EngineEvent::Status(StatusUpdate::Protocol(
            obd_protocol::ObdProtocol::Can11bit500
        ))));

        // carriage return, then the freshly built cycle command
        let now = Instant::now();
        assert_eq!(engine.poll_next_command(now).unwrap(), Some(BasicCommand::carriage_return()));
        let cycle = engine.poll_next_command(now).unwrap().unwrap();
        assert_eq!(cycle.output_bytes(), b"a17\x40\x41");
        assert!(engine.poll_next_command(now).unwrap().is_none());

        let decoded = engine.on_bytes_received(b"B40 \x0C\x00\r>B41 \x37\x00\r>").unwrap();
        assert_eq!(decoded, 2);
        let data: Vec<_> = drain(&mut rx)
            .into_iter()
            .filter_map(|e| match e {
                EngineEvent::Data(d) => Some((d.pid, d.value)),
                _ => None,
            })
            .collect();
        assert_eq!(data, vec![(Pid::Rpm, 768.0), (Pid::Speed, 55.0)]);

        engine.close();
        assert_eq!(engine.state(), AdapterState::Closed);
        assert_eq!(state_changes(&drain(&mut rx)), vec![AdapterState::Closed]);
    }

    #[test]
    fn test_cycle_command_built_once() {
        let (mut engine, mut rx) = engine();
        bring_to_streaming(&mut engine);
        for _ in 0..20 {
            engine.on_bytes_received(b"B14>").unwrap();
        }
        engine
            .on_bytes_received(b"B70000200\x10\x00\x00\x00>")
            .unwrap();
        let streaming = state_changes(&drain(&mut rx))
            .into_iter()
            .filter(|s| *s == AdapterState::Streaming)
            .count();
        assert_eq!(streaming, 1);
        assert_eq!(engine.cycle_command().unwrap().output_bytes(), b"a17\x40\x41");
    }

    #[test]
    fn test_keepalive_resend() {
        let (mut engine, _rx) = engine();
        bring_to_streaming(&mut engine);

        let start = Instant::now();
        engine.poll_next_command(start).unwrap();
        let cycle = engine.poll_next_command(start).unwrap().unwrap();

        assert!(engine.poll_next_command(start + Duration::from_secs(30)).unwrap().is_none());
        assert_eq!(
            engine.poll_next_command(start + Duration::from_secs(61)).unwrap(),
            Some(cycle.clone())
        );
        assert!(engine.poll_next_command(start + Duration::from_secs(90)).unwrap().is_none());
        assert_eq!(
            engine.poll_next_command(start + Duration::from_secs(122)).unwrap(),
            Some(cycle)
        );
    }

    #[test]
    fn test_no_keepalive_without_established_connection() {
        let (mut engine, _rx) = engine();
        // certified through connecting notices only
        for _ in 0..5 {
            engine.on_bytes_received(b"B14>").unwrap();
        }
        assert_eq!(engine.state(), AdapterState::Certified);
        engine
            .on_bytes_received(b"B70000000\x00\x18\x00\x00\x00>")
            .unwrap();
        for _ in 0..7 {
            engine.on_bytes_received(b"B14>").unwrap();
        }
        assert_eq!(engine.state(), AdapterState::Streaming);

        let start = Instant::now();
        engine.poll_next_command(start).unwrap();
        assert!(engine.poll_next_command(start).unwrap().is_some());
        assert!(engine.poll_next_command(start + Duration::from_secs(120)).unwrap().is_none());
    }

    #[test]
    fn test_quirk_disabled_after_first_data() {
        let (mut engine, mut rx) = engine();
        engine.on_bytes_received(b"C1>").unwrap();

        // text PID-supported reply is rewritten while the quirk is active
        engine.on_bytes_received(b"B410000180000>").unwrap();
        assert!(engine.adapter().fingerprint().supports(Pid::Rpm));
        assert!(engine.is_quirk_enabled());

        engine.on_bytes_received(b"B40 \x0C\x00>").unwrap();
        assert!(!engine.is_quirk_enabled());
        drain(&mut rx);

        // same shape now reads as a speed frame
        engine.on_bytes_received(b"B4100BE1FA813>").unwrap();
        let speeds: Vec<_> = drain(&mut rx)
            .into_iter()
            .filter(|e| matches!(e, EngineEvent::Data(d) if d.pid == Pid::Speed))
            .collect();
        assert_eq!(speeds.len(), 1);
    }

    #[test]
    fn test_full_event_channel_drops_events() {
        let (tx, mut rx) = mpsc::channel(1);
        let mut engine = AdapterEngine::for_device("DriveDeck W4 OBD", tx).expect("drivedeck");
        // Connecting transition fills the channel
        engine.on_bytes_received(b"C1\r>B40 \x0C\x00>").unwrap();
        assert_eq!(engine.state(), AdapterState::Certified);

        assert_eq!(
            rx.try_recv().unwrap(),
            EngineEvent::StateChanged(AdapterState::Connecting)
        );
        assert!(rx.try_recv().is_err());

        // decoding keeps working once there is room again
        assert_eq!(engine.on_bytes_received(b"B41 \x37\x00>").unwrap(), 1);
        assert!(matches!(rx.try_recv().unwrap(), EngineEvent::Data(d) if d.pid == Pid::Speed));
    }

    #[test]
    fn test_payload_ending_in_line_ending_byte() {
        let (mut engine, mut rx) = engine();
        engine.on_bytes_received(b"C1\r>").unwrap();
        drain(&mut rx);

        assert_eq!(engine.on_bytes_received(b"B40 \x0C\x0D>").unwrap(), 1);
        assert_eq!(
            engine
                .on_bytes_received(b"\r\nB4D \x80\x00\xAA\xAA\x40\x0A>")
                .unwrap(),
            1
        );
        let data: Vec<_> = drain(&mut rx)
            .into_iter()
            .filter_map(|e| match e {
                EngineEvent::Data(d) => Some((d.pid, d.value)),
                _ => None,
            })
            .collect();
        assert_eq!(
            data,
            vec![
                (Pid::Rpm, 771.25),
                (Pid::O2LambdaProbe1Voltage, 2.001220703125)
            ]
        );
    }

    #[test]
    fn test_frame_errors_do_not_close() {
        let (mut engine, _rx) = engine();
        assert_eq!(engine.on_bytes_received(b"B4>X12>B99 \x01\x02>B40 \x0C>").unwrap(), 0);
        assert_eq!(engine.state(), AdapterState::Connecting);
        assert!(matches!(engine.dispatch_frame(b"B4"), Err(ObdError::NoDataReceived(_))));
    }

    #[test]
    fn test_pid_read_before_certification() {
        let (mut engine, _rx) = engine();
        let read = BasicCommand::pid(mode::CURRENT_DATA, Pid::Rpm).unwrap();
        assert!(matches!(engine.enqueue(read.clone()), Err(ObdError::AdapterSearching)));
        engine.enqueue(BasicCommand::carriage_return()).unwrap();

        engine.on_bytes_received(b"C1>").unwrap();
        engine.enqueue(read).unwrap();
        assert_eq!(engine.pending_commands(), 3);
    }

    #[test]
    fn test_closed_engine_rejects_calls() {
        let (mut engine, _rx) = engine();
        engine.close();
        engine.close();
        assert!(matches!(engine.on_bytes_received(b"C1>"), Err(ObdError::EngineClosed)));
        assert!(matches!(engine.dispatch_frame(b"C1"), Err(ObdError::EngineClosed)));
        assert!(matches!(engine.on_frame_received(b"C1"), Err(ObdError::EngineClosed)));
        assert!(matches!(engine.poll_next_command(Instant::now()), Err(ObdError::EngineClosed)));
        assert!(matches!(engine.next_command_to_send(), Err(ObdError::EngineClosed)));
        assert!(matches!(
            engine.enqueue(BasicCommand::carriage_return()),
            Err(ObdError::EngineClosed)
        ));
        assert!(matches!(engine.on_device_discovered("DriveDeck W4"), Err(ObdError::EngineClosed)));
    }

    #[test]
    fn test_states_only_move_forward() {
        let (mut engine, mut rx) = engine();
        bring_to_streaming(&mut engine);
        engine.on_device_discovered("DriveDeck W4 OBD").unwrap();
        engine.on_bytes_received(b"B14>B15VIN>C2>").unwrap();
        engine.close();

        let states = state_changes(&drain(&mut rx));
        assert!(states.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(states.last(), Some(&AdapterState::Closed));
    }
}
