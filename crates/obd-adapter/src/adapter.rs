//! Capability interface implemented by every adapter family

use crate::fingerprint::Fingerprint;
use crate::framer::FrameDelimiters;
use crate::quirk::ResponseQuirk;
use obd_protocol::{BasicCommand, DataResponse, ObdProtocol, Pid, Result};
use serde::Serialize;
use std::collections::BTreeSet;
use std::time::Duration;

/// Metadata reported by the adapter instead of a PID value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum StatusUpdate {
    /// "Connecting to vehicle" notice, with the running count
    Connecting(u32),
    Vin(String),
    Protocol(ObdProtocol),
    /// Result of one PID-supported report merged into the set
    SupportedPids(BTreeSet<Pid>),
    ControlUnits(String),
    EngineOn,
    EngineOff,
}

/// Classification result of one inbound frame
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    Data(DataResponse),
    Status(StatusUpdate),
    /// Frame understood but carries nothing to report (echoes, repeats)
    Skipped,
}

/// Adapter family hooks driven by [`crate::AdapterEngine`]
pub trait AdapterProtocol: Send {
    /// Human-readable adapter family name
    fn name(&self) -> &'static str;

    fn delimiters(&self) -> FrameDelimiters;

    /// Does a discovered device name belong to this family?
    fn supports_device(&self, device_name: &str) -> bool;

    /// Enough evidence collected that this really is the adapter we think
    fn has_certified_connection(&self) -> bool;

    /// The adapter reached the vehicle (protocol or VIN known)
    fn has_established_connection(&self) -> bool;

    /// How long the surrounding scheduler should wait for certification
    fn expected_init_period(&self) -> Duration;

    /// Idle time after which the cyclic command is re-sent
    fn keepalive_interval(&self) -> Duration;

    /// Commands queued when the connection starts
    fn initial_commands(&self) -> Vec<BasicCommand>;

    fn quirk(&self) -> Box<dyn ResponseQuirk>;

    /// Classify and decode one frame (after the quirk ran)
    fn decode_frame(&mut self, frame: &[u8]) -> Result<FrameOutcome>;

    /// Build the cyclic polling command when its preconditions hold.
    /// Returns `Some` at most once per connection.
    fn check_for_cycle_command(&mut self) -> Option<BasicCommand>;

    fn fingerprint(&self) -> &Fingerprint;
}
