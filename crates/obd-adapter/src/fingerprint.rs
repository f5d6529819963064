//! Per-connection adapter fingerprint
//!
//! Everything a variant learns about the adapter while frames arrive. The
//! setters only ever move forward: the protocol is set once, the supported
//! set only grows and the cycle command is built once.

use obd_protocol::{BasicCommand, ObdProtocol, Pid};
use std::collections::BTreeSet;
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct Fingerprint {
    protocol: ObdProtocol,
    vin: Option<String>,
    connecting_messages: u32,
    frames_since_certification: u32,
    pid_supported_reports: u32,
    supported_pids: BTreeSet<Pid>,
    cycle_command: Option<BasicCommand>,
}

impl Fingerprint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn protocol(&self) -> ObdProtocol {
        self.protocol
    }

    /// Record the detected bus protocol. Returns `false` when a protocol was
    /// already known; later reports are ignored.
    pub fn detect_protocol(&mut self, protocol: ObdProtocol) -> bool {
        if !protocol.is_known() {
            return false;
        }
        if self.protocol.is_known() {
            debug!(
                "Ignoring protocol report {}, already detected {}",
                protocol, self.protocol
            );
            return false;
        }
        info!("Protocol is: {}", protocol);
        self.protocol = protocol;
        true
    }

    pub fn vin(&self) -> Option<&str> {
        self.vin.as_deref()
    }

    /// Record the VIN. The first non-empty report wins.
    pub fn record_vin(&mut self, vin: &str) -> bool {
        let vin = vin.trim();
        if vin.is_empty() || self.vin.is_some() {
            return false;
        }
        info!("VIN is: {}", vin);
        self.vin = Some(vin.to_string());
        true
    }

    pub fn connecting_messages(&self) -> u32 {
        self.connecting_messages
    }

    pub fn count_connecting_message(&mut self) -> u32 {
        self.connecting_messages += 1;
        self.connecting_messages
    }

    pub fn frames_since_certification(&self) -> u32 {
        self.frames_since_certification
    }

    pub fn count_frame(&mut self) -> u32 {
        self.frames_since_certification += 1;
        self.frames_since_certification
    }

    pub fn pid_supported_reports(&self) -> u32 {
        self.pid_supported_reports
    }

    pub fn supported_pids(&self) -> &BTreeSet<Pid> {
        &self.supported_pids
    }

    pub fn supports(&self, pid: Pid) -> bool {
        self.supported_pids.contains(&pid)
    }

    /// Union newly reported PIDs into the supported set
    pub fn merge_supported<I: IntoIterator<Item = Pid>>(&mut self, pids: I) {
        self.supported_pids.extend(pids);
        self.pid_supported_reports += 1;
        info!("Supported PIDs: {:?}", self.supported_pids);
    }

    pub fn cycle_command(&self) -> Option<&BasicCommand> {
        self.cycle_command.as_ref()
    }

    /// Store the cycle command. A second call keeps the first command.
    pub fn set_cycle_command(&mut self, command: BasicCommand) -> bool {
        if self.cycle_command.is_some() {
            return false;
        }
        self.cycle_command = Some(command);
        true
    }
}
