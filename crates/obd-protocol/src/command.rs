//! OBD-II request commands
//!
//! A [`BasicCommand`] serializes to its transport bytes exactly once, at
//! construction. Retries re-send the same buffer.

use crate::error::{ObdError, Result};
use crate::pid::Pid;
use std::fmt;

/// Largest response-line hint an adapter accepts (single ASCII digit)
pub const MAX_EXPECTED_LINES: u8 = 9;

/// What a command asks the adapter to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    /// Read one PID in the given mode
    PidRead {
        mode: String,
        pid: Pid,
        expected_lines: u8,
    },
    /// Adapter control frame that does not target a PID
    Control { name: &'static str },
}

/// Immutable request descriptor with its precomputed wire bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicCommand {
    kind: CommandKind,
    bytes: Vec<u8>,
}

impl BasicCommand {
    /// Build a PID read with the adapter's default response timing
    pub fn pid(mode: &str, pid: Pid) -> Result<Self> {
        Self::pid_with_lines(mode, pid, 0)
    }

    /// Build a PID read.
    ///
    /// `expected_lines` tells the adapter how many response lines to wait for
    /// before answering. 0 keeps the default timeout behaviour; 1-9 return as
    /// soon as that many lines arrived.
    pub fn pid_with_lines(mode: &str, pid: Pid, expected_lines: u8) -> Result<Self> {
        if expected_lines > MAX_EXPECTED_LINES {
            return Err(ObdError::InvalidConfiguration(format!(
                "expected response lines {} out of allowed bounds [0, {}]",
                expected_lines, MAX_EXPECTED_LINES
            )));
        }
        if mode.is_empty() || !mode.is_ascii() {
            return Err(ObdError::InvalidConfiguration(format!(
                "invalid command mode {:?}",
                mode
            )));
        }

        let mut bytes = Vec::with_capacity(mode.len() + 4);
        bytes.extend_from_slice(mode.as_bytes());
        bytes.push(b' ');
        bytes.extend_from_slice(pid.hex_code().as_bytes());
        if expected_lines > 0 {
            bytes.push(b'0' + expected_lines);
        }

        Ok(Self {
            kind: CommandKind::PidRead {
                mode: mode.to_string(),
                pid,
                expected_lines,
            },
            bytes,
        })
    }

    /// Build a control frame from raw bytes
    pub fn control(name: &'static str, bytes: Vec<u8>) -> Self {
        Self {
            kind: CommandKind::Control { name },
            bytes,
        }
    }

    /// Empty frame; once terminated it is a bare carriage return that wakes
    /// the adapter up.
    pub fn carriage_return() -> Self {
        Self::control("carriage-return", Vec::new())
    }

    pub fn kind(&self) -> &CommandKind {
        &self.kind
    }

    /// Targeted PID, if this is a PID read
    pub fn target_pid(&self) -> Option<Pid> {
        match &self.kind {
            CommandKind::PidRead { pid, .. } => Some(*pid),
            CommandKind::Control { .. } => None,
        }
    }

    /// Serialized command without the transport terminator
    pub fn output_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Whether the caller has to wait for a reply
    pub fn awaits_results(&self) -> bool {
        matches!(self.kind, CommandKind::PidRead { .. })
    }

    /// Bytes as written to the wire: command followed by the terminator
    pub fn to_wire(&self, terminator: u8) -> Vec<u8> {
        let mut wire = Vec::with_capacity(self.bytes.len() + 1);
        wire.extend_from_slice(&self.bytes);
        wire.push(terminator);
        wire
    }
}

impl fmt::Display for BasicCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            CommandKind::PidRead { .. } => write!(f, "{}", String::from_utf8_lossy(&self.bytes)),
            CommandKind::Control { name } => write!(f, "<{}>", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode;
    use proptest::prelude::*;

    #[test]
    fn test_pid_command_bytes() {
        let cmd = BasicCommand::pid(mode::CURRENT_DATA, Pid::Rpm).unwrap();
        assert_eq!(cmd.output_bytes(), b"01 0C");
        assert!(cmd.awaits_results());
        assert_eq!(cmd.target_pid(), Some(Pid::Rpm));
    }

    #[test]
    fn test_fast_path_digit_appended() {
        let cmd = BasicCommand::pid_with_lines(mode::CURRENT_DATA, Pid::Speed, 1).unwrap();
        assert_eq!(cmd.output_bytes(), b"01 0D1");
        assert_eq!(cmd.to_wire(b'\r'), b"01 0D1\r");
    }

    #[test]
    fn test_line_count_out_of_range() {
        let err = BasicCommand::pid_with_lines(mode::CURRENT_DATA, Pid::Speed, 10).unwrap_err();
        assert!(matches!(err, ObdError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_carriage_return_is_control() {
        let cmd = BasicCommand::carriage_return();
        assert!(!cmd.awaits_results());
        assert_eq!(cmd.target_pid(), None);
        assert_eq!(cmd.to_wire(b'\r'), b"\r");
    }

    fn any_pid() -> impl Strategy<Value = Pid> {
        prop::sample::select(Pid::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn prop_serialization_is_deterministic(pid in any_pid(), lines in 0u8..=9, mode in "0[1-9]") {
            let first = BasicCommand::pid_with_lines(&mode, pid, lines).unwrap();
            let second = BasicCommand::pid_with_lines(&mode, pid, lines).unwrap();
            prop_assert_eq!(first.output_bytes(), second.output_bytes());
            let cloned = first.clone();
            prop_assert_eq!(first.output_bytes(), cloned.output_bytes());
        }

        #[test]
        fn prop_out_of_range_lines_rejected(pid in any_pid(), lines in 10u8..) {
            let result = BasicCommand::pid_with_lines(mode::CURRENT_DATA, pid, lines);
            prop_assert!(matches!(result, Err(ObdError::InvalidConfiguration(_))));
        }
    }
}
