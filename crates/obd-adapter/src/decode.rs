//! Vendor wire code -> decode rule tables

use obd_protocol::Pid;
use std::collections::BTreeSet;

/// How a vendor payload maps onto a standard PID
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeRule {
    /// Payload already in standard byte order
    Direct(Pid),
    /// Standard data bytes start at `offset` within the payload
    Shifted { pid: Pid, offset: usize },
    /// Wide-band lambda probe: ratio in bytes 0-1, probe value at
    /// `value_offset`. Current when the adapter reported current support,
    /// voltage otherwise.
    LambdaProbe { value_offset: usize },
}

impl DecodeRule {
    /// Resolve to the standard PID and its data bytes
    pub fn resolve(&self, payload: &[u8], supported: &BTreeSet<Pid>) -> (Pid, Vec<u8>) {
        match *self {
            DecodeRule::Direct(pid) => (pid, payload.to_vec()),
            DecodeRule::Shifted { pid, offset } => {
                (pid, payload.get(offset..).unwrap_or_default().to_vec())
            }
            DecodeRule::LambdaProbe { value_offset } => {
                let pid = if supported.contains(&Pid::O2LambdaProbe1Current) {
                    Pid::O2LambdaProbe1Current
                } else {
                    Pid::O2LambdaProbe1Voltage
                };
                let mut data: Vec<u8> = payload.iter().take(2).copied().collect();
                data.extend(payload.iter().skip(value_offset).take(2));
                (pid, data)
            }
        }
    }
}

/// Static lookup table of one adapter family
#[derive(Debug, Clone, Copy)]
pub struct VendorTable {
    entries: &'static [(&'static str, DecodeRule)],
}

impl VendorTable {
    pub const fn new(entries: &'static [(&'static str, DecodeRule)]) -> Self {
        Self { entries }
    }

    pub fn lookup(&self, wire_code: &str) -> Option<DecodeRule> {
        self.entries
            .iter()
            .find(|(code, _)| code.eq_ignore_ascii_case(wire_code))
            .map(|(_, rule)| *rule)
    }
}
