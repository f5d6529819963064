//! DriveDeck cyclic polling command

use obd_protocol::{BasicCommand, Pid};
use std::collections::BTreeSet;
use tracing::info;

/// Prefix of the cycle command
const CYCLE_COMMAND_PREFIX: &[u8] = b"a17";

/// Standard PIDs the DriveDeck can stream and the code it uses for them
const DRIVEDECK_EQUIVALENTS: [(Pid, u8); 9] = [
    (Pid::Rpm, 0x40),
    (Pid::Speed, 0x41),
    (Pid::Maf, 0x42),
    (Pid::Tps, 0x44),
    (Pid::CalculatedEngineLoad, 0x45),
    (Pid::IntakeAirTemp, 0x49),
    (Pid::O2LambdaProbe1Voltage, 0x4D),
    (Pid::O2LambdaProbe1Current, 0x4D),
    (Pid::IntakeMap, 0x52),
];

/// DriveDeck code for a standard PID
pub fn drivedeck_code(pid: Pid) -> Option<u8> {
    DRIVEDECK_EQUIVALENTS
        .iter()
        .find(|(p, _)| *p == pid)
        .map(|(_, code)| *code)
}

/// Build the cycle command for the given supported set.
///
/// An empty set means the adapter never told us, so every PID with a
/// DriveDeck equivalent is requested.
pub fn build_cycle_command(supported: &BTreeSet<Pid>) -> BasicCommand {
    let mut codes: Vec<u8> = Vec::new();

    for pid in Pid::ALL {
        let Some(code) = drivedeck_code(pid) else {
            continue;
        };
        if !supported.is_empty() && !supported.contains(&pid) {
            info!("PID {} not supported. Skipping.", pid);
            continue;
        }
        if !codes.contains(&code) {
            codes.push(code);
        }
    }

    let mut bytes = CYCLE_COMMAND_PREFIX.to_vec();
    bytes.extend_from_slice(&codes);
    BasicCommand::control("drivedeck-cycle", bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_set_requests_everything() {
        let cmd = build_cycle_command(&BTreeSet::new());
        let bytes = cmd.output_bytes();
        assert_eq!(&bytes[..3], b"a17");
        // both lambda variants share one code
        assert_eq!(bytes.len(), 3 + 8);
        assert!(!cmd.awaits_results());
    }

    #[test]
    fn test_only_supported_pids() {
        let supported: BTreeSet<Pid> = [Pid::Rpm, Pid::Speed, Pid::CoolantTemp].into_iter().collect();
        let cmd = build_cycle_command(&supported);
        assert_eq!(cmd.output_bytes(), b"a17\x40\x41");
    }

    #[test]
    fn test_codes() {
        assert_eq!(drivedeck_code(Pid::IntakeMap), Some(0x52));
        assert_eq!(drivedeck_code(Pid::CoolantTemp), None);
    }
}
