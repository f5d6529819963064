//! "PIDs supported" bitmap (Mode 01, PIDs 00/20/40/...)

use crate::error::{ObdError, Result};
use crate::pid::Pid;
use crate::response::{check_status_words, normalize, CURRENT_DATA_RESPONSE};
use std::collections::BTreeSet;

/// One "PIDs supported [group+1 .. group+32]" request/response pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PidSupported {
    group: u8,
}

impl PidSupported {
    /// Groups are multiples of 0x20; the group is given as two hex digits
    pub fn new(group: &str) -> Result<Self> {
        let code = u8::from_str_radix(group, 16).map_err(|_| {
            ObdError::MalformedFrame(format!("PID supported group {:?} is not hex", group))
        })?;
        Self::from_code(code)
    }

    pub fn from_code(group: u8) -> Result<Self> {
        if group % 0x20 != 0 {
            return Err(ObdError::MalformedFrame(format!(
                "PID supported group {:02X} is not a multiple of 0x20",
                group
            )));
        }
        Ok(Self { group })
    }

    pub fn group(&self) -> u8 {
        self.group
    }

    pub fn group_hex(&self) -> String {
        format!("{:02X}", self.group)
    }

    /// Parse a canonical response `"41" || group || 8 hex digits` into the
    /// catalog PIDs whose bit is set. Bit 31 of the bitmap is PID `group + 1`.
    /// PIDs outside the catalog are dropped.
    pub fn parse_pids(&self, frame: &[u8]) -> Result<BTreeSet<Pid>> {
        let normalized = normalize(frame);
        check_status_words(&normalized)?;

        if normalized.len() < 12 {
            return Err(ObdError::MalformedFrame(format!(
                "PID supported response {:?} too short",
                normalized
            )));
        }
        if &normalized[0..2] != CURRENT_DATA_RESPONSE || normalized[2..4] != self.group_hex() {
            return Err(ObdError::UnmatchedResponse(format!(
                "expected PID supported group {}, got {:?}",
                self.group_hex(),
                &normalized[0..4]
            )));
        }

        let bitmap = u32::from_str_radix(&normalized[4..12], 16).map_err(|_| {
            ObdError::MalformedFrame(format!("bitmap {:?} is not hex", &normalized[4..12]))
        })?;

        let pids = (0..32u32)
            .filter(|bit| bitmap & (0x8000_0000 >> bit) != 0)
            .filter_map(|bit| {
                let code = self.group as u32 + bit + 1;
                u8::try_from(code).ok().and_then(Pid::from_code)
            })
            .collect();

        Ok(pids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_00_bitmap() {
        // BE1FA813: 01 03 04 05 06 07 0C 0D 0E 0F 10 11 13 15 1C 1F 20
        let pids = PidSupported::new("00").unwrap().parse_pids(b"4100BE1FA813").unwrap();
        assert!(pids.contains(&Pid::Rpm));
        assert!(pids.contains(&Pid::Speed));
        assert!(pids.contains(&Pid::Tps));
        assert!(pids.contains(&Pid::FuelSystemStatus));
        assert!(!pids.contains(&Pid::FuelPressure));
        assert!(!pids.contains(&Pid::IntakeMap));
    }

    #[test]
    fn test_group_20_lambda() {
        // bit for 0x24 is bit 3 from the top: 0x10000000
        let pids = PidSupported::new("20").unwrap().parse_pids(b"412010000000").unwrap();
        assert_eq!(pids.into_iter().collect::<Vec<_>>(), vec![Pid::O2LambdaProbe1Voltage]);
    }

    #[test]
    fn test_group_mismatch() {
        let err = PidSupported::new("00").unwrap().parse_pids(b"412010000000").unwrap_err();
        assert!(matches!(err, ObdError::UnmatchedResponse(_)));
    }

    #[test]
    fn test_invalid_group() {
        assert!(PidSupported::new("13").is_err());
        assert!(PidSupported::new("XY").is_err());
    }
}
