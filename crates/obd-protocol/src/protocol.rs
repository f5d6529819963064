//! Vehicle bus protocols an adapter may report

use serde::{Deserialize, Serialize};
use std::fmt;

/// Vehicle-side protocol detected by the adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ObdProtocol {
    /// Not (yet) reported by the adapter
    #[default]
    Unknown,
    /// ISO 15765-4 CAN (11 bit ID, 500 kbaud)
    Can11bit500,
    /// ISO 15765-4 CAN (11 bit ID, 250 kbaud)
    Can11bit250,
    /// ISO 15765-4 CAN (29 bit ID, 500 kbaud)
    Can29bit500,
    /// ISO 15765-4 CAN (29 bit ID, 250 kbaud)
    Can29bit250,
    /// ISO 14230-4 KWP (slow init)
    KwpSlow,
    /// ISO 14230-4 KWP (fast init)
    KwpFast,
    /// ISO 9141-2 (5 baud init)
    Iso9141,
}

impl ObdProtocol {
    /// Check if this is a CAN protocol
    pub fn is_can(&self) -> bool {
        matches!(
            self,
            ObdProtocol::Can11bit500
                | ObdProtocol::Can11bit250
                | ObdProtocol::Can29bit500
                | ObdProtocol::Can29bit250
        )
    }

    pub fn is_known(&self) -> bool {
        *self != ObdProtocol::Unknown
    }
}

impl fmt::Display for ObdProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ObdProtocol::Unknown => "unknown",
            ObdProtocol::Can11bit500 => "CAN 11/500",
            ObdProtocol::Can11bit250 => "CAN 11/250",
            ObdProtocol::Can29bit500 => "CAN 29/500",
            ObdProtocol::Can29bit250 => "CAN 29/250",
            ObdProtocol::KwpSlow => "KWP slow init",
            ObdProtocol::KwpFast => "KWP fast init",
            ObdProtocol::Iso9141 => "ISO 9141-2",
        };
        f.write_str(label)
    }
}
