//! DriveDeck PID-supported workaround
//!
//! While initialising, some DriveDeck firmware answers PID-supported discovery
//! with the plain ELM text reply behind the vendor prefix (`B4100BE1FA813`)
//! instead of its own `B70` status group. Unfixed, the `41` would be read as the
//! vendor speed code. The quirk rewrites such frames into the `B70` layout.

use super::{RESPONSE_PREFIX_CHAR, SUPPORTED_PIDS_GROUP};
use crate::framer::trim_trailing_line_endings;
use crate::quirk::ResponseQuirk;
use obd_protocol::CURRENT_DATA_RESPONSE;
use std::borrow::Cow;

/// `B` + `41` + group (2) + bitmap (8)
const TEXT_REPLY_LEN: usize = 13;

/// Filler for `B70` bytes that carry nothing discovery needs
const FILLER: u8 = b'0';

#[derive(Debug, Clone, Copy, Default)]
pub struct PidSupportedQuirk;

impl PidSupportedQuirk {
    fn rewrite(frame: &[u8]) -> Option<Vec<u8>> {
        let frame = trim_trailing_line_endings(frame);
        if frame.len() != TEXT_REPLY_LEN
            || frame[0] != RESPONSE_PREFIX_CHAR
            || &frame[1..3] != CURRENT_DATA_RESPONSE.as_bytes()
        {
            return None;
        }

        let group = std::str::from_utf8(&frame[3..5]).ok()?;
        let group = u8::from_str_radix(group, 16).ok()?;
        if group % 0x20 != 0 {
            return None;
        }
        let bitmap = hex::decode(&frame[5..13]).ok()?;

        let mut rewritten = Vec::with_capacity(14);
        rewritten.push(RESPONSE_PREFIX_CHAR);
        rewritten.extend_from_slice(SUPPORTED_PIDS_GROUP.as_bytes());
        rewritten.extend_from_slice(&[FILLER; 3]);
        rewritten.extend_from_slice(&frame[3..5]);
        rewritten.push(FILLER);
        rewritten.extend_from_slice(&bitmap[0..2]);
        rewritten.push(FILLER);
        rewritten.extend_from_slice(&bitmap[2..4]);
        Some(rewritten)
    }
}

impl ResponseQuirk for PidSupportedQuirk {
    fn apply<'a>(&self, frame: &'a [u8]) -> Cow<'a, [u8]> {
        match Self::rewrite(frame) {
            Some(rewritten) => Cow::Owned(rewritten),
            None => Cow::Borrowed(frame),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_reply_rewritten() {
        let out = PidSupportedQuirk.apply(b"B4120A0000001");
        assert_eq!(
            out.as_ref(),
            &[b'B', b'7', b'0', b'0', b'0', b'0', b'2', b'0', b'0', 0xA0, 0x00, b'0', 0x00, 0x01]
        );
    }

    #[test]
    fn test_text_reply_with_line_ending() {
        let out = PidSupportedQuirk.apply(b"B4100BE1FA813\r");
        assert_eq!(&out[..9], b"B70000000");
        assert_eq!(&out[9..], &[0xBE, 0x1F, b'0', 0xA8, 0x13]);
    }

    #[test]
    fn test_other_frames_untouched() {
        for frame in [&b"B14"[..], b"B41 \x00\x37\x00\x00\x00\x00", b"C1", b"B4113ZZZZZZZZ"] {
            assert!(matches!(PidSupportedQuirk.apply(frame), Cow::Borrowed(_)));
        }
    }
}
