//! Response quirk workarounds
//!
//! Some adapters send non-conformant frames while they are still initialising.
//! A quirk rewrites those frames before classification. The engine stops
//! applying it once the first genuine PID value was decoded.

use std::borrow::Cow;

pub trait ResponseQuirk: Send {
    /// Rewrite a frame, or hand it back untouched
    fn apply<'a>(&self, frame: &'a [u8]) -> Cow<'a, [u8]>;
}

/// Pass-through quirk for adapters that need no workaround
#[derive(Debug, Clone, Copy, Default)]
pub struct NoQuirk;

impl ResponseQuirk for NoQuirk {
    fn apply<'a>(&self, frame: &'a [u8]) -> Cow<'a, [u8]> {
        Cow::Borrowed(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_quirk_borrows() {
        let frame = b"B14";
        assert!(matches!(NoQuirk.apply(frame), Cow::Borrowed(f) if f == frame));
    }
}
