//! Ignore filtering for high-frequency inbound message categories.

use crate::message::status;
use serde::{Deserialize, Serialize};

/// Which inbound categories are discarded before queueing or callback
/// dispatch. Everything else always passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct IgnoreFlags {
    pub sysex: bool,
    pub timing: bool,
    pub active_sensing: bool,
}

const SYSEX_BIT: u8 = 0x01;
const TIMING_BIT: u8 = 0x02;
const SENSE_BIT: u8 = 0x04;

impl IgnoreFlags {
    pub const fn new(sysex: bool, timing: bool, active_sensing: bool) -> Self {
        Self {
            sysex,
            timing,
            active_sensing,
        }
    }

    /// Deliver everything.
    pub const fn none() -> Self {
        Self::new(false, false, false)
    }

    pub const fn all() -> Self {
        Self::new(true, true, true)
    }

    /// `in_sysex` is true while a multi-packet sysex is being reassembled;
    /// a terminator arriving then belongs to that message and is not
    /// subject to filtering.
    #[inline]
    pub fn should_ignore(&self, status_byte: u8, in_sysex: bool) -> bool {
        match status_byte {
            status::SYSEX_START => self.sysex,
            status::SYSEX_END => self.sysex && !in_sysex,
            status::TIMING_CLOCK => self.timing,
            status::ACTIVE_SENSING => self.active_sensing,
            _ => false,
        }
    }

    #[inline]
    pub(crate) const fn to_bits(self) -> u8 {
        (self.sysex as u8 * SYSEX_BIT)
            | (self.timing as u8 * TIMING_BIT)
            | (self.active_sensing as u8 * SENSE_BIT)
    }

    #[inline]
    pub(crate) const fn from_bits(bits: u8) -> Self {
        Self::new(
            bits & SYSEX_BIT != 0,
            bits & TIMING_BIT != 0,
            bits & SENSE_BIT != 0,
        )
    }
}

/// Sysex, timing clock and active sensing are all ignored until a caller
/// opts in.
impl Default for IgnoreFlags {
    fn default() -> Self {
        Self::all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nothing_ignored_when_flags_clear() {
        let flags = IgnoreFlags::none();
        for byte in [0x90, 0xB0, 0xF0, 0xF7, 0xF8, 0xFA, 0xFC, 0xFE, 0xFF] {
            assert!(!flags.should_ignore(byte, false), "{byte:#04x} ignored");
        }
    }

    #[test]
    fn test_all_flags_set() {
        let flags = IgnoreFlags::all();
        assert!(flags.should_ignore(0xF0, false));
        assert!(flags.should_ignore(0xF7, false));
        assert!(flags.should_ignore(0xF8, false));
        assert!(flags.should_ignore(0xFE, false));

        // Note on, realtime transport, system common, reset
        for byte in [0x90, 0x80, 0xFA, 0xFB, 0xFC, 0xF1, 0xF2, 0xF3, 0xF6, 0xFF] {
            assert!(!flags.should_ignore(byte, false), "{byte:#04x} ignored");
        }
    }

    #[test]
    fn test_terminator_inside_sysex_passes() {
        let flags = IgnoreFlags::all();
        assert!(!flags.should_ignore(0xF7, true));
        assert!(flags.should_ignore(0xF7, false));
    }

    #[test]
    fn test_flags_are_independent() {
        let timing_only = IgnoreFlags::new(false, true, false);
        assert!(!timing_only.should_ignore(0xF0, false));
        assert!(timing_only.should_ignore(0xF8, false));
        assert!(!timing_only.should_ignore(0xFE, false));

        let sense_only = IgnoreFlags::new(false, false, true);
        assert!(!sense_only.should_ignore(0xF8, false));
        assert!(sense_only.should_ignore(0xFE, false));
    }

    #[test]
    fn test_default_ignores_everything_filterable() {
        assert_eq!(IgnoreFlags::default(), IgnoreFlags::all());
    }

    #[test]
    fn test_bits_round_trip_every_combination() {
        for bits in 0..8u8 {
            assert_eq!(IgnoreFlags::from_bits(bits).to_bits(), bits);
        }
        assert_eq!(IgnoreFlags::all().to_bits(), 7);
    }
}
