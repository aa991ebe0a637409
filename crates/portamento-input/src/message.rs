//! Decoded inbound MIDI message record.

use smallvec::SmallVec;

/// Raw bytes of one message. Channel and most system messages fit inline;
/// sysex spills to the heap.
pub type MessageBytes = SmallVec<[u8; 4]>;

/// Status bytes the input core has to recognise.
pub mod status {
    pub const SYSEX_START: u8 = 0xF0;
    pub const SYSEX_END: u8 = 0xF7;
    pub const TIMING_CLOCK: u8 = 0xF8;
    pub const START: u8 = 0xFA;
    pub const CONTINUE: u8 = 0xFB;
    pub const STOP: u8 = 0xFC;
    pub const ACTIVE_SENSING: u8 = 0xFE;

    #[inline]
    pub fn is_status(byte: u8) -> bool {
        byte & 0x80 != 0
    }

    /// System real-time bytes may appear anywhere in the stream, including
    /// inside a sysex message.
    #[inline]
    pub fn is_realtime(byte: u8) -> bool {
        byte >= TIMING_CLOCK
    }
}

/// One complete MIDI message with its delta time.
///
/// `timestamp` is the number of seconds since the previous accepted event on
/// the same port; the first event after a port is opened carries `0.0`.
/// A sysex message is always delivered whole, never split across records.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MidiMessage {
    timestamp: f64,
    bytes: MessageBytes,
}

impl MidiMessage {
    pub fn new(timestamp: f64, bytes: impl Into<MessageBytes>) -> Self {
        Self {
            timestamp,
            bytes: bytes.into(),
        }
    }

    pub fn from_slice(timestamp: f64, bytes: &[u8]) -> Self {
        Self::new(timestamp, MessageBytes::from_slice(bytes))
    }

    /// The "no message" record returned when nothing is queued.
    pub fn empty() -> Self {
        Self::default()
    }

    #[inline]
    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[inline]
    pub fn status(&self) -> Option<u8> {
        self.bytes.first().copied()
    }

    pub fn is_sysex(&self) -> bool {
        self.status() == Some(status::SYSEX_START)
    }

    pub fn into_bytes(self) -> MessageBytes {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_message() {
        let msg = MidiMessage::empty();
        assert!(msg.is_empty());
        assert_eq!(msg.timestamp(), 0.0);
        assert_eq!(msg.status(), None);
        assert!(!msg.is_sysex());
    }

    #[test]
    fn test_note_on_stays_inline() {
        let msg = MidiMessage::from_slice(0.25, &[0x90, 60, 100]);
        assert_eq!(msg.bytes(), &[0x90, 60, 100]);
        assert_eq!(msg.status(), Some(0x90));
        assert!(!msg.into_bytes().spilled());
    }

    #[test]
    fn test_sysex_detection() {
        let msg = MidiMessage::new(0.0, vec![0xF0u8, 0x7E, 0x7F, 0x06, 0x01, 0xF7]);
        assert!(msg.is_sysex());
        assert_eq!(msg.len(), 6);
    }

    #[test]
    fn test_status_helpers() {
        assert!(status::is_status(0x90));
        assert!(!status::is_status(0x3C));
        assert!(status::is_realtime(status::TIMING_CLOCK));
        assert!(status::is_realtime(status::ACTIVE_SENSING));
        assert!(!status::is_realtime(status::SYSEX_END));
    }
}
