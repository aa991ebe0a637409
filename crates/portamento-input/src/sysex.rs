//! Reassembly of system-exclusive messages delivered in several packets.
//!
//! Drivers hand sysex over in transport-sized fragments. The reassembler
//! buffers them until the terminating `0xF7` arrives and then yields the
//! whole message once. System real-time packets may interleave with a sysex
//! and are passed through without touching the buffered state.

use crate::message::{status, MessageBytes};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Accumulating,
    /// Discarding the remaining packets of an ignored sysex.
    Skipping,
}

/// Outcome of feeding one packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// A complete message ready for delivery.
    Complete(MessageBytes),
    /// The packet was buffered; the sysex is still open.
    Pending,
    /// The packet could not be attached to anything and was discarded.
    Dropped,
}

/// Protocol anomalies. None of them is fatal; they are reported as warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anomaly {
    /// A status byte cut an open sysex short.
    Interrupted { status: u8, discarded: usize },
    /// A new sysex started before the previous one was terminated.
    Restarted { discarded: usize },
    /// `0xF7` arrived with no sysex open.
    StrayTerminator,
    /// A status byte ended an ignored sysex before its terminator.
    SkipInterrupted { status: u8 },
}

impl Anomaly {
    /// Anomalies that lose no deliverable data.
    pub fn is_debug(&self) -> bool {
        matches!(self, Anomaly::SkipInterrupted { .. })
    }
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anomaly::Interrupted { status, discarded } => write!(
                f,
                "sysex interrupted by status byte {status:#04x}, discarded {discarded} bytes"
            ),
            Anomaly::Restarted { discarded } => write!(
                f,
                "sysex restarted before termination, discarded {discarded} bytes"
            ),
            Anomaly::StrayTerminator => write!(f, "end-of-exclusive without a sysex start"),
            Anomaly::SkipInterrupted { status } => write!(
                f,
                "ignored sysex interrupted by status byte {status:#04x}"
            ),
        }
    }
}

#[derive(Debug)]
pub struct SysexReassembler {
    state: State,
    partial: Vec<u8>,
}

impl SysexReassembler {
    pub fn new() -> Self {
        Self {
            state: State::Idle,
            partial: Vec::new(),
        }
    }

    /// True while a sysex is open and being buffered.
    #[inline]
    pub fn is_accumulating(&self) -> bool {
        self.state == State::Accumulating
    }

    #[inline]
    pub fn is_skipping(&self) -> bool {
        self.state == State::Skipping
    }

    /// Bytes buffered for the open sysex.
    pub fn partial(&self) -> &[u8] {
        &self.partial
    }

    /// Forget any open sysex. Called when a port is (re)opened.
    pub fn reset(&mut self) {
        self.state = State::Idle;
        self.partial.clear();
    }

    /// Feed one non-empty packet.
    pub fn feed(&mut self, bytes: &[u8]) -> (Fragment, Option<Anomaly>) {
        let Some(&first) = bytes.first() else {
            return (Fragment::Dropped, None);
        };

        if status::is_realtime(first) {
            return (Fragment::Complete(MessageBytes::from_slice(bytes)), None);
        }

        let mut anomaly = None;
        match self.state {
            State::Accumulating if first == status::SYSEX_START => {
                anomaly = Some(Anomaly::Restarted {
                    discarded: self.partial.len(),
                });
                self.reset();
            }
            State::Accumulating if status::is_status(first) && first != status::SYSEX_END => {
                anomaly = Some(Anomaly::Interrupted {
                    status: first,
                    discarded: self.partial.len(),
                });
                self.reset();
            }
            State::Accumulating => {
                self.partial.extend_from_slice(bytes);
                return (self.finish_if_terminated(), None);
            }
            State::Skipping => {
                let (consumed, cut) = self.skip_continuation(bytes);
                if consumed {
                    return (Fragment::Dropped, None);
                }
                anomaly = cut;
            }
            State::Idle => {}
        }

        let fragment = match first {
            status::SYSEX_START if ends_sysex(bytes) => {
                Fragment::Complete(MessageBytes::from_slice(bytes))
            }
            status::SYSEX_START => {
                self.state = State::Accumulating;
                self.partial.extend_from_slice(bytes);
                Fragment::Pending
            }
            status::SYSEX_END => {
                anomaly = Some(Anomaly::StrayTerminator);
                Fragment::Dropped
            }
            _ => Fragment::Complete(MessageBytes::from_slice(bytes)),
        };
        (fragment, anomaly)
    }

    /// Enter the skipping state for an ignored sysex start packet. The
    /// following continuation packets are dropped up to the terminator.
    ///
    /// A sysex still being accumulated is discarded and reported as
    /// [`Anomaly::Restarted`].
    pub fn skip(&mut self, bytes: &[u8]) -> Option<Anomaly> {
        let anomaly = self.is_accumulating().then(|| Anomaly::Restarted {
            discarded: self.partial.len(),
        });
        self.partial.clear();
        self.state = if ends_sysex(bytes) {
            State::Idle
        } else {
            State::Skipping
        };
        anomaly
    }

    /// Consumes `bytes` if they continue a skipped sysex.
    ///
    /// Returns whether the packet was consumed, plus
    /// [`Anomaly::SkipInterrupted`] when a status byte ends the skip early.
    pub fn skip_continuation(&mut self, bytes: &[u8]) -> (bool, Option<Anomaly>) {
        if self.state != State::Skipping {
            return (false, None);
        }
        let Some(&first) = bytes.first() else {
            return (false, None);
        };
        if status::is_realtime(first) {
            return (false, None);
        }
        if status::is_status(first) && first != status::SYSEX_END {
            self.state = State::Idle;
            return (false, Some(Anomaly::SkipInterrupted { status: first }));
        }
        if ends_sysex(bytes) {
            self.state = State::Idle;
        }
        (true, None)
    }

    fn finish_if_terminated(&mut self) -> Fragment {
        if !ends_sysex(&self.partial) {
            return Fragment::Pending;
        }
        self.state = State::Idle;
        Fragment::Complete(MessageBytes::from_vec(std::mem::take(&mut self.partial)))
    }
}

impl Default for SysexReassembler {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn ends_sysex(bytes: &[u8]) -> bool {
    bytes.last() == Some(&status::SYSEX_END)
}
