//! Inbound MIDI core shared by every backend.
//!
//! A backend's driver thread hands raw packets to [`InputDispatch`], which
//! filters them, reassembles fragmented sysex, and delivers each complete
//! [`MidiMessage`] either to a bounded queue for polling or to a callback.

pub mod error;
pub use error::{Error, ErrorCallback, ErrorKind, Result};

pub mod message;
pub use message::{status, MessageBytes, MidiMessage};

pub mod queue;
pub use queue::{message_queue, QueueConsumer, QueueProducer};

pub mod filter;
pub use filter::IgnoreFlags;

pub mod sysex;
pub use sysex::{Anomaly, Fragment, SysexReassembler};

pub mod config;
pub use config::{InputConfig, DEFAULT_CLIENT_NAME, DEFAULT_QUEUE_SIZE_LIMIT};

mod dispatch;
pub use dispatch::InputDispatch;
