//! # Portamento - Real-time MIDI I/O
//!
//! Uniform MIDI input and output over several backends.
//!
//! ## Architecture
//!
//! Portamento is an umbrella crate that coordinates:
//! - **portamento-input** - Inbound dispatch core (message queue, ignore filter,
//!   sysex reassembly, callback delivery)
//! - **portamento-io** - Backends (midir, loopback, dummy) and the `MidiIn` /
//!   `MidiOut` facades
//!
//! ## Quick Start
//!
//! ```no_run
//! use portamento::prelude::*;
//!
//! let mut midi_in = MidiIn::builder().api(Api::Loopback).build()?;
//! midi_in.ignore_types(false, true, true);
//! midi_in.open_virtual_port("Sequencer In")?;
//!
//! let mut midi_out = MidiOut::new(Api::Loopback, "Sequencer")?;
//! midi_out.open_port_by_name("sequencer in", "Out")?;
//! midi_out.send_message(&[0x90, 60, 100])?;
//!
//! let message = midi_in.get_message()?;
//! println!("{:?} after {}s", message.bytes(), message.timestamp());
//! # Ok::<(), portamento::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `default` - System MIDI through midir
//! - `midi-io` - System MIDI through midir

/// Re-export of portamento-input for direct access
pub use portamento_input as input;
/// Re-export of portamento-io for direct access
pub use portamento_io as io;

pub mod error;
pub use error::{Error, Result};

pub use portamento_input::{
    status, ErrorCallback, ErrorKind, IgnoreFlags, InputConfig, InputDispatch, MidiMessage,
    DEFAULT_CLIENT_NAME, DEFAULT_QUEUE_SIZE_LIMIT,
};

pub use portamento_io::{
    compiled_apis, version, Api, MidiIn, MidiInBuilder, MidiOut, MidiOutBuilder, PortDirection,
    PortInfo,
};

/// Commonly used types.
pub mod prelude {
    pub use crate::{
        Api, Error, IgnoreFlags, InputConfig, MidiIn, MidiMessage, MidiOut, PortInfo, Result,
    };
}
