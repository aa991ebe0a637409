//! Cross-platform MIDI input and output.
//!
//! [`MidiIn`] and [`MidiOut`] expose the same operations on every backend:
//! enumerate ports, open or close a connection, send messages, and receive
//! them by polling or through a callback.
//!
//! Feature gates: `midi-io` (system MIDI through midir, on by default).

pub mod error;
pub use error::{Error, Result};

mod api;
pub use api::{compiled_apis, Api};

mod port;
pub use port::{PortDirection, PortInfo};

pub mod backend;
pub use backend::{InputBackend, MidiApi, OutputBackend};

mod input;
pub use input::{MidiIn, MidiInBuilder, DEFAULT_INPUT_PORT_NAME};

mod output;
pub use output::{MidiOut, MidiOutBuilder, DEFAULT_OUTPUT_CLIENT_NAME, DEFAULT_OUTPUT_PORT_NAME};

pub use portamento_input::{
    ErrorCallback, ErrorKind, IgnoreFlags, InputConfig, MidiMessage, DEFAULT_CLIENT_NAME,
    DEFAULT_QUEUE_SIZE_LIMIT,
};

/// Version of this crate.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_matches_manifest() {
        assert_eq!(version(), "0.0.1");
    }
}
