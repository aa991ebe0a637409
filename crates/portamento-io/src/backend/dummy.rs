//! Placeholder backend for builds without a usable MIDI system.

use super::{InputBackend, MidiApi, OutputBackend};
use crate::api::Api;
use crate::error::{Error, Result};
use crate::port::{PortDirection, PortInfo};
use portamento_input::InputDispatch;
use std::sync::Arc;
use tracing::warn;

/// Has no ports and cannot open any. Every facade operation still behaves
/// consistently so applications run without MIDI.
#[derive(Debug)]
pub struct DummyBackend {
    direction: PortDirection,
}

impl DummyBackend {
    pub fn new(direction: PortDirection) -> Self {
        warn!(?direction, "Dummy MIDI backend selected; no functionality is available");
        Self { direction }
    }

    fn unavailable(&self) -> Error {
        Error::InvalidDevice(format!(
            "the dummy backend has no {} ports",
            match self.direction {
                PortDirection::Input => "input",
                PortDirection::Output => "output",
            }
        ))
    }
}

impl MidiApi for DummyBackend {
    fn api(&self) -> Api {
        Api::Dummy
    }

    fn ports(&self) -> Result<Vec<PortInfo>> {
        Ok(Vec::new())
    }

    fn close_port(&mut self) {}

    fn is_port_open(&self) -> bool {
        false
    }

    fn port_name_open(&self) -> Option<String> {
        None
    }
}

impl InputBackend for DummyBackend {
    fn open_port(
        &mut self,
        _index: usize,
        _name: &str,
        _dispatch: Arc<InputDispatch>,
    ) -> Result<()> {
        Err(self.unavailable())
    }

    fn open_virtual_port(&mut self, _name: &str, _dispatch: Arc<InputDispatch>) -> Result<()> {
        Err(self.unavailable())
    }
}

impl OutputBackend for DummyBackend {
    fn open_port(&mut self, _index: usize, _name: &str) -> Result<()> {
        Err(self.unavailable())
    }

    fn open_virtual_port(&mut self, _name: &str) -> Result<()> {
        Err(self.unavailable())
    }

    fn send_message(&mut self, _bytes: &[u8]) -> Result<()> {
        Err(Error::invalid_use("no output port open"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dummy_has_no_ports() {
        let backend = DummyBackend::new(PortDirection::Input);
        assert!(backend.ports().unwrap().is_empty());
        assert_eq!(backend.port_count(), 0);
        assert!(backend.port_name(0).is_err());
    }

    #[test]
    fn test_dummy_open_fails() {
        let mut backend = DummyBackend::new(PortDirection::Output);
        let err = OutputBackend::open_port(&mut backend, 0, "out").unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"invalid device: the dummy backend has no output ports");
        assert!(!backend.is_port_open());
    }
}
