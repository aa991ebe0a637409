//! Backend capability traits and the concrete backends.
//!
//! A facade owns exactly one backend, chosen by [`Api`] at construction and
//! stored as an enum so the choice stays visible in the type.

mod dummy;
mod loopback;
#[cfg(feature = "midi-io")]
mod native;

#[cfg(feature = "midi-io")]
pub use native::{MidirInput, MidirOutput};
pub use dummy::DummyBackend;
pub use loopback::{LoopbackInput, LoopbackOutput};

use crate::api::Api;
use crate::error::{Error, Result};
use crate::port::{PortDirection, PortInfo};
use portamento_input::InputDispatch;
use std::sync::Arc;
use tracing::debug;

/// Operations common to input and output backends.
pub trait MidiApi {
    fn api(&self) -> Api;

    fn ports(&self) -> Result<Vec<PortInfo>>;

    fn port_count(&self) -> usize {
        self.ports().map(|ports| ports.len()).unwrap_or(0)
    }

    fn port_name(&self, index: usize) -> Result<String> {
        let ports = self.ports()?;
        let available = ports.len();
        ports
            .into_iter()
            .nth(index)
            .map(|port| port.name)
            .ok_or_else(|| out_of_range(index, available))
    }

    /// No-op when nothing is open.
    fn close_port(&mut self);

    fn is_port_open(&self) -> bool;

    /// Name of the connected port, or of the virtual port this backend owns.
    fn port_name_open(&self) -> Option<String>;
}

/// Input side. The backend's driver thread feeds the dispatch core.
pub trait InputBackend: MidiApi {
    fn open_port(&mut self, index: usize, port_name: &str, dispatch: Arc<InputDispatch>)
        -> Result<()>;

    /// Creates a port other applications can send to.
    fn open_virtual_port(&mut self, port_name: &str, dispatch: Arc<InputDispatch>) -> Result<()>;
}

pub trait OutputBackend: MidiApi {
    fn open_port(&mut self, index: usize, port_name: &str) -> Result<()>;

    /// Creates a port other applications can receive from.
    fn open_virtual_port(&mut self, port_name: &str) -> Result<()>;

    fn send_message(&mut self, bytes: &[u8]) -> Result<()>;
}

pub(crate) fn out_of_range(index: usize, available: usize) -> Error {
    if available == 0 {
        return Error::NoDevicesFound;
    }
    Error::InvalidDevice(format!(
        "port index {index} out of range ({available} available)"
    ))
}

#[cfg_attr(not(feature = "midi-io"), allow(dead_code))]
pub(crate) fn port_list(api: Api, direction: PortDirection, names: Vec<String>) -> Vec<PortInfo> {
    names
        .into_iter()
        .enumerate()
        .map(|(index, name)| PortInfo {
            index,
            name,
            direction,
            api,
        })
        .collect()
}

/// Input backend chosen at construction.
pub(crate) enum AnyInput {
    #[cfg(feature = "midi-io")]
    Midir(MidirInput),
    Loopback(LoopbackInput),
    Dummy(DummyBackend),
}

impl AnyInput {
    pub(crate) fn new(api: Api, client_name: &str) -> Result<Self> {
        match api {
            #[cfg(feature = "midi-io")]
            Api::Midir => Ok(AnyInput::Midir(MidirInput::new(client_name)?)),
            #[cfg(not(feature = "midi-io"))]
            Api::Midir => Err(not_compiled(api)),
            Api::Loopback => Ok(AnyInput::Loopback(LoopbackInput::new())),
            Api::Dummy => Ok(AnyInput::Dummy(DummyBackend::new(PortDirection::Input))),
            Api::Unspecified => first_with_ports(client_name, Self::new),
        }
    }

    pub(crate) fn get(&self) -> &dyn InputBackend {
        match self {
            #[cfg(feature = "midi-io")]
            AnyInput::Midir(backend) => backend,
            AnyInput::Loopback(backend) => backend,
            AnyInput::Dummy(backend) => backend,
        }
    }

    pub(crate) fn get_mut(&mut self) -> &mut dyn InputBackend {
        match self {
            #[cfg(feature = "midi-io")]
            AnyInput::Midir(backend) => backend,
            AnyInput::Loopback(backend) => backend,
            AnyInput::Dummy(backend) => backend,
        }
    }
}

/// Output backend chosen at construction.
pub(crate) enum AnyOutput {
    #[cfg(feature = "midi-io")]
    Midir(MidirOutput),
    Loopback(LoopbackOutput),
    Dummy(DummyBackend),
}

impl AnyOutput {
    pub(crate) fn new(api: Api, client_name: &str) -> Result<Self> {
        match api {
            #[cfg(feature = "midi-io")]
            Api::Midir => Ok(AnyOutput::Midir(MidirOutput::new(client_name)?)),
            #[cfg(not(feature = "midi-io"))]
            Api::Midir => Err(not_compiled(api)),
            Api::Loopback => Ok(AnyOutput::Loopback(LoopbackOutput::new())),
            Api::Dummy => Ok(AnyOutput::Dummy(DummyBackend::new(PortDirection::Output))),
            Api::Unspecified => first_with_ports(client_name, Self::new),
        }
    }

    pub(crate) fn get(&self) -> &dyn OutputBackend {
        match self {
            #[cfg(feature = "midi-io")]
            AnyOutput::Midir(backend) => backend,
            AnyOutput::Loopback(backend) => backend,
            AnyOutput::Dummy(backend) => backend,
        }
    }

    pub(crate) fn get_mut(&mut self) -> &mut dyn OutputBackend {
        match self {
            #[cfg(feature = "midi-io")]
            AnyOutput::Midir(backend) => backend,
            AnyOutput::Loopback(backend) => backend,
            AnyOutput::Dummy(backend) => backend,
        }
    }
}

#[cfg(not(feature = "midi-io"))]
fn not_compiled(api: Api) -> Error {
    Error::Unsupported(format!("{api} backend not compiled in"))
}

/// Tries every compiled backend in order and keeps the first that has
/// ports. Falls back to the first one that could be created. The dummy
/// backend never has ports and is only used when asked for by name.
fn first_with_ports<B, F>(client_name: &str, create: F) -> Result<B>
where
    B: HasPorts,
    F: Fn(Api, &str) -> Result<B>,
{
    let mut fallback = None;
    for api in Api::compiled().into_iter().filter(|api| *api != Api::Dummy) {
        let backend = match create(api, client_name) {
            Ok(backend) => backend,
            Err(e) => {
                debug!(%api, error = %e, "MIDI backend unavailable");
                continue;
            }
        };
        if backend.has_ports() {
            debug!(%api, "Selected MIDI backend");
            return Ok(backend);
        }
        if fallback.is_none() {
            fallback = Some(backend);
        }
    }
    fallback.ok_or_else(|| Error::Unsupported("no MIDI backend could be initialised".to_string()))
}

trait HasPorts {
    fn has_ports(&self) -> bool;
}

impl HasPorts for AnyInput {
    fn has_ports(&self) -> bool {
        self.get().port_count() > 0
    }
}

impl HasPorts for AnyOutput {
    fn has_ports(&self) -> bool {
        self.get().port_count() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_with_no_ports_is_no_devices() {
        assert_eq!(out_of_range(0, 0), Error::NoDevicesFound);
        insta::assert_snapshot!(
            out_of_range(4, 2).to_string(),
            @"invalid device: port index 4 out of range (2 available)"
        );
    }
}
