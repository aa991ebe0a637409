//! MIDI output facade.

use crate::api::Api;
use crate::backend::AnyOutput;
use crate::error::{Error, Result};
use crate::port::{find_by_name, PortInfo};
use portamento_input::ErrorCallback;
use tracing::{debug, warn};

pub const DEFAULT_OUTPUT_CLIENT_NAME: &str = "Portamento Output Client";

/// Port name used when the caller does not supply one.
pub const DEFAULT_OUTPUT_PORT_NAME: &str = "Portamento Output";

/// Sends MIDI to one port of one backend.
pub struct MidiOut {
    backend: AnyOutput,
    client_name: String,
    error_callback: Option<ErrorCallback>,
}

impl MidiOut {
    pub fn new(api: Api, client_name: &str) -> Result<Self> {
        let backend = AnyOutput::new(api, client_name)?;
        debug!(api = %backend.get().api(), client = client_name, "Created MIDI output");
        Ok(Self {
            backend,
            client_name: client_name.to_string(),
            error_callback: None,
        })
    }

    pub fn builder() -> MidiOutBuilder {
        MidiOutBuilder::default()
    }

    pub fn current_api(&self) -> Api {
        self.backend.get().api()
    }

    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    pub fn ports(&self) -> Result<Vec<PortInfo>> {
        self.backend.get().ports()
    }

    pub fn port_count(&self) -> usize {
        self.backend.get().port_count()
    }

    pub fn port_name(&self, index: usize) -> Result<String> {
        self.backend.get().port_name(index)
    }

    /// Opening while a port is already open reports a warning and keeps the
    /// existing connection.
    pub fn open_port(&mut self, index: usize, port_name: &str) -> Result<()> {
        if self.warn_if_open() {
            return Ok(());
        }
        self.backend.get_mut().open_port(index, port_name)?;
        debug!(index, port = ?self.connected_port_name(), "Opened MIDI output port");
        Ok(())
    }

    /// Connects to the first port whose name contains `pattern`, ignoring case.
    pub fn open_port_by_name(&mut self, pattern: &str, port_name: &str) -> Result<()> {
        let ports = self.ports()?;
        let index = find_by_name(&ports, pattern).ok_or_else(|| {
            Error::InvalidDevice(format!("no MIDI output port matching '{pattern}'"))
        })?;
        self.open_port(index, port_name)
    }

    /// Creates a port that other applications (or loopback inputs) can
    /// receive from.
    pub fn open_virtual_port(&mut self, port_name: &str) -> Result<()> {
        if self.warn_if_open() {
            return Ok(());
        }
        self.backend.get_mut().open_virtual_port(port_name)?;
        debug!(port = port_name, "Opened virtual MIDI output port");
        Ok(())
    }

    pub fn close_port(&mut self) {
        if !self.is_port_open() {
            return;
        }
        self.backend.get_mut().close_port();
        debug!("Closed MIDI output port");
    }

    pub fn is_port_open(&self) -> bool {
        self.backend.get().is_port_open()
    }

    pub fn connected_port_name(&self) -> Option<String> {
        self.backend.get().port_name_open()
    }

    /// Sends one complete message, sysex included.
    ///
    /// An empty message is reported as a warning and not sent.
    pub fn send_message(&mut self, bytes: &[u8]) -> Result<()> {
        if !self.is_port_open() {
            return Err(Error::invalid_use("send_message called with no port open"));
        }
        if bytes.is_empty() {
            self.report(&portamento_input::Error::Warning(
                "message argument is empty".to_string(),
            ));
            return Ok(());
        }
        self.backend.get_mut().send_message(bytes)
    }

    pub fn set_error_callback<F>(&mut self, callback: F)
    where
        F: Fn(&portamento_input::Error) + Send + Sync + 'static,
    {
        self.error_callback = Some(ErrorCallback::new(callback));
    }

    pub fn clear_error_callback(&mut self) {
        self.error_callback = None;
    }

    fn report(&self, error: &portamento_input::Error) {
        warn!("{error}");
        if let Some(callback) = &self.error_callback {
            callback.report(error);
        }
    }

    fn warn_if_open(&self) -> bool {
        if !self.is_port_open() {
            return false;
        }
        self.report(&portamento_input::Error::Warning(
            "a port is already open; close it before opening another".to_string(),
        ));
        true
    }
}

impl Drop for MidiOut {
    fn drop(&mut self) {
        self.close_port();
    }
}

impl std::fmt::Debug for MidiOut {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MidiOut")
            .field("api", &self.current_api())
            .field("client_name", &self.client_name)
            .field("port", &self.connected_port_name())
            .finish_non_exhaustive()
    }
}

/// Fluent construction of a [`MidiOut`].
#[derive(Debug, Clone)]
pub struct MidiOutBuilder {
    api: Api,
    client_name: String,
}

impl Default for MidiOutBuilder {
    fn default() -> Self {
        Self {
            api: Api::Unspecified,
            client_name: DEFAULT_OUTPUT_CLIENT_NAME.to_string(),
        }
    }
}

impl MidiOutBuilder {
    pub fn api(mut self, api: Api) -> Self {
        self.api = api;
        self
    }

    pub fn client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = name.into();
        self
    }

    pub fn build(self) -> Result<MidiOut> {
        MidiOut::new(self.api, &self.client_name)
    }
}
