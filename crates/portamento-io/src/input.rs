//! MIDI input facade.

use crate::api::Api;
use crate::backend::AnyInput;
use crate::error::{Error, Result};
use crate::port::{find_by_name, PortInfo};
use portamento_input::{ErrorCallback, IgnoreFlags, InputConfig, InputDispatch, MidiMessage};
use std::sync::Arc;
use tracing::debug;

/// Port name used when the caller does not supply one.
pub const DEFAULT_INPUT_PORT_NAME: &str = "Portamento Input";

/// Receives MIDI from one port of one backend.
///
/// Messages are polled with [`get_message`](Self::get_message) or pushed to a
/// callback installed with [`set_callback`](Self::set_callback). Sysex, timing
/// clock and active sensing are ignored until enabled with
/// [`ignore_types`](Self::ignore_types).
///
/// ```no_run
/// use portamento_io::{Api, MidiIn};
///
/// let mut midi_in = MidiIn::builder().api(Api::Loopback).build()?;
/// midi_in.open_virtual_port("Monitor")?;
/// let message = midi_in.get_message()?;
/// # Ok::<(), portamento_io::Error>(())
/// ```
pub struct MidiIn {
    backend: AnyInput,
    dispatch: Arc<InputDispatch>,
    client_name: String,
}

impl MidiIn {
    pub fn new(api: Api, client_name: &str) -> Result<Self> {
        Self::with_config(
            api,
            InputConfig {
                client_name: client_name.to_string(),
                ..Default::default()
            },
        )
    }

    pub fn builder() -> MidiInBuilder {
        MidiInBuilder::default()
    }

    pub fn with_config(api: Api, config: InputConfig) -> Result<Self> {
        let dispatch = Arc::new(InputDispatch::new(&config)?);
        let backend = AnyInput::new(api, &config.client_name)?;
        debug!(api = %backend.get().api(), client = %config.client_name, "Created MIDI input");
        Ok(Self {
            backend,
            dispatch,
            client_name: config.client_name,
        })
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

    /// Connects to the port at `index`.
    ///
    /// Opening while a port is already open reports a warning and keeps the
    /// existing connection.
    pub fn open_port(&mut self, index: usize, port_name: &str) -> Result<()> {
        if self.warn_if_open() {
            return Ok(());
        }
        self.dispatch.port_opened();
        let dispatch = Arc::clone(&self.dispatch);
        if let Err(e) = self.backend.get_mut().open_port(index, port_name, dispatch) {
            self.dispatch.port_closed();
            return Err(e);
        }
        debug!(index, port = ?self.connected_port_name(), "Opened MIDI input port");
        Ok(())
    }

    /// Connects to the first port whose name contains `pattern`, ignoring case.
    pub fn open_port_by_name(&mut self, pattern: &str, port_name: &str) -> Result<()> {
        let ports = self.ports()?;
        let index = find_by_name(&ports, pattern).ok_or_else(|| {
            Error::InvalidDevice(format!("no MIDI input port matching '{pattern}'"))
        })?;
        self.open_port(index, port_name)
    }

    /// Creates a port that other applications (or loopback outputs) can
    /// send to.
    pub fn open_virtual_port(&mut self, port_name: &str) -> Result<()> {
        if self.warn_if_open() {
            return Ok(());
        }
        self.dispatch.port_opened();
        let dispatch = Arc::clone(&self.dispatch);
        if let Err(e) = self.backend.get_mut().open_virtual_port(port_name, dispatch) {
            self.dispatch.port_closed();
            return Err(e);
        }
        debug!(port = port_name, "Opened virtual MIDI input port");
        Ok(())
    }

    pub fn close_port(&mut self) {
        if !self.backend.get().is_port_open() {
            return;
        }
        self.backend.get_mut().close_port();
        self.dispatch.port_closed();
        debug!("Closed MIDI input port");
    }

    pub fn is_port_open(&self) -> bool {
        self.backend.get().is_port_open()
    }

    pub fn connected_port_name(&self) -> Option<String> {
        self.backend.get().port_name_open()
    }

    /// Delivers every subsequent message to `callback` on the backend's
    /// thread instead of queueing it.
    ///
    /// The callback must not block and must not open or close this input.
    pub fn set_callback<F>(&self, callback: F) -> Result<()>
    where
        F: Fn(&MidiMessage) + Send + Sync + 'static,
    {
        Ok(self.dispatch.set_callback(callback)?)
    }

    pub fn cancel_callback(&self) -> Result<()> {
        Ok(self.dispatch.cancel_callback()?)
    }

    /// `true` discards the category.
    pub fn ignore_types(&self, sysex: bool, timing: bool, active_sensing: bool) {
        self.dispatch.ignore_types(sysex, timing, active_sensing);
    }

    pub fn ignore_flags(&self) -> IgnoreFlags {
        self.dispatch.ignore_flags()
    }

    /// Oldest queued message; the empty record when none is waiting.
    pub fn get_message(&self) -> Result<MidiMessage> {
        Ok(self.dispatch.get_message()?)
    }

    pub fn set_error_callback<F>(&self, callback: F)
    where
        F: Fn(&portamento_input::Error) + Send + Sync + 'static,
    {
        self.dispatch.set_error_callback(Some(ErrorCallback::new(callback)));
    }

    pub fn clear_error_callback(&self) {
        self.dispatch.set_error_callback(None);
    }

    /// The dispatch core this input feeds.
    pub fn dispatch(&self) -> &Arc<InputDispatch> {
        &self.dispatch
    }

    fn warn_if_open(&self) -> bool {
        if !self.is_port_open() {
            return false;
        }
        self.dispatch.report(&portamento_input::Error::Warning(
            "a port is already open; close it before opening another".to_string(),
        ));
        true
    }
}

impl Drop for MidiIn {
    fn drop(&mut self) {
        self.close_port();
    }
}

impl std::fmt::Debug for MidiIn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MidiIn")
            .field("api", &self.current_api())
            .field("client_name", &self.client_name)
            .field("port", &self.connected_port_name())
            .field("dispatch", &self.dispatch)
            .finish()
    }
}

/// Fluent construction of a [`MidiIn`].
#[derive(Debug, Clone, Default)]
pub struct MidiInBuilder {
    api: Api,
    config: InputConfig,
}

impl MidiInBuilder {
    pub fn api(mut self, api: Api) -> Self {
        self.api = api;
        self
    }

    pub fn client_name(mut self, name: impl Into<String>) -> Self {
        self.config.client_name = name.into();
        self
    }

    /// Capacity of the polling queue.
    pub fn queue_size_limit(mut self, limit: usize) -> Self {
        self.config.queue_size_limit = limit;
        self
    }

    pub fn ignore(mut self, flags: IgnoreFlags) -> Self {
        self.config.ignore = flags;
        self
    }

    /// Replaces every setting made so far except the API.
    pub fn config(mut self, config: InputConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<MidiIn> {
        MidiIn::with_config(self.api, self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portamento_input::DEFAULT_CLIENT_NAME;

    #[test]
    fn test_builder_defaults() {
        let builder = MidiIn::builder();
        assert_eq!(builder.api, Api::Unspecified);
        assert_eq!(builder.config.client_name, DEFAULT_CLIENT_NAME);
        assert_eq!(builder.config.queue_size_limit, 100);
    }

    #[test]
    fn test_zero_queue_rejected_at_build() {
        let err = MidiIn::builder()
            .api(Api::Loopback)
            .queue_size_limit(0)
            .build()
            .unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"invalid parameter: queue size limit must be at least 1");
    }

    #[test]
    fn test_get_message_before_open_fails() {
        let midi_in = MidiIn::new(Api::Loopback, "test").unwrap();
        let err = midi_in.get_message().unwrap_err();
        assert!(matches!(
            err,
            Error::Input(portamento_input::Error::InvalidUse(_))
        ));
    }

    #[test]
    fn test_failed_open_rolls_back() {
        let mut midi_in = MidiIn::new(Api::Dummy, "test").unwrap();
        assert!(midi_in.open_port(0, DEFAULT_INPUT_PORT_NAME).is_err());
        assert!(!midi_in.is_port_open());
        assert!(!midi_in.dispatch().is_port_open());
    }

    #[test]
    fn test_open_by_name_without_match() {
        let mut midi_in = MidiIn::new(Api::Dummy, "test").unwrap();
        let err = midi_in
            .open_port_by_name("no-such-port-anywhere", DEFAULT_INPUT_PORT_NAME)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidDevice(_)));
    }
}
