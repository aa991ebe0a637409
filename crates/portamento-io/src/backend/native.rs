//! System MIDI through midir (ALSA, CoreMIDI, WinMM).

use super::{out_of_range, port_list, InputBackend, MidiApi, OutputBackend};
use crate::api::Api;
use crate::error::{Error, Result};
use crate::port::{PortDirection, PortInfo};
use midir::{Ignore, MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use portamento_input::InputDispatch;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// midir consumes the client on connect and hands it back on close, so a
/// backend holds exactly one of the two.
enum Link<C, N> {
    Idle(C),
    Connected { connection: N, name: String },
    /// Only while a connect call is in flight.
    Transit,
}

type Connect<C, N> = std::result::Result<N, midir::ConnectError<C>>;

pub struct MidirInput {
    client_name: String,
    link: Link<MidiInput, MidiInputConnection<()>>,
}

impl MidirInput {
    pub fn new(client_name: &str) -> Result<Self> {
        let mut input = MidiInput::new(client_name)?;
        // Filtering happens once, in the dispatch core.
        input.ignore(Ignore::None);
        Ok(Self {
            client_name: client_name.to_string(),
            link: Link::Idle(input),
        })
    }

    fn port_names(&self) -> Result<Vec<String>> {
        match &self.link {
            Link::Idle(input) => Ok(input_names(input)),
            // The connected client is owned by the connection; enumerate
            // through a short-lived one.
            _ => Ok(input_names(&MidiInput::new(&self.client_name)?)),
        }
    }

    fn take_client(&mut self) -> Result<MidiInput> {
        match std::mem::replace(&mut self.link, Link::Transit) {
            Link::Idle(input) => Ok(input),
            other => {
                self.link = other;
                Err(Error::invalid_use("input port already open"))
            }
        }
    }

    fn connected(
        &mut self,
        result: Connect<MidiInput, MidiInputConnection<()>>,
        name: String,
    ) -> Result<()> {
        match result {
            Ok(connection) => {
                debug!(port = %name, "Connected MIDI input");
                self.link = Link::Connected { connection, name };
                Ok(())
            }
            Err(e) => {
                let error = Error::Driver(e.kind().to_string());
                self.link = Link::Idle(e.into_inner());
                Err(error)
            }
        }
    }
}

fn input_names(input: &MidiInput) -> Vec<String> {
    input
        .ports()
        .iter()
        .enumerate()
        .map(|(index, port)| {
            input
                .port_name(port)
                .unwrap_or_else(|_| format!("Input {index}"))
        })
        .collect()
}

fn output_names(output: &MidiOutput) -> Vec<String> {
    output
        .ports()
        .iter()
        .enumerate()
        .map(|(index, port)| {
            output
                .port_name(port)
                .unwrap_or_else(|_| format!("Output {index}"))
        })
        .collect()
}

/// Driver-thread entry: midir timestamps are microseconds from an
/// unspecified but monotonic origin.
fn forward(
    dispatch: Arc<InputDispatch>,
) -> impl FnMut(u64, &[u8], &mut ()) + Send + 'static {
    move |stamp, bytes, _| dispatch.on_raw_event(bytes, Duration::from_micros(stamp))
}

impl MidiApi for MidirInput {
    fn api(&self) -> Api {
        Api::Midir
    }

    fn ports(&self) -> Result<Vec<PortInfo>> {
        Ok(port_list(Api::Midir, PortDirection::Input, self.port_names()?))
    }

    fn close_port(&mut self) {
        if !self.is_port_open() {
            return;
        }
        if let Link::Connected { connection, name } =
            std::mem::replace(&mut self.link, Link::Transit)
        {
            let (input, ()) = connection.close();
            self.link = Link::Idle(input);
            debug!(port = %name, "Closed MIDI input");
        }
    }

    fn is_port_open(&self) -> bool {
        matches!(self.link, Link::Connected { .. })
    }

    fn port_name_open(&self) -> Option<String> {
        match &self.link {
            Link::Connected { name, .. } => Some(name.clone()),
            _ => None,
        }
    }
}

impl InputBackend for MidirInput {
    fn open_port(
        &mut self,
        index: usize,
        port_name: &str,
        dispatch: Arc<InputDispatch>,
    ) -> Result<()> {
        let input = self.take_client()?;
        let ports = input.ports();
        let Some(port) = ports.get(index) else {
            self.link = Link::Idle(input);
            return Err(out_of_range(index, ports.len()));
        };
        let name = input
            .port_name(port)
            .unwrap_or_else(|_| format!("Input {index}"));
        let result = input.connect(port, port_name, forward(dispatch), ());
        self.connected(result, name)
    }

    #[cfg(unix)]
    fn open_virtual_port(&mut self, port_name: &str, dispatch: Arc<InputDispatch>) -> Result<()> {
        use midir::os::unix::VirtualInput;

        let input = self.take_client()?;
        let result = input.create_virtual(port_name, forward(dispatch), ());
        self.connected(result, port_name.to_string())
    }

    #[cfg(not(unix))]
    fn open_virtual_port(
        &mut self,
        _port_name: &str,
        _dispatch: Arc<InputDispatch>,
    ) -> Result<()> {
        Err(Error::Unsupported(
            "virtual ports are not available on this platform".to_string(),
        ))
    }
}

pub struct MidirOutput {
    client_name: String,
    link: Link<MidiOutput, MidiOutputConnection>,
}

impl MidirOutput {
    pub fn new(client_name: &str) -> Result<Self> {
        Ok(Self {
            client_name: client_name.to_string(),
            link: Link::Idle(MidiOutput::new(client_name)?),
        })
    }

    fn take_client(&mut self) -> Result<MidiOutput> {
        match std::mem::replace(&mut self.link, Link::Transit) {
            Link::Idle(output) => Ok(output),
            other => {
                self.link = other;
                Err(Error::invalid_use("output port already open"))
            }
        }
    }

    fn connected(
        &mut self,
        result: Connect<MidiOutput, MidiOutputConnection>,
        name: String,
    ) -> Result<()> {
        match result {
            Ok(connection) => {
                debug!(port = %name, "Connected MIDI output");
                self.link = Link::Connected { connection, name };
                Ok(())
            }
            Err(e) => {
                let error = Error::Driver(e.kind().to_string());
                self.link = Link::Idle(e.into_inner());
                Err(error)
            }
        }
    }
}

impl MidiApi for MidirOutput {
    fn api(&self) -> Api {
        Api::Midir
    }

    fn ports(&self) -> Result<Vec<PortInfo>> {
        let names = match &self.link {
            Link::Idle(output) => output_names(output),
            _ => output_names(&MidiOutput::new(&self.client_name)?),
        };
        Ok(port_list(Api::Midir, PortDirection::Output, names))
    }

    fn close_port(&mut self) {
        if !self.is_port_open() {
            return;
        }
        if let Link::Connected { connection, name } =
            std::mem::replace(&mut self.link, Link::Transit)
        {
            self.link = Link::Idle(connection.close());
            debug!(port = %name, "Closed MIDI output");
        }
    }

    fn is_port_open(&self) -> bool {
        matches!(self.link, Link::Connected { .. })
    }

    fn port_name_open(&self) -> Option<String> {
        match &self.link {
            Link::Connected { name, .. } => Some(name.clone()),
            _ => None,
        }
    }
}

impl OutputBackend for MidirOutput {
    fn open_port(&mut self, index: usize, port_name: &str) -> Result<()> {
        let output = self.take_client()?;
        let ports = output.ports();
        let Some(port) = ports.get(index) else {
            self.link = Link::Idle(output);
            return Err(out_of_range(index, ports.len()));
        };
        let name = output
            .port_name(port)
            .unwrap_or_else(|_| format!("Output {index}"));
        let result = output.connect(port, port_name);
        self.connected(result, name)
    }

    #[cfg(unix)]
    fn open_virtual_port(&mut self, port_name: &str) -> Result<()> {
        use midir::os::unix::VirtualOutput;

        let output = self.take_client()?;
        let result = output.create_virtual(port_name);
        self.connected(result, port_name.to_string())
    }

    #[cfg(not(unix))]
    fn open_virtual_port(&mut self, _port_name: &str) -> Result<()> {
        Err(Error::Unsupported(
            "virtual ports are not available on this platform".to_string(),
        ))
    }

    fn send_message(&mut self, bytes: &[u8]) -> Result<()> {
        match &mut self.link {
            Link::Connected { connection, .. } => Ok(connection.send(bytes)?),
            _ => Err(Error::invalid_use("no output port open")),
        }
    }
}
