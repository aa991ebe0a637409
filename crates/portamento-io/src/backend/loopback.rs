//! In-process virtual MIDI bus.
//!
//! A virtual port opened by one facade becomes visible to facades of the
//! opposite direction in the same process:
//! - `MidiOut::open_virtual_port` creates a *source* that inputs can open
//! - `MidiIn::open_virtual_port` creates a *destination* that outputs can open
//!
//! Sending delivers synchronously on the sender's thread, which stands in
//! for a driver thread. Timestamps count from a process-wide epoch.
//!
//! The bus only takes DashMap shard locks long enough to clone the list of
//! receivers; no lock is held while a receiver's dispatch runs.

use super::{out_of_range, InputBackend, MidiApi, OutputBackend};
use crate::api::Api;
use crate::error::{Error, Result};
use crate::port::{PortDirection, PortInfo};
use dashmap::DashMap;
use portamento_input::InputDispatch;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EndpointKind {
    /// Owned by an output; inputs subscribe.
    Source,
    /// Owned by an input; outputs send to it.
    Destination,
}

struct Receiver {
    owner: u64,
    dispatch: Arc<InputDispatch>,
}

struct Endpoint {
    name: String,
    kind: EndpointKind,
    receivers: Vec<Receiver>,
}

struct Bus {
    endpoints: DashMap<u64, Endpoint>,
    next_id: AtomicU64,
    epoch: Instant,
}

impl Bus {
    fn get() -> &'static Bus {
        static BUS: OnceLock<Bus> = OnceLock::new();
        BUS.get_or_init(|| Bus {
            endpoints: DashMap::new(),
            next_id: AtomicU64::new(1),
            epoch: Instant::now(),
        })
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }

    /// Endpoints of one kind ordered by creation, as `(id, name)`.
    fn list(&self, kind: EndpointKind) -> Vec<(u64, String)> {
        let mut entries: Vec<(u64, String)> = self
            .endpoints
            .iter()
            .filter(|entry| entry.kind == kind)
            .map(|entry| (*entry.key(), entry.name.clone()))
            .collect();
        entries.sort_unstable_by_key(|(id, _)| *id);
        entries
    }

    fn lookup(&self, kind: EndpointKind, index: usize) -> Result<(u64, String)> {
        let entries = self.list(kind);
        let available = entries.len();
        entries
            .into_iter()
            .nth(index)
            .ok_or_else(|| out_of_range(index, available))
    }

    fn create(&self, name: &str, kind: EndpointKind, receivers: Vec<Receiver>) -> u64 {
        let id = self.next_id();
        self.endpoints.insert(
            id,
            Endpoint {
                name: name.to_string(),
                kind,
                receivers,
            },
        );
        debug!(id, name, ?kind, "Loopback endpoint created");
        id
    }

    fn remove(&self, id: u64) {
        if let Some((_, endpoint)) = self.endpoints.remove(&id) {
            debug!(id, name = %endpoint.name, "Loopback endpoint removed");
        }
    }

    fn subscribe(&self, id: u64, receiver: Receiver) -> Result<()> {
        let mut endpoint = self
            .endpoints
            .get_mut(&id)
            .ok_or_else(|| Error::InvalidDevice("loopback port no longer exists".to_string()))?;
        endpoint.receivers.push(receiver);
        Ok(())
    }

    fn unsubscribe(&self, id: u64, owner: u64) {
        if let Some(mut endpoint) = self.endpoints.get_mut(&id) {
            endpoint.receivers.retain(|receiver| receiver.owner != owner);
        }
    }

    fn send(&self, id: u64, bytes: &[u8]) -> Result<()> {
        let receivers: Vec<Arc<InputDispatch>> = match self.endpoints.get(&id) {
            Some(endpoint) => endpoint
                .receivers
                .iter()
                .map(|receiver| Arc::clone(&receiver.dispatch))
                .collect(),
            None => {
                return Err(Error::Driver(
                    "loopback port was closed by its owner".to_string(),
                ))
            }
        };
        let timestamp = self.now();
        for dispatch in receivers {
            dispatch.on_raw_event(bytes, timestamp);
        }
        Ok(())
    }
}

struct Connection {
    endpoint: u64,
    name: String,
    /// True when this backend created the endpoint.
    owned: bool,
}

pub struct LoopbackInput {
    id: u64,
    connection: Option<Connection>,
}

impl LoopbackInput {
    pub fn new() -> Self {
        Self {
            id: Bus::get().next_id(),
            connection: None,
        }
    }
}

impl Default for LoopbackInput {
    fn default() -> Self {
        Self::new()
    }
}

impl MidiApi for LoopbackInput {
    fn api(&self) -> Api {
        Api::Loopback
    }

    fn ports(&self) -> Result<Vec<PortInfo>> {
        Ok(list_ports(EndpointKind::Source, PortDirection::Input))
    }

    fn close_port(&mut self) {
        let Some(connection) = self.connection.take() else {
            return;
        };
        let bus = Bus::get();
        if connection.owned {
            bus.remove(connection.endpoint);
        } else {
            bus.unsubscribe(connection.endpoint, self.id);
        }
    }

    fn is_port_open(&self) -> bool {
        self.connection.is_some()
    }

    fn port_name_open(&self) -> Option<String> {
        self.connection.as_ref().map(|c| c.name.clone())
    }
}

impl InputBackend for LoopbackInput {
    fn open_port(
        &mut self,
        index: usize,
        _port_name: &str,
        dispatch: Arc<InputDispatch>,
    ) -> Result<()> {
        if self.connection.is_some() {
            return Err(Error::invalid_use("input port already open"));
        }
        let bus = Bus::get();
        let (endpoint, name) = bus.lookup(EndpointKind::Source, index)?;
        bus.subscribe(
            endpoint,
            Receiver {
                owner: self.id,
                dispatch,
            },
        )?;
        self.connection = Some(Connection {
            endpoint,
            name,
            owned: false,
        });
        Ok(())
    }

    fn open_virtual_port(&mut self, port_name: &str, dispatch: Arc<InputDispatch>) -> Result<()> {
        if self.connection.is_some() {
            return Err(Error::invalid_use("input port already open"));
        }
        let receiver = Receiver {
            owner: self.id,
            dispatch,
        };
        let endpoint = Bus::get().create(port_name, EndpointKind::Destination, vec![receiver]);
        self.connection = Some(Connection {
            endpoint,
            name: port_name.to_string(),
            owned: true,
        });
        Ok(())
    }
}

impl Drop for LoopbackInput {
    fn drop(&mut self) {
        self.close_port();
    }
}

pub struct LoopbackOutput {
    connection: Option<Connection>,
}

impl LoopbackOutput {
    pub fn new() -> Self {
        Self { connection: None }
    }
}

impl Default for LoopbackOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl MidiApi for LoopbackOutput {
    fn api(&self) -> Api {
        Api::Loopback
    }

    fn ports(&self) -> Result<Vec<PortInfo>> {
        Ok(list_ports(EndpointKind::Destination, PortDirection::Output))
    }

    fn close_port(&mut self) {
        if let Some(connection) = self.connection.take() {
            if connection.owned {
                Bus::get().remove(connection.endpoint);
            }
        }
    }

    fn is_port_open(&self) -> bool {
        self.connection.is_some()
    }

    fn port_name_open(&self) -> Option<String> {
        self.connection.as_ref().map(|c| c.name.clone())
    }
}

impl OutputBackend for LoopbackOutput {
    fn open_port(&mut self, index: usize, _port_name: &str) -> Result<()> {
        if self.connection.is_some() {
            return Err(Error::invalid_use("output port already open"));
        }
        let (endpoint, name) = Bus::get().lookup(EndpointKind::Destination, index)?;
        self.connection = Some(Connection {
            endpoint,
            name,
            owned: false,
        });
        Ok(())
    }

    fn open_virtual_port(&mut self, port_name: &str) -> Result<()> {
        if self.connection.is_some() {
            return Err(Error::invalid_use("output port already open"));
        }
        let endpoint = Bus::get().create(port_name, EndpointKind::Source, Vec::new());
        self.connection = Some(Connection {
            endpoint,
            name: port_name.to_string(),
            owned: true,
        });
        Ok(())
    }

    fn send_message(&mut self, bytes: &[u8]) -> Result<()> {
        let connection = self
            .connection
            .as_ref()
            .ok_or_else(|| Error::invalid_use("no output port open"))?;
        Bus::get().send(connection.endpoint, bytes)
    }
}

impl Drop for LoopbackOutput {
    fn drop(&mut self) {
        self.close_port();
    }
}

fn list_ports(kind: EndpointKind, direction: PortDirection) -> Vec<PortInfo> {
    Bus::get()
        .list(kind)
        .into_iter()
        .enumerate()
        .map(|(index, (_, name))| PortInfo {
            index,
            name,
            direction,
            api: Api::Loopback,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dispatch() -> Arc<InputDispatch> {
        let dispatch = InputDispatch::with_capacity(16).unwrap();
        dispatch.ignore_types(false, false, false);
        dispatch.port_opened();
        Arc::new(dispatch)
    }

    fn index_of(ports: &[PortInfo], name: &str) -> usize {
        ports
            .iter()
            .find(|port| port.name == name)
            .map(|port| port.index)
            .unwrap()
    }

    #[test]
    fn test_virtual_output_is_listed_as_input_source() {
        let mut out = LoopbackOutput::new();
        out.open_virtual_port("loopback-unit-source").unwrap();

        let input = LoopbackInput::new();
        let ports = input.ports().unwrap();
        assert!(ports.iter().any(|p| p.name == "loopback-unit-source"));
        assert!(ports.iter().all(|p| p.direction == PortDirection::Input));

        out.close_port();
        let ports = input.ports().unwrap();
        assert!(!ports.iter().any(|p| p.name == "loopback-unit-source"));
    }

    #[test]
    fn test_send_to_virtual_input() {
        let sink = dispatch();
        let mut input = LoopbackInput::new();
        input
            .open_virtual_port("loopback-unit-dest", Arc::clone(&sink))
            .unwrap();

        let mut out = LoopbackOutput::new();
        let index = index_of(&out.ports().unwrap(), "loopback-unit-dest");
        out.open_port(index, "out").unwrap();
        assert_eq!(out.port_name_open().as_deref(), Some("loopback-unit-dest"));
        out.send_message(&[0x90, 60, 100]).unwrap();

        assert_eq!(sink.get_message().unwrap().bytes(), &[0x90, 60, 100]);
    }

    #[test]
    fn test_send_after_owner_closed_fails() {
        let mut input = LoopbackInput::new();
        input
            .open_virtual_port("loopback-unit-vanishing", dispatch())
            .unwrap();

        let mut out = LoopbackOutput::new();
        let index = index_of(&out.ports().unwrap(), "loopback-unit-vanishing");
        out.open_port(index, "out").unwrap();
        drop(input);

        let err = out.send_message(&[0x90, 60, 100]).unwrap_err();
        assert!(matches!(err, Error::Driver(_)));
    }

    #[test]
    fn test_open_out_of_range() {
        let mut input = LoopbackInput::new();
        input
            .open_virtual_port("loopback-unit-range", dispatch())
            .unwrap();

        let mut out = LoopbackOutput::new();
        let err = out.open_port(usize::MAX, "out").unwrap_err();
        assert!(matches!(err, Error::InvalidDevice(_)));
    }
}
