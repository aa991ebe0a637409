//! Integration tests for portamento-io over the in-process loopback bus.
//!
//! Port names are unique per test because the bus is shared by every test
//! in the binary.

use crossbeam_channel::unbounded;
use portamento_io::{Api, Error, ErrorKind, IgnoreFlags, MidiIn, MidiMessage, MidiOut};
use std::thread;
use std::time::Duration;

fn input_on(port: &str) -> (MidiIn, MidiOut) {
    let mut midi_in = MidiIn::builder()
        .api(Api::Loopback)
        .client_name("loopback test in")
        .ignore(IgnoreFlags::none())
        .build()
        .unwrap();
    midi_in.open_virtual_port(port).unwrap();

    let mut midi_out = MidiOut::new(Api::Loopback, "loopback test out").unwrap();
    midi_out.open_port_by_name(port, "sender").unwrap();
    (midi_in, midi_out)
}

fn drain(midi_in: &MidiIn) -> Vec<MidiMessage> {
    let mut messages = Vec::new();
    loop {
        let message = midi_in.get_message().unwrap();
        if message.is_empty() {
            return messages;
        }
        messages.push(message);
    }
}

// ---------------------------------------------------------------------------
// 1. Polling
// ---------------------------------------------------------------------------

#[test]
fn test_round_trip_polling() {
    let (midi_in, mut midi_out) = input_on("it-round-trip");
    assert_eq!(midi_out.connected_port_name().as_deref(), Some("it-round-trip"));

    midi_out.send_message(&[0x90, 60, 100]).unwrap();
    midi_out.send_message(&[0xB0, 7, 127]).unwrap();
    midi_out.send_message(&[0x80, 60, 0]).unwrap();

    let messages = drain(&midi_in);
    let bytes: Vec<&[u8]> = messages.iter().map(MidiMessage::bytes).collect();
    assert_eq!(
        bytes,
        vec![&[0x90u8, 60, 100][..], &[0xB0, 7, 127][..], &[0x80, 60, 0][..]]
    );
    assert_eq!(messages[0].timestamp(), 0.0);
    assert!(messages.iter().all(|m| m.timestamp() >= 0.0));
}

#[test]
fn test_sysex_delivered_whole() {
    let (midi_in, mut midi_out) = input_on("it-sysex");
    let sysex: Vec<u8> = std::iter::once(0xF0)
        .chain((0..200).map(|n| (n % 128) as u8))
        .chain(std::iter::once(0xF7))
        .collect();

    midi_out.send_message(&sysex).unwrap();
    let messages = drain(&midi_in);
    assert_eq!(messages.len(), 1);
    assert!(messages[0].is_sysex());
    assert_eq!(messages[0].bytes(), sysex.as_slice());
}

#[test]
fn test_default_ignore_flags_filter_system_traffic() {
    let mut midi_in = MidiIn::new(Api::Loopback, "ignore test").unwrap();
    midi_in.open_virtual_port("it-ignore").unwrap();
    let mut midi_out = MidiOut::new(Api::Loopback, "ignore test out").unwrap();
    midi_out.open_port_by_name("it-ignore", "sender").unwrap();

    midi_out.send_message(&[0xF8]).unwrap();
    midi_out.send_message(&[0xFE]).unwrap();
    midi_out.send_message(&[0xF0, 0x7E, 0xF7]).unwrap();
    midi_out.send_message(&[0xFA]).unwrap();

    let messages = drain(&midi_in);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].bytes(), &[0xFA]);

    midi_in.ignore_types(false, true, true);
    midi_out.send_message(&[0xF0, 0x7E, 0xF7]).unwrap();
    assert!(drain(&midi_in)[0].is_sysex());
}

#[test]
fn test_queue_overflow_keeps_oldest() {
    let mut midi_in = MidiIn::builder()
        .api(Api::Loopback)
        .queue_size_limit(3)
        .build()
        .unwrap();
    midi_in.open_virtual_port("it-overflow").unwrap();
    let (tx, rx) = unbounded();
    midi_in.set_error_callback(move |error| {
        let _ = tx.send(error.to_string());
    });

    let mut midi_out = MidiOut::new(Api::Loopback, "overflow out").unwrap();
    midi_out.open_port_by_name("it-overflow", "sender").unwrap();
    for note in [b'A', b'B', b'C', b'D'] {
        midi_out.send_message(&[0x90, note, 100]).unwrap();
    }

    let notes: Vec<u8> = drain(&midi_in).iter().map(|m| m.bytes()[1]).collect();
    assert_eq!(notes, vec![b'A', b'B', b'C']);
    assert_eq!(
        rx.try_iter().collect::<Vec<_>>(),
        vec!["warning: message queue limit reached".to_string()]
    );
}

// ---------------------------------------------------------------------------
// 2. Callback delivery
// ---------------------------------------------------------------------------

#[test]
fn test_callback_round_trip() {
    let (midi_in, mut midi_out) = input_on("it-callback");
    let (tx, rx) = unbounded();
    midi_in
        .set_callback(move |message| {
            let _ = tx.send(message.clone());
        })
        .unwrap();

    // Loopback delivery runs the callback on the sending thread.
    midi_out.send_message(&[0x90, 64, 90]).unwrap();
    midi_out.send_message(&[0xF8]).unwrap();

    let first = rx.recv_timeout(Duration::from_secs(1)).unwrap();
    let second = rx.recv_timeout(Duration::from_secs(1)).unwrap();
    assert_eq!(first.bytes(), &[0x90, 64, 90]);
    assert_eq!(second.bytes(), &[0xF8]);

    assert!(matches!(
        midi_in.get_message(),
        Err(Error::Input(inner)) if inner.kind() == ErrorKind::InvalidUse
    ));

    midi_in.cancel_callback().unwrap();
    assert!(midi_in.cancel_callback().is_err());
    assert!(midi_in.get_message().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// 3. Port lifecycle
// ---------------------------------------------------------------------------

#[test]
fn test_virtual_output_feeds_inputs() {
    let mut source = MidiOut::new(Api::Loopback, "source").unwrap();
    source.open_virtual_port("it-source").unwrap();

    let mut midi_in = MidiIn::builder()
        .api(Api::Loopback)
        .ignore(IgnoreFlags::none())
        .build()
        .unwrap();
    assert!(midi_in
        .ports()
        .unwrap()
        .iter()
        .any(|port| port.name == "it-source"));
    midi_in.open_port_by_name("IT-SOURCE", "listener").unwrap();
    assert_eq!(midi_in.connected_port_name().as_deref(), Some("it-source"));

    source.send_message(&[0xC0, 5]).unwrap();
    assert_eq!(midi_in.get_message().unwrap().bytes(), &[0xC0, 5]);

    midi_in.close_port();
    assert!(!midi_in.is_port_open());
    // The source keeps working with nobody listening.
    source.send_message(&[0xC0, 6]).unwrap();
}

#[test]
fn test_close_and_reopen_resets_timestamps() {
    let (mut midi_in, mut midi_out) = input_on("it-reopen");
    midi_out.send_message(&[0x90, 1, 1]).unwrap();
    thread::sleep(Duration::from_millis(5));
    midi_out.send_message(&[0x90, 2, 1]).unwrap();
    let messages = drain(&midi_in);
    assert!(messages[1].timestamp() > 0.0);

    midi_in.close_port();
    assert!(midi_in.get_message().is_err());

    midi_in.open_virtual_port("it-reopen-2").unwrap();
    let mut midi_out = MidiOut::new(Api::Loopback, "reopen out").unwrap();
    midi_out.open_port_by_name("it-reopen-2", "sender").unwrap();
    thread::sleep(Duration::from_millis(5));
    midi_out.send_message(&[0x90, 3, 1]).unwrap();
    assert_eq!(midi_in.get_message().unwrap().timestamp(), 0.0);
}

#[test]
fn test_redundant_open_is_warning() {
    let (mut midi_in, _midi_out) = input_on("it-redundant");
    let (tx, rx) = unbounded();
    midi_in.set_error_callback(move |error| {
        let _ = tx.send(error.clone());
    });

    midi_in.open_virtual_port("it-redundant-other").unwrap();
    assert_eq!(midi_in.connected_port_name().as_deref(), Some("it-redundant"));

    let warning = rx.try_recv().unwrap();
    assert!(warning.is_warning());
}

#[test]
fn test_dropping_input_removes_virtual_port() {
    let midi_in = {
        let mut midi_in = MidiIn::new(Api::Loopback, "dropper").unwrap();
        midi_in.open_virtual_port("it-dropped").unwrap();
        midi_in
    };
    let out = MidiOut::new(Api::Loopback, "observer").unwrap();
    assert!(out.ports().unwrap().iter().any(|p| p.name == "it-dropped"));

    drop(midi_in);
    assert!(!out.ports().unwrap().iter().any(|p| p.name == "it-dropped"));
}
