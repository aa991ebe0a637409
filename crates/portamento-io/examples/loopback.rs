//! Round trip over the in-process loopback bus: polling, sysex and a callback.

use portamento_io::{Api, IgnoreFlags, MidiIn, MidiOut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn main() -> portamento_io::Result<()> {
    tracing_subscriber::fmt::init();

    let mut midi_in = MidiIn::builder()
        .api(Api::Loopback)
        .client_name("loopback-demo-in")
        .ignore(IgnoreFlags::none())
        .build()?;
    midi_in.open_virtual_port("Loopback Demo")?;
    midi_in.set_error_callback(|error| eprintln!("  reported: {error}"));

    let mut midi_out = MidiOut::new(Api::Loopback, "loopback-demo-out")?;
    midi_out.open_port_by_name("loopback demo", "sender")?;

    println!("=== Polling ===");
    midi_out.send_message(&[0x90, 64, 90])?;
    midi_out.send_message(&[0xB0, 7, 100])?;
    midi_out.send_message(&[0x80, 64, 40])?;
    loop {
        let message = midi_in.get_message()?;
        if message.is_empty() {
            break;
        }
        println!("  {:?} (+{:.6}s)", message.bytes(), message.timestamp());
    }

    println!("\n=== Sysex ===");
    let sysex = [0xF0, 0x43, 0x20, 0x7E, 0x4C, 0x4D, 0x20, 0x20, 0xF7];
    midi_out.send_message(&sysex)?;
    let message = midi_in.get_message()?;
    println!("  {} bytes, sysex={}", message.len(), message.is_sysex());

    println!("\n=== Callback ===");
    let received = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&received);
    midi_in.set_callback(move |message| {
        counter.fetch_add(1, Ordering::SeqCst);
        println!("  callback: {:?}", message.bytes());
    })?;
    for note in 60..64 {
        midi_out.send_message(&[0x90, note, 100])?;
    }
    midi_in.cancel_callback()?;
    println!("  {} messages via callback", received.load(Ordering::SeqCst));

    println!("\n=== Empty message ===");
    midi_out.send_message(&[])?;

    Ok(())
}
