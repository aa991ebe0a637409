//! Polls an input port and prints everything that arrives.
//!
//! Usage: cargo run -p portamento-io --example monitor [port-name-substring]
//!
//! Without an argument the first port of the preferred backend is used.

use portamento_io::{Api, IgnoreFlags, MidiIn, DEFAULT_INPUT_PORT_NAME};
use std::thread;
use std::time::Duration;

fn main() -> portamento_io::Result<()> {
    tracing_subscriber::fmt::init();

    let mut midi_in = MidiIn::builder()
        .api(Api::Unspecified)
        .client_name("monitor")
        // Keep sysex, drop clock and active sensing.
        .ignore(IgnoreFlags::new(false, true, true))
        .build()?;

    match std::env::args().nth(1) {
        Some(pattern) => midi_in.open_port_by_name(&pattern, DEFAULT_INPUT_PORT_NAME)?,
        None if midi_in.port_count() > 0 => midi_in.open_port(0, DEFAULT_INPUT_PORT_NAME)?,
        None => {
            eprintln!("No input ports on {}; nothing to monitor.", midi_in.current_api());
            return Ok(());
        }
    }
    println!(
        "Monitoring {} on {} (Ctrl-C to quit)",
        midi_in.connected_port_name().unwrap_or_default(),
        midi_in.current_api()
    );

    loop {
        let message = midi_in.get_message()?;
        if message.is_empty() {
            thread::sleep(Duration::from_millis(10));
            continue;
        }
        let bytes: Vec<String> = message.bytes().iter().map(|b| format!("{b:02X}")).collect();
        println!("{:>10.6}s  {}", message.timestamp(), bytes.join(" "));
    }
}
