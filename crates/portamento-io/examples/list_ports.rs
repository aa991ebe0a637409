//! Lists the input and output ports of every compiled backend.

use portamento_io::{compiled_apis, version, MidiIn, MidiOut};

fn main() {
    tracing_subscriber::fmt::init();

    println!("portamento-io {}", version());

    for api in compiled_apis() {
        println!("\n=== {api} ===");

        match MidiIn::new(api, "list-ports") {
            Ok(midi_in) => {
                let ports = midi_in.ports().unwrap_or_default();
                println!("  Inputs ({}):", ports.len());
                for port in &ports {
                    println!("    [{}] {}", port.index, port.name);
                }
            }
            Err(e) => println!("  Inputs unavailable: {e}"),
        }

        match MidiOut::new(api, "list-ports") {
            Ok(midi_out) => {
                let ports = midi_out.ports().unwrap_or_default();
                println!("  Outputs ({}):", ports.len());
                for port in &ports {
                    println!("    [{}] {}", port.index, port.name);
                }
            }
            Err(e) => println!("  Outputs unavailable: {e}"),
        }
    }
}
