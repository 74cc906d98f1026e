//! Walks a short command session through a bridge wired to RAM and prints the
//! trace, the decoded responses and a deterministic fingerprint of the run.

use bridge_core::{
    AddressWindow, Bridge, BridgeConfig, CollectingSink, Command, FrameSource, RamTarget,
    Response, RunBoundary, TraceEvent,
};
use proptest as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

fn hash_bytes(hash: &mut u64, bytes: &[u8]) {
    for byte in bytes {
        *hash ^= u64::from(*byte);
        *hash = hash.wrapping_mul(0x1000_0000_01B3);
    }
}

fn main() {
    let config = BridgeConfig {
        tracing_enabled: true,
        bus_timeout_cycles: Some(16),
        ..BridgeConfig::default()
    };
    let mut bridge = Bridge::new(config);
    let mut ram = RamTarget::new(1 << 16, config.bus_width)
        .with_latency(2)
        .with_error_window(AddressWindow::new(0x8000, 0x8003));

    let write = Command::write(0x0001, vec![0x11, 0x22, 0x33, 0x44, 0x55])
        .expect("payload fits in a command");
    let mut padded_read = vec![0x00; 4];
    padded_read.extend(Command::read(0x0002, 3).encode());

    let mut source = FrameSource::new()
        .with_frame(&write.encode())
        .with_frame(&padded_read)
        .with_frame(&Command::read(0x8000, 4).encode());
    let mut sink = CollectingSink::new();
    let mut events: Vec<TraceEvent> = Vec::new();

    let outcome = bridge.run_traced(
        &mut source,
        &mut sink,
        &mut ram,
        RunBoundary::Stall,
        &mut events,
    );

    for event in &events {
        println!("{event:?}");
    }
    match Response::parse_all(sink.bytes()) {
        Ok(responses) => {
            for response in responses {
                println!("{response:?}");
            }
        }
        Err(error) => println!("malformed output: {error}"),
    }
    println!("{:?} after {} steps", outcome.final_step, outcome.steps);
    println!("{:?}", bridge.diagnostics());

    let mut hash = 0xcbf2_9ce4_8422_2325_u64;
    hash_bytes(&mut hash, sink.bytes());
    hash_bytes(&mut hash, &ram.read_mem(0, 16));
    hash_bytes(&mut hash, &outcome.steps.to_le_bytes());
    println!("{hash:016x}");
}
