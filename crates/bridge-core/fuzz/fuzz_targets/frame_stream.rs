#![no_main]

use bridge_core::{
    AddressWindow, Bridge, BridgeConfig, BusErrorPolicy, BusWidth, CollectingSink, FrameSource,
    FramingMode, RamTarget, Response, RunBoundary, StepOutcome,
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&selector, rest)) = data.split_first() else {
        return;
    };

    let width = match selector & 0b11 {
        0 => BusWidth::Bits8,
        1 => BusWidth::Bits16,
        2 => BusWidth::Bits32,
        _ => BusWidth::Bits64,
    };
    let config = BridgeConfig {
        bus_width: width,
        framing: if selector & 0b100 == 0 {
            FramingMode::Scan
        } else {
            FramingMode::OnePerFrame
        },
        bus_error_policy: if selector & 0b1000 == 0 {
            BusErrorPolicy::Abort
        } else {
            BusErrorPolicy::Continue
        },
        bus_timeout_cycles: Some(u32::from(selector >> 4)),
        tracing_enabled: false,
    };

    let mut bridge = Bridge::new(config);
    let mut ram = RamTarget::new(4096, width)
        .with_latency(u32::from(selector >> 6) + 1)
        .with_error_window(AddressWindow::new(0x100, 0x1FF))
        .with_silent_window(AddressWindow::new(0x200, 0x2FF));

    // 0xFF splits the input into frames.
    let mut source = FrameSource::new();
    for frame in rest.split(|byte| *byte == 0xFF) {
        source.push_frame(frame);
    }
    let mut sink = CollectingSink::new();

    let outcome = bridge.run(&mut source, &mut sink, &mut ram, RunBoundary::Stall);

    assert_eq!(outcome.final_step, StepOutcome::InputStalled);
    assert!(!bridge.busy());
    assert!(Response::parse_all(sink.bytes()).is_ok());
});
