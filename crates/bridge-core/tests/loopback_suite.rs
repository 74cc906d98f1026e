//! End-to-end loopback scenarios against the reference RAM target.

#![allow(
    clippy::pedantic,
    clippy::nursery,
    clippy::cast_possible_truncation,
    clippy::too_many_lines
)]

use bridge_core::{
    Bridge, BridgeConfig, CollectingSink, Command, FrameSource, FramingMode, RamTarget, Response,
    RunBoundary, StepOutcome, READ_REQ, WRITE_REQ,
};
use proptest as _;
use rstest::rstest;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

const PATTERN: [u8; 8] = [0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88];

/// A bridge wired to RAM with in-memory streams on either side.
struct Session {
    bridge: Bridge,
    source: FrameSource,
    sink: CollectingSink,
    ram: RamTarget,
}

impl Session {
    fn new(config: BridgeConfig) -> Self {
        Self {
            bridge: Bridge::new(config),
            source: FrameSource::new(),
            sink: CollectingSink::new(),
            ram: RamTarget::new(1 << 16, config.bus_width),
        }
    }

    fn with_framing(framing: FramingMode) -> Self {
        Self::new(BridgeConfig {
            framing,
            ..BridgeConfig::default()
        })
    }

    fn send(&mut self, frame: &[u8]) {
        self.source.push_frame(frame);
    }

    /// Runs until the input is exhausted and returns every response emitted
    /// since the last call.
    fn drain(&mut self) -> Vec<Response> {
        let outcome = self.bridge.run(
            &mut self.source,
            &mut self.sink,
            &mut self.ram,
            RunBoundary::Stall,
        );
        assert_eq!(outcome.final_step, StepOutcome::InputStalled);
        assert!(!self.bridge.busy());

        let responses = Response::parse_all(self.sink.bytes()).expect("well-formed responses");
        self.sink = CollectingSink::new();
        responses
    }
}

fn write_frame(address: u32, payload: &[u8]) -> Vec<u8> {
    Command::write(address, payload.to_vec())
        .expect("payload fits")
        .encode()
}

fn read_frame(address: u32, length: u16) -> Vec<u8> {
    Command::read(address, length).encode()
}

fn padded(lead: usize, frame: &[u8], trail: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; lead];
    bytes.extend_from_slice(frame);
    bytes.resize(bytes.len() + trail, 0);
    bytes
}

#[test]
fn write_then_read_word() {
    let mut session = Session::new(BridgeConfig::default());

    session.send(&write_frame(0, &[0x11, 0x22, 0x33, 0x44]));
    assert_eq!(session.drain(), vec![Response::write_ack(0, 4)]);
    assert_eq!(session.ram.read_mem(0, 4), vec![0x11, 0x22, 0x33, 0x44]);

    session.send(&read_frame(0, 4));
    assert_eq!(
        session.drain(),
        vec![Response::read_data(0, 4, vec![0x11, 0x22, 0x33, 0x44])]
    );
}

#[test]
fn write_ack_is_byte_exact() {
    let mut session = Session::new(BridgeConfig::default());
    session.send(&[WRITE_REQ, 0, 0, 0, 0, 0, 4, 0x11, 0x22, 0x33, 0x44]);
    session.drain();

    session.send(&[READ_REQ, 0, 0, 0, 0, 0, 4]);
    session.bridge.run(
        &mut session.source,
        &mut session.sink,
        &mut session.ram,
        RunBoundary::Stall,
    );
    assert_eq!(
        session.sink.frames(),
        &[vec![0xA3_u8, 0, 0, 0, 0, 0, 4, 0x11, 0x22, 0x33, 0x44]]
    );
}

#[test]
fn sub_word_writes_then_reads_cover_every_offset_and_length() {
    let mut session = Session::new(BridgeConfig::default());

    for length in 1..8u16 {
        for offset in 0..=3u32 {
            let base = 256 * (16 * offset + u32::from(length));
            let payload = &PATTERN[..usize::from(length)];

            session.send(&write_frame(base + offset, payload));
            assert_eq!(
                session.drain(),
                vec![Response::write_ack(base + offset, length)]
            );

            let window = session.ram.read_mem(base, 32);
            let start = offset as usize;
            let end = start + usize::from(length);
            assert_eq!(&window[start..end], payload);
            assert!(window[..start].iter().all(|b| *b == 0));
            assert!(window[end..].iter().all(|b| *b == 0));
        }
    }

    for length in 1..8u16 {
        for offset in 0..=3u32 {
            let address = 256 * (16 * offset + u32::from(length)) + offset;
            session.send(&read_frame(address, length));
            assert_eq!(
                session.drain(),
                vec![Response::read_data(
                    address,
                    length,
                    PATTERN[..usize::from(length)].to_vec()
                )]
            );
        }
    }
}

#[test]
fn leading_padding_is_skipped_while_scanning() {
    let mut session = Session::with_framing(FramingMode::Scan);

    session.send(&write_frame(4, &[0xAA, 0xBB]));
    session.send(&padded(8, &write_frame(6, &[0xCC, 0xDD]), 0));
    session.send(&padded(8, &read_frame(4, 2), 0));
    session.send(&write_frame(8, &[0xEE, 0xFF]));

    assert_eq!(
        session.drain(),
        vec![
            Response::write_ack(4, 2),
            Response::write_ack(6, 2),
            Response::read_data(4, 2, vec![0xAA, 0xBB]),
            Response::write_ack(8, 2),
        ]
    );
    assert_eq!(
        session.ram.read_mem(4, 6),
        vec![0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]
    );
    assert_eq!(session.bridge.diagnostics().filler_bytes, 16);
}

#[test]
fn leading_padding_drops_the_frame_in_one_per_frame_mode() {
    let mut session = Session::with_framing(FramingMode::OnePerFrame);

    session.send(&write_frame(4, &[0xAA, 0xBB]));
    session.send(&padded(8, &write_frame(6, &[0xCC, 0xDD]), 0));
    session.send(&padded(8, &read_frame(4, 2), 0));
    session.send(&write_frame(8, &[0xEE, 0xFF]));

    assert_eq!(
        session.drain(),
        vec![Response::write_ack(4, 2), Response::write_ack(8, 2)]
    );
    assert_eq!(
        session.ram.read_mem(4, 6),
        vec![0xAA, 0xBB, 0x00, 0x00, 0xEE, 0xFF]
    );
}

#[rstest]
#[case(FramingMode::Scan)]
#[case(FramingMode::OnePerFrame)]
fn trailing_padding_is_ignored(#[case] framing: FramingMode) {
    let mut session = Session::with_framing(framing);

    session.send(&write_frame(10, &[0xAA, 0xBB]));
    session.send(&padded(0, &write_frame(12, &[0xCC, 0xDD]), 8));
    session.send(&padded(0, &read_frame(10, 2), 8));
    session.send(&padded(0, &read_frame(10, 2), 1));
    session.send(&write_frame(14, &[0xEE, 0xFF]));

    assert_eq!(
        session.drain(),
        vec![
            Response::write_ack(10, 2),
            Response::write_ack(12, 2),
            Response::read_data(10, 2, vec![0xAA, 0xBB]),
            Response::read_data(10, 2, vec![0xAA, 0xBB]),
            Response::write_ack(14, 2),
        ]
    );
    assert_eq!(
        session.ram.read_mem(10, 6),
        vec![0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]
    );
}

#[test]
fn several_commands_in_one_frame_are_answered_in_order() {
    let mut session = Session::with_framing(FramingMode::Scan);
    let mut frame = write_frame(0x20, &[1, 2, 3]);
    frame.extend([0x00, 0x00]);
    frame.extend(read_frame(0x21, 2));
    frame.extend(write_frame(0x30, &[9]));
    session.send(&frame);

    assert_eq!(
        session.drain(),
        vec![
            Response::write_ack(0x20, 3),
            Response::read_data(0x21, 2, vec![2, 3]),
            Response::write_ack(0x30, 1),
        ]
    );
}

#[test]
fn each_response_is_its_own_frame() {
    let mut session = Session::new(BridgeConfig::default());
    session.send(&write_frame(0, &[7, 7]));
    session.send(&read_frame(0, 2));
    session.bridge.run(
        &mut session.source,
        &mut session.sink,
        &mut session.ram,
        RunBoundary::Stall,
    );

    assert_eq!(
        session.sink.frames(),
        &[
            vec![0xA4_u8, 0, 0, 0, 0, 0, 2],
            vec![0xA3_u8, 0, 0, 0, 0, 0, 2, 7, 7],
        ]
    );
    assert!(session.sink.open_frame().is_empty());
}

#[test]
fn zero_length_commands_answer_without_bus_cycles() {
    let mut session = Session::new(BridgeConfig::default());
    session.send(&write_frame(0x40, &[]));
    session.send(&read_frame(0x40, 0));

    assert_eq!(
        session.drain(),
        vec![
            Response::write_ack(0x40, 0),
            Response::read_data(0x40, 0, Vec::new()),
        ]
    );
    assert_eq!(session.ram.cycles_serviced(), 0);
    assert_eq!(session.bridge.diagnostics().bus_cycles, 0);
    assert_eq!(session.bridge.diagnostics().responses_emitted, 2);
}

#[test]
fn transfer_wraps_at_top_of_address_space() {
    let mut session = Session::new(BridgeConfig::default());
    session.send(&write_frame(0xFFFF_FFFE, &[0xA0, 0xA1, 0xA2, 0xA3]));
    session.send(&read_frame(0xFFFF_FFFE, 4));

    assert_eq!(
        session.drain(),
        vec![
            Response::write_ack(0xFFFF_FFFE, 4),
            Response::read_data(0xFFFF_FFFE, 4, vec![0xA0, 0xA1, 0xA2, 0xA3]),
        ]
    );
    assert_eq!(session.ram.read_mem(0, 2), vec![0xA2, 0xA3]);
}

#[test]
fn response_opcode_bytes_are_filler_on_input() {
    let mut session = Session::new(BridgeConfig::default());
    session.send(&[0xA3, 0xA4, 0xA5]);

    assert!(session.drain().is_empty());
    assert_eq!(session.bridge.diagnostics().filler_bytes, 3);
}

#[cfg(feature = "serde")]
mod serde_support {
    use bridge_core::{
        BridgeConfig, BridgeDiagnostics, BridgeFault, BusErrorPolicy, BusWidth, FramingMode,
    };

    #[test]
    fn host_facing_types_implement_serde() {
        fn assert_serde<T: serde::Serialize + for<'de> serde::Deserialize<'de>>() {}

        assert_serde::<BridgeConfig>();
        assert_serde::<BridgeDiagnostics>();
        assert_serde::<BridgeFault>();
        assert_serde::<BusWidth>();
        assert_serde::<FramingMode>();
        assert_serde::<BusErrorPolicy>();
    }
}
