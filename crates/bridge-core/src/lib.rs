//! Command bridge from a framed byte stream to a memory-mapped bus.

/// Fault taxonomy raised while servicing commands.
pub mod fault;
pub use fault::{BridgeFault, FaultClass};

/// Wire format of request and response packets.
pub mod wire;
pub use wire::{
    Command, CommandKind, Header, Response, ResponseKind, WireError, ADDRESS_BYTES, ERROR_RESP,
    HEADER_BYTES, HEADER_FIELD_BYTES, LENGTH_BYTES, READ_REQ, READ_RESP, WRITE_REQ, WRITE_RESP,
};

/// Bus widths, byte lanes, cycles and the target contract.
pub mod bus;
pub use bus::{
    lane_byte, with_lane, BusCycle, BusOutcome, BusSignal, BusTarget, BusWidth, ByteMask,
    Direction, Transactor,
};

/// Public host-facing configuration, outcomes and trace hooks.
pub mod api;
pub use api::{
    BridgeConfig, BusErrorPolicy, ConfigError, FramingMode, RunBoundary, RunOutcome, StepOutcome,
    TraceEvent, TraceSink,
};

/// Byte-stream beats and endpoints.
pub mod stream;
pub use stream::{Beat, CollectingSink, FrameSource, StreamSink, StreamSource};

/// Byte-at-a-time request decoder.
pub mod decoder;
pub use decoder::{Decoder, DecoderEvent, DecoderState};

/// Splits commands into word-aligned bus cycles.
pub mod sequencer;
pub use sequencer::{CycleRecord, PendingTransfer, Sequencer, SequencerStep};

/// Byte-at-a-time response emission.
pub mod framer;
pub use framer::{FramerStatus, ResponseFrame};

/// Host-observable bridge phase.
pub mod phase;
pub use phase::BridgePhase;

/// Saturating diagnostic counters.
pub mod diag;
pub use diag::BridgeDiagnostics;

/// Reference RAM bus target.
pub mod target;
pub use target::{AddressWindow, RamTarget, DEFAULT_RAM_BYTES};

/// The bridge state machine.
pub mod bridge;
pub use bridge::Bridge;

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
