//! The bridge state machine tying decoder, sequencer, transactor and framer together.

use crate::api::{BridgeConfig, RunBoundary, RunOutcome, StepOutcome, TraceEvent, TraceSink};
use crate::bus::{BusTarget, Transactor};
use crate::decoder::{Decoder, DecoderEvent};
use crate::diag::BridgeDiagnostics;
use crate::framer::{FramerStatus, ResponseFrame};
use crate::phase::BridgePhase;
use crate::sequencer::{PendingTransfer, Sequencer, SequencerStep};
use crate::stream::{StreamSink, StreamSource};
use crate::wire::{Command, CommandKind, Header};
use crate::BridgeFault;

/// Write command whose payload is still arriving.
#[derive(Debug, Clone, PartialEq, Eq)]
struct IncomingWrite {
    header: Header,
    payload: Vec<u8>,
}

const fn command_from_header(header: Header, payload: Vec<u8>) -> Command {
    Command {
        kind: header.kind,
        address: header.address,
        length: header.length,
        payload,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
enum Stage {
    #[default]
    Idle,
    Receiving(IncomingWrite),
    Transferring(PendingTransfer),
    Responding(ResponseFrame),
}

struct DiscardTrace;

impl TraceSink for DiscardTrace {
    fn on_event(&mut self, _event: TraceEvent) {}
}

/// Stream-to-bus command bridge.
///
/// Each [`Bridge::step`] performs one unit of work: it consumes one input
/// byte, issues one bus cycle, or pushes one response byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bridge {
    config: BridgeConfig,
    decoder: Decoder,
    sequencer: Sequencer,
    transactor: Transactor,
    stage: Stage,
    diag: BridgeDiagnostics,
}

impl Default for Bridge {
    fn default() -> Self {
        Self::new(BridgeConfig::default())
    }
}

impl Bridge {
    /// Creates an idle bridge.
    #[must_use]
    pub const fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            decoder: Decoder::new(config.framing),
            sequencer: Sequencer::new(config.bus_width, config.bus_error_policy),
            transactor: Transactor::new(config.bus_timeout_cycles),
            stage: Stage::Idle,
            diag: BridgeDiagnostics::new(),
        }
    }

    /// Configuration this bridge was built with.
    #[must_use]
    pub const fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Diagnostic counters accumulated since creation or the last reset.
    #[must_use]
    pub const fn diagnostics(&self) -> &BridgeDiagnostics {
        &self.diag
    }

    /// Current phase of the state machine.
    #[must_use]
    pub const fn phase(&self) -> BridgePhase {
        match self.stage {
            Stage::Idle if self.decoder.is_assembling_header() => BridgePhase::Decoding,
            Stage::Idle => BridgePhase::Idle,
            Stage::Receiving(_) => BridgePhase::ReceivingPayload,
            Stage::Transferring(_) => BridgePhase::Transferring,
            Stage::Responding(_) => BridgePhase::Responding,
        }
    }

    /// Asserted from a decoded header until the final response byte is taken.
    #[must_use]
    pub const fn busy(&self) -> bool {
        self.phase().is_busy()
    }

    /// Returns `true` when the next step would pull a byte from the input.
    #[must_use]
    pub const fn ready_for_input(&self) -> bool {
        self.phase().accepts_input()
    }

    /// Transfer currently being sequenced, if any.
    #[must_use]
    pub const fn pending_transfer(&self) -> Option<&PendingTransfer> {
        match &self.stage {
            Stage::Transferring(pending) => Some(pending),
            _ => None,
        }
    }

    /// Drops any in-flight command and clears diagnostics.
    pub fn reset(&mut self) {
        self.stage = Stage::Idle;
        self.decoder.reset();
        self.transactor.reset();
        self.diag.reset();
    }

    /// Performs one unit of work.
    pub fn step<S, K, B>(&mut self, source: &mut S, sink: &mut K, bus: &mut B) -> StepOutcome
    where
        S: StreamSource + ?Sized,
        K: StreamSink + ?Sized,
        B: BusTarget + ?Sized,
    {
        self.step_traced(source, sink, bus, &mut DiscardTrace)
    }

    /// Performs one unit of work, reporting events to `trace` when tracing is
    /// enabled in the configuration.
    pub fn step_traced<S, K, B>(
        &mut self,
        source: &mut S,
        sink: &mut K,
        bus: &mut B,
        trace: &mut dyn TraceSink,
    ) -> StepOutcome
    where
        S: StreamSource + ?Sized,
        K: StreamSink + ?Sized,
        B: BusTarget + ?Sized,
    {
        match std::mem::take(&mut self.stage) {
            Stage::Idle => self.accept_input(None, source, trace),
            Stage::Receiving(incoming) => self.accept_input(Some(incoming), source, trace),
            Stage::Transferring(pending) => self.transfer(pending, bus, trace),
            Stage::Responding(frame) => self.respond(frame, sink, trace),
        }
    }

    /// Steps until `boundary` is reached.
    ///
    /// Every boundary also ends on a stall, so a finite source always ends the
    /// run. A target that never answers blocks inside the current step unless
    /// a bus timeout is configured.
    pub fn run<S, K, B>(
        &mut self,
        source: &mut S,
        sink: &mut K,
        bus: &mut B,
        boundary: RunBoundary,
    ) -> RunOutcome
    where
        S: StreamSource + ?Sized,
        K: StreamSink + ?Sized,
        B: BusTarget + ?Sized,
    {
        self.run_traced(source, sink, bus, boundary, &mut DiscardTrace)
    }

    /// Tracing variant of [`Bridge::run`].
    pub fn run_traced<S, K, B>(
        &mut self,
        source: &mut S,
        sink: &mut K,
        bus: &mut B,
        boundary: RunBoundary,
        trace: &mut dyn TraceSink,
    ) -> RunOutcome
    where
        S: StreamSource + ?Sized,
        K: StreamSink + ?Sized,
        B: BusTarget + ?Sized,
    {
        let mut steps = 0u32;
        loop {
            let final_step = self.step_traced(source, sink, bus, trace);
            steps = steps.saturating_add(1);
            if boundary.is_reached(final_step) {
                return RunOutcome { steps, final_step };
            }
        }
    }

    fn accept_input<S: StreamSource + ?Sized>(
        &mut self,
        incoming: Option<IncomingWrite>,
        source: &mut S,
        trace: &mut dyn TraceSink,
    ) -> StepOutcome {
        let mut stage = incoming.map_or(Stage::Idle, Stage::Receiving);
        let Some(beat) = source.next_beat() else {
            self.stage = stage;
            return StepOutcome::InputStalled;
        };

        let mut outcome = StepOutcome::InputConsumed;
        match self.decoder.feed(beat.data) {
            DecoderEvent::NeedMore => {}
            DecoderEvent::Discarded { byte } => {
                self.diag.record_filler();
                self.emit(trace, TraceEvent::FillerDiscarded { byte });
            }
            DecoderEvent::HeaderReady(header) => {
                self.diag.record_command(header.kind);
                self.emit(trace, TraceEvent::HeaderDecoded { header });
                outcome = StepOutcome::HeaderDecoded(header);
                stage = self.stage_for_header(header);
            }
            DecoderEvent::ByteConsumedAsPayload { byte, remaining } => {
                if let Stage::Receiving(write) = &mut stage {
                    write.payload.push(byte);
                }
                stage = match stage {
                    Stage::Receiving(write) if remaining == 0 => Stage::Transferring(
                        self.sequencer
                            .begin(command_from_header(write.header, write.payload)),
                    ),
                    other => other,
                };
            }
        }

        if beat.last {
            if let Err(cause) = self.decoder.frame_boundary() {
                if matches!(stage, Stage::Receiving(_)) {
                    stage = Stage::Idle;
                }
                outcome = self.raise(cause, trace);
            }
        }

        self.stage = stage;
        outcome
    }

    fn stage_for_header(&self, header: Header) -> Stage {
        if header.kind == CommandKind::Write && header.length > 0 {
            Stage::Receiving(IncomingWrite {
                header,
                payload: Vec::with_capacity(usize::from(header.length)),
            })
        } else {
            Stage::Transferring(
                self.sequencer
                    .begin(command_from_header(header, Vec::new())),
            )
        }
    }

    fn transfer<B: BusTarget + ?Sized>(
        &mut self,
        mut pending: PendingTransfer,
        bus: &mut B,
        trace: &mut dyn TraceSink,
    ) -> StepOutcome {
        let step = self.sequencer.step(&mut pending, &mut self.transactor, bus);
        let record = pending.take_last_cycle();
        self.stage = match step {
            SequencerStep::Continue => Stage::Transferring(pending),
            SequencerStep::Done(response) => Stage::Responding(ResponseFrame::new(&response)),
        };

        let Some(record) = record else {
            return StepOutcome::TransferComplete;
        };
        self.diag.record_cycle(record.outcome);
        self.emit(
            trace,
            TraceEvent::BusCycle {
                cycle: record.cycle,
                outcome: record.outcome,
            },
        );
        match record.outcome.fault() {
            Some(cause) => self.raise(cause, trace),
            None => StepOutcome::BusCycleCompleted(record.outcome),
        }
    }

    fn respond<K: StreamSink + ?Sized>(
        &mut self,
        mut frame: ResponseFrame,
        sink: &mut K,
        trace: &mut dyn TraceSink,
    ) -> StepOutcome {
        match frame.push(sink) {
            FramerStatus::Refused => {
                self.stage = Stage::Responding(frame);
                StepOutcome::OutputStalled
            }
            FramerStatus::Pushed => {
                self.stage = Stage::Responding(frame);
                StepOutcome::ResponseProgress
            }
            FramerStatus::Complete => {
                self.diag.record_response();
                self.emit(
                    trace,
                    TraceEvent::ResponseEmitted {
                        kind: frame.kind(),
                        address: frame.address(),
                        length: frame.length(),
                    },
                );
                StepOutcome::ResponseEmitted(frame.kind())
            }
        }
    }

    fn raise(&mut self, cause: BridgeFault, trace: &mut dyn TraceSink) -> StepOutcome {
        self.diag.record_fault(cause);
        self.emit(trace, TraceEvent::FaultRaised { cause });
        StepOutcome::Fault { cause }
    }

    fn emit(&self, trace: &mut dyn TraceSink, event: TraceEvent) {
        if self.config.tracing_enabled {
            trace.on_event(event);
        }
    }
}
