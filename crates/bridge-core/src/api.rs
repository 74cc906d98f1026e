//! Public host-facing configuration, step outcomes and trace hooks.

use thiserror::Error;

use crate::{BridgeFault, BusCycle, BusOutcome, BusWidth, Header, ResponseKind};

/// How the decoder treats bytes that are not part of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum FramingMode {
    /// Skip filler byte by byte and keep scanning for the next opcode, so a
    /// frame may carry several commands with padding around them.
    #[default]
    Scan,
    /// One command per frame: a non-opcode byte where an opcode is expected,
    /// or anything after a completed command, discards the rest of the frame.
    OnePerFrame,
}

/// What happens to the rest of a command after a failed bus cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum BusErrorPolicy {
    /// Stop issuing cycles and answer with a bus-error response.
    #[default]
    Abort,
    /// Finish every cycle. Reads answer with failed lanes zeroed; a write with
    /// any failed cycle still answers with a bus-error response.
    Continue,
}

/// Top-level immutable configuration for a bridge instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct BridgeConfig {
    /// Data-bus width.
    pub bus_width: BusWidth,
    /// Filler handling on the input stream.
    pub framing: FramingMode,
    /// Reaction to a failed bus cycle.
    pub bus_error_policy: BusErrorPolicy,
    /// Wait states tolerated per cycle before giving up; `None` waits forever.
    pub bus_timeout_cycles: Option<u32>,
    /// Enables trace callback dispatch from [`crate::Bridge::step_traced`].
    pub tracing_enabled: bool,
}

impl BridgeConfig {
    /// Builds a configuration for a bus with `bytes` lanes.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnsupportedBusWidth`] when `bytes` is not 1, 2,
    /// 4 or 8.
    pub fn with_bus_width_bytes(bytes: u8) -> Result<Self, ConfigError> {
        Ok(Self {
            bus_width: BusWidth::from_bytes(bytes)?,
            ..Self::default()
        })
    }
}

/// Invalid configuration values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ConfigError {
    /// Bus width is not a supported lane count.
    #[error("unsupported bus width of {0} bytes (expected 1, 2, 4 or 8)")]
    UnsupportedBusWidth(u8),
}

/// Output status from one unit of bridge work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepOutcome {
    /// No input byte was offered while the bridge was ready for one.
    InputStalled,
    /// The output stream refused the next response byte.
    OutputStalled,
    /// An input byte was consumed as filler, header or payload.
    InputConsumed,
    /// An input byte completed a command header; the bridge is now busy.
    HeaderDecoded(Header),
    /// One bus cycle completed with an acknowledge.
    BusCycleCompleted(BusOutcome),
    /// A zero-length transfer finished without touching the bus.
    TransferComplete,
    /// One response byte was accepted by the output stream.
    ResponseProgress,
    /// The final response byte was accepted; the bridge is idle again.
    ResponseEmitted(ResponseKind),
    /// A fault was raised during this step.
    Fault {
        /// Raised fault.
        cause: BridgeFault,
    },
}

impl StepOutcome {
    /// Returns `true` for outcomes that mean no progress is possible until the
    /// host services a stream.
    #[must_use]
    pub const fn is_stall(self) -> bool {
        matches!(self, Self::InputStalled | Self::OutputStalled)
    }
}

/// Run loop boundary modes for batched stepping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunBoundary {
    /// Run until a stream stalls.
    Stall,
    /// Run until a response has been fully emitted (or a stream stalls).
    ResponseEmitted,
    /// Run until a fault is raised (or a stream stalls).
    Fault,
}

impl RunBoundary {
    /// Returns `true` when `outcome` ends a run with this boundary.
    #[must_use]
    pub const fn is_reached(self, outcome: StepOutcome) -> bool {
        if outcome.is_stall() {
            return true;
        }
        match self {
            Self::Stall => false,
            Self::ResponseEmitted => matches!(outcome, StepOutcome::ResponseEmitted(_)),
            Self::Fault => matches!(outcome, StepOutcome::Fault { .. }),
        }
    }
}

/// Aggregated outcome from stepping until a boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunOutcome {
    /// Number of steps taken, including the final one.
    pub steps: u32,
    /// Outcome of the last step.
    pub final_step: StepOutcome,
}

/// Deterministic trace events emitted while stepping, when enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraceEvent {
    /// An input byte was discarded as filler.
    FillerDiscarded {
        /// Discarded byte.
        byte: u8,
    },
    /// A command header was decoded.
    HeaderDecoded {
        /// Decoded header.
        header: Header,
    },
    /// A bus cycle retired.
    BusCycle {
        /// Cycle as asserted on the bus.
        cycle: BusCycle,
        /// Target's answer.
        outcome: BusOutcome,
    },
    /// The final byte of a response was accepted.
    ResponseEmitted {
        /// Response kind.
        kind: ResponseKind,
        /// Echoed command address.
        address: u32,
        /// Echoed command length.
        length: u16,
    },
    /// A fault was raised.
    FaultRaised {
        /// Raised fault.
        cause: BridgeFault,
    },
}

/// Sink trait for deterministic trace hooks.
pub trait TraceSink {
    /// Records an event in occurrence order.
    fn on_event(&mut self, event: TraceEvent);
}

impl TraceSink for Vec<TraceEvent> {
    fn on_event(&mut self, event: TraceEvent) {
        self.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::{
        BridgeConfig, BusErrorPolicy, ConfigError, FramingMode, RunBoundary, StepOutcome,
    };
    use crate::{BridgeFault, BusWidth, ResponseKind};

    #[test]
    fn default_config_is_32_bit_scanning_abort() {
        let config = BridgeConfig::default();

        assert_eq!(config.bus_width, BusWidth::Bits32);
        assert_eq!(config.framing, FramingMode::Scan);
        assert_eq!(config.bus_error_policy, BusErrorPolicy::Abort);
        assert_eq!(config.bus_timeout_cycles, None);
        assert!(!config.tracing_enabled);
    }

    #[test]
    fn width_constructor_validates_lane_count() {
        let config = BridgeConfig::with_bus_width_bytes(8).expect("supported width");
        assert_eq!(config.bus_width, BusWidth::Bits64);
        assert_eq!(
            BridgeConfig::with_bus_width_bytes(5),
            Err(ConfigError::UnsupportedBusWidth(5))
        );
    }

    #[test]
    fn every_boundary_stops_on_stalls() {
        for boundary in [
            RunBoundary::Stall,
            RunBoundary::ResponseEmitted,
            RunBoundary::Fault,
        ] {
            assert!(boundary.is_reached(StepOutcome::InputStalled));
            assert!(boundary.is_reached(StepOutcome::OutputStalled));
            assert!(!boundary.is_reached(StepOutcome::InputConsumed));
        }
    }

    #[test]
    fn boundaries_match_their_own_outcome() {
        let emitted = StepOutcome::ResponseEmitted(ResponseKind::WriteAck);
        let fault = StepOutcome::Fault {
            cause: BridgeFault::TruncatedHeader,
        };

        assert!(RunBoundary::ResponseEmitted.is_reached(emitted));
        assert!(!RunBoundary::ResponseEmitted.is_reached(fault));
        assert!(RunBoundary::Fault.is_reached(fault));
        assert!(!RunBoundary::Fault.is_reached(emitted));
        assert!(!RunBoundary::Stall.is_reached(emitted));
    }
}
