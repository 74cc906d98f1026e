//! Saturating diagnostics counters for a bridge instance.

use crate::{BridgeFault, BusOutcome, CommandKind, FaultClass};

/// Bridge-owned diagnostic counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct BridgeDiagnostics {
    /// The last fault raised, if any.
    pub last_fault: Option<BridgeFault>,
    /// Read headers decoded.
    pub read_commands: u32,
    /// Write headers decoded.
    pub write_commands: u32,
    /// Responses fully emitted.
    pub responses_emitted: u32,
    /// Bus cycles issued.
    pub bus_cycles: u32,
    /// Wait states spent across all cycles.
    pub wait_states: u32,
    /// Input bytes discarded as filler.
    pub filler_bytes: u32,
    /// Framing-class faults.
    pub fault_count_framing: u32,
    /// Bus-class faults.
    pub fault_count_bus: u32,
}

impl BridgeDiagnostics {
    /// Creates zeroed counters.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last_fault: None,
            read_commands: 0,
            write_commands: 0,
            responses_emitted: 0,
            bus_cycles: 0,
            wait_states: 0,
            filler_bytes: 0,
            fault_count_framing: 0,
            fault_count_bus: 0,
        }
    }

    /// Records a fault and bumps the counter for its class.
    #[allow(clippy::missing_const_for_fn)]
    pub fn record_fault(&mut self, fault: BridgeFault) {
        self.last_fault = Some(fault);
        match fault.class() {
            FaultClass::Framing => {
                self.fault_count_framing = self.fault_count_framing.saturating_add(1);
            }
            FaultClass::Bus => {
                self.fault_count_bus = self.fault_count_bus.saturating_add(1);
            }
        }
    }

    /// Records a decoded header.
    #[allow(clippy::missing_const_for_fn)]
    pub fn record_command(&mut self, kind: CommandKind) {
        match kind {
            CommandKind::Read => self.read_commands = self.read_commands.saturating_add(1),
            CommandKind::Write => self.write_commands = self.write_commands.saturating_add(1),
        }
    }

    /// Records one retired bus cycle.
    #[allow(clippy::missing_const_for_fn)]
    pub fn record_cycle(&mut self, outcome: BusOutcome) {
        self.bus_cycles = self.bus_cycles.saturating_add(1);
        self.wait_states = self.wait_states.saturating_add(outcome.wait_states());
    }

    /// Records one discarded filler byte.
    #[allow(clippy::missing_const_for_fn)]
    pub fn record_filler(&mut self) {
        self.filler_bytes = self.filler_bytes.saturating_add(1);
    }

    /// Records one fully emitted response.
    #[allow(clippy::missing_const_for_fn)]
    pub fn record_response(&mut self) {
        self.responses_emitted = self.responses_emitted.saturating_add(1);
    }

    /// Resets all counters to zero.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
