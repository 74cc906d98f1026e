//! Single-cycle bus master with an acknowledge/error handshake.

use super::{BusCycle, BusSignal, BusTarget, Direction};
use crate::BridgeFault;

/// Result of one issued bus cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum BusOutcome {
    /// Target acknowledged the cycle.
    Acked {
        /// Read word; zero for write cycles.
        data: u64,
        /// Clocks spent waiting before the acknowledge.
        wait_states: u32,
    },
    /// Target asserted the error line.
    Errored {
        /// Clocks spent waiting before the error.
        wait_states: u32,
    },
    /// Target stayed silent past the wait-state limit.
    TimedOut {
        /// Clocks spent waiting before giving up.
        wait_states: u32,
    },
}

impl BusOutcome {
    /// Wait states observed for this cycle.
    #[must_use]
    pub const fn wait_states(self) -> u32 {
        match self {
            Self::Acked { wait_states, .. }
            | Self::Errored { wait_states }
            | Self::TimedOut { wait_states } => wait_states,
        }
    }

    /// Fault raised by this outcome, if any.
    #[must_use]
    pub const fn fault(self) -> Option<BridgeFault> {
        match self {
            Self::Acked { .. } => None,
            Self::Errored { .. } => Some(BridgeFault::BusError),
            Self::TimedOut { .. } => Some(BridgeFault::BusTimeout),
        }
    }
}

/// Drives one cycle at a time and blocks until the target answers.
///
/// No retry is attempted; the caller decides what a failed cycle means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Transactor {
    wait_limit: Option<u32>,
    cycles_issued: u64,
}

impl Transactor {
    /// Creates a transactor. `wait_limit` of `None` waits indefinitely.
    #[must_use]
    pub const fn new(wait_limit: Option<u32>) -> Self {
        Self {
            wait_limit,
            cycles_issued: 0,
        }
    }

    /// Total cycles issued since creation or the last reset.
    #[must_use]
    pub const fn cycles_issued(&self) -> u64 {
        self.cycles_issued
    }

    /// Clears the issued-cycle counter.
    #[allow(clippy::missing_const_for_fn)]
    pub fn reset(&mut self) {
        self.cycles_issued = 0;
    }

    /// Asserts `cycle` and samples `bus` once per clock until it acknowledges
    /// or errors.
    ///
    /// With no wait limit configured a target that never answers blocks
    /// forever, matching the bus handshake.
    pub fn issue<B: BusTarget + ?Sized>(&mut self, cycle: &BusCycle, bus: &mut B) -> BusOutcome {
        self.cycles_issued = self.cycles_issued.saturating_add(1);
        let mut wait_states = 0u32;

        loop {
            match bus.clock(cycle) {
                BusSignal::Ack(word) => {
                    let data = match cycle.direction {
                        Direction::Read => word,
                        Direction::Write => 0,
                    };
                    return BusOutcome::Acked { data, wait_states };
                }
                BusSignal::Err => return BusOutcome::Errored { wait_states },
                BusSignal::Wait => {
                    if self.wait_limit.is_some_and(|limit| wait_states >= limit) {
                        bus.release();
                        return BusOutcome::TimedOut { wait_states };
                    }
                    wait_states = wait_states.saturating_add(1);
                }
            }
        }
    }
}
