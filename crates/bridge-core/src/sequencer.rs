//! Transfer sequencer: splits one command into word-aligned bus cycles.
//!
//! A transfer starting at byte address `A` first touches the word at
//! `A & !(W - 1)` beginning at lane `A % W`; every later word starts at lane
//! zero. Each step issues exactly one cycle, in ascending address order; a
//! transfer running past `0xFFFF_FFFF` wraps to word zero.

use crate::api::BusErrorPolicy;
use crate::bus::{lane_byte, with_lane, BusCycle, BusOutcome, BusTarget, BusWidth, ByteMask};
use crate::wire::{Command, CommandKind, Response};
use crate::{BridgeFault, Transactor};

/// A retired cycle and the target's answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CycleRecord {
    /// Cycle as asserted.
    pub cycle: BusCycle,
    /// Target's answer.
    pub outcome: BusOutcome,
}

/// Cursor state for the one command being serviced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransfer {
    command: Command,
    remaining_bytes: u16,
    current_address: u32,
    current_payload_offset: usize,
    read_data: Vec<u8>,
    fault: Option<BridgeFault>,
    aborted: bool,
    last_cycle: Option<CycleRecord>,
}

impl PendingTransfer {
    /// Command being serviced.
    #[must_use]
    pub const fn command(&self) -> &Command {
        &self.command
    }

    /// Bytes not yet covered by a bus cycle.
    #[must_use]
    pub const fn remaining_bytes(&self) -> u16 {
        self.remaining_bytes
    }

    /// Byte address of the next byte to move.
    #[must_use]
    pub const fn current_address(&self) -> u32 {
        self.current_address
    }

    /// Offset into the write payload of the next byte to move.
    #[must_use]
    pub const fn current_payload_offset(&self) -> usize {
        self.current_payload_offset
    }

    /// First fault raised by any cycle of this transfer.
    #[must_use]
    pub const fn fault(&self) -> Option<BridgeFault> {
        self.fault
    }

    /// Takes the record of the cycle issued by the most recent step.
    pub fn take_last_cycle(&mut self) -> Option<CycleRecord> {
        self.last_cycle.take()
    }

    fn response(&mut self) -> Response {
        let Command {
            kind,
            address,
            length,
            ..
        } = self.command;

        if self.aborted {
            return Response::bus_error(address, length);
        }
        match kind {
            CommandKind::Write if self.fault.is_some() => Response::bus_error(address, length),
            CommandKind::Write => Response::write_ack(address, length),
            CommandKind::Read => {
                Response::read_data(address, length, std::mem::take(&mut self.read_data))
            }
        }
    }
}

/// Result of one sequencer step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequencerStep {
    /// More cycles are needed.
    Continue,
    /// The transfer is finished; the response is ready for framing.
    Done(Response),
}

/// Stateless planner that turns commands into cycles for one bus width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sequencer {
    width: BusWidth,
    policy: BusErrorPolicy,
}

impl Sequencer {
    /// Creates a sequencer for `width` applying `policy` on failed cycles.
    #[must_use]
    pub const fn new(width: BusWidth, policy: BusErrorPolicy) -> Self {
        Self { width, policy }
    }

    /// Starts servicing `command`.
    #[must_use]
    pub fn begin(&self, command: Command) -> PendingTransfer {
        let read_capacity = match command.kind {
            CommandKind::Read => usize::from(command.length),
            CommandKind::Write => 0,
        };
        PendingTransfer {
            remaining_bytes: command.length,
            current_address: command.address,
            current_payload_offset: 0,
            read_data: Vec::with_capacity(read_capacity),
            fault: None,
            aborted: false,
            last_cycle: None,
            command,
        }
    }

    /// Plans the next cycle without issuing it. `None` once nothing remains.
    ///
    /// Returns the cycle together with the first lane and the lane count it
    /// covers.
    #[must_use]
    pub fn plan_cycle(&self, pending: &PendingTransfer) -> Option<(BusCycle, u8, u8)> {
        if pending.remaining_bytes == 0 {
            return None;
        }

        let width = self.width.bytes();
        let offset = self.width.lane_offset(pending.current_address);
        let word_address = self.width.align(pending.current_address);
        let span = u8::try_from(pending.remaining_bytes)
            .map_or(width - offset, |remaining| remaining.min(width - offset));

        let cycle = match pending.command.kind {
            CommandKind::Read => BusCycle::read(word_address, self.width.full_mask()),
            CommandKind::Write => {
                let payload = &pending.command.payload;
                let start = pending.current_payload_offset;
                let data = (0..span).fold(0u64, |word, index| {
                    let byte = payload
                        .get(start + usize::from(index))
                        .copied()
                        .unwrap_or_default();
                    with_lane(word, offset + index, byte)
                });
                BusCycle::write(word_address, data, ByteMask::lanes(offset, offset + span))
            }
        };
        Some((cycle, offset, span))
    }

    /// Issues at most one bus cycle for `pending`.
    ///
    /// Zero-length commands finish on the first step without any cycle.
    pub fn step<B: BusTarget + ?Sized>(
        &self,
        pending: &mut PendingTransfer,
        transactor: &mut Transactor,
        bus: &mut B,
    ) -> SequencerStep {
        let Some((cycle, offset, span)) = self.plan_cycle(pending) else {
            return SequencerStep::Done(pending.response());
        };

        let outcome = transactor.issue(&cycle, bus);
        pending.last_cycle = Some(CycleRecord { cycle, outcome });

        if pending.command.kind == CommandKind::Read {
            let data = match outcome {
                BusOutcome::Acked { data, .. } => data,
                BusOutcome::Errored { .. } | BusOutcome::TimedOut { .. } => 0,
            };
            pending
                .read_data
                .extend((offset..offset + span).map(|lane| lane_byte(data, lane)));
        }

        if let Some(fault) = outcome.fault() {
            pending.fault.get_or_insert(fault);
            if self.policy == BusErrorPolicy::Abort {
                pending.aborted = true;
                return SequencerStep::Done(pending.response());
            }
        }

        pending.current_address = pending.current_address.wrapping_add(u32::from(span));
        pending.current_payload_offset += usize::from(span);
        pending.remaining_bytes -= u16::from(span);

        if pending.remaining_bytes == 0 {
            SequencerStep::Done(pending.response())
        } else {
            SequencerStep::Continue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{PendingTransfer, Sequencer, SequencerStep};
    use crate::api::BusErrorPolicy;
    use crate::bus::{BusCycle, BusSignal, BusTarget, BusWidth, Direction};
    use crate::wire::{Command, Response, ResponseKind};
    use crate::{BridgeFault, Transactor};

    /// Records every cycle and answers reads with a fixed word.
    #[derive(Default)]
    struct Recorder {
        cycles: Vec<BusCycle>,
        read_word: u64,
        fail_at: Option<usize>,
    }

    impl BusTarget for Recorder {
        fn clock(&mut self, cycle: &BusCycle) -> BusSignal {
            self.cycles.push(*cycle);
            if self.fail_at == Some(self.cycles.len() - 1) {
                return BusSignal::Err;
            }
            BusSignal::Ack(self.read_word)
        }
    }

    fn drain(
        sequencer: &Sequencer,
        pending: &mut PendingTransfer,
        bus: &mut Recorder,
    ) -> (Response, usize) {
        let mut transactor = Transactor::new(None);
        let mut steps = 0;
        loop {
            steps += 1;
            if let SequencerStep::Done(response) = sequencer.step(pending, &mut transactor, bus) {
                return (response, steps);
            }
        }
    }

    #[test]
    fn aligned_word_write_is_one_cycle() {
        let sequencer = Sequencer::new(BusWidth::Bits32, BusErrorPolicy::Abort);
        let command = Command::write(0, vec![0x11, 0x22, 0x33, 0x44]).expect("payload");
        let mut pending = sequencer.begin(command);
        let mut bus = Recorder::default();

        let (response, steps) = drain(&sequencer, &mut pending, &mut bus);

        assert_eq!(response, Response::write_ack(0, 4));
        assert_eq!(steps, 1);
        assert_eq!(bus.cycles.len(), 1);
        assert_eq!(bus.cycles[0].address, 0);
        assert_eq!(bus.cycles[0].direction, Direction::Write);
        assert_eq!(bus.cycles[0].data, 0x4433_2211);
        assert_eq!(bus.cycles[0].select.bits(), 0b1111);
    }

    #[test]
    fn unaligned_write_spans_two_words() {
        let sequencer = Sequencer::new(BusWidth::Bits32, BusErrorPolicy::Abort);
        let command = Command::write(0x103, vec![0xA0, 0xA1, 0xA2]).expect("payload");
        let mut pending = sequencer.begin(command);
        let mut bus = Recorder::default();

        drain(&sequencer, &mut pending, &mut bus);

        assert_eq!(bus.cycles.len(), 2);
        assert_eq!(bus.cycles[0].address, 0x100);
        assert_eq!(bus.cycles[0].select.bits(), 0b1000);
        assert_eq!(bus.cycles[0].data, 0xA000_0000);
        assert_eq!(bus.cycles[1].address, 0x104);
        assert_eq!(bus.cycles[1].select.bits(), 0b0011);
        assert_eq!(bus.cycles[1].data, 0x0000_A2A1);
    }

    #[test]
    fn read_selects_full_word_and_keeps_addressed_lanes() {
        let sequencer = Sequencer::new(BusWidth::Bits32, BusErrorPolicy::Abort);
        let mut pending = sequencer.begin(Command::read(0x201, 2));
        let mut bus = Recorder {
            read_word: 0x4433_2211,
            ..Recorder::default()
        };

        let (response, _) = drain(&sequencer, &mut pending, &mut bus);

        assert_eq!(bus.cycles.len(), 1);
        assert_eq!(bus.cycles[0].select.bits(), 0b1111);
        assert_eq!(response, Response::read_data(0x201, 2, vec![0x22, 0x33]));
    }

    #[test]
    fn cursor_advances_by_bytes_covered() {
        let sequencer = Sequencer::new(BusWidth::Bits32, BusErrorPolicy::Abort);
        let mut pending = sequencer.begin(Command::read(2, 7));
        let mut transactor = Transactor::new(None);
        let mut bus = Recorder::default();

        assert_eq!(
            sequencer.step(&mut pending, &mut transactor, &mut bus),
            SequencerStep::Continue
        );
        assert_eq!(pending.current_address(), 4);
        assert_eq!(pending.remaining_bytes(), 5);
        assert_eq!(pending.current_payload_offset(), 2);

        assert_eq!(
            sequencer.step(&mut pending, &mut transactor, &mut bus),
            SequencerStep::Continue
        );
        assert_eq!(pending.current_address(), 8);
        assert_eq!(pending.remaining_bytes(), 1);
        assert!(pending.take_last_cycle().is_some());
        assert!(pending.take_last_cycle().is_none());
    }

    #[test]
    fn zero_length_finishes_without_cycles() {
        let sequencer = Sequencer::new(BusWidth::Bits32, BusErrorPolicy::Abort);
        let mut bus = Recorder::default();

        let mut read = sequencer.begin(Command::read(0x40, 0));
        let (response, _) = drain(&sequencer, &mut read, &mut bus);
        assert_eq!(response, Response::read_data(0x40, 0, Vec::new()));

        let mut write = sequencer.begin(Command::write(0x40, Vec::new()).expect("empty payload"));
        let (response, _) = drain(&sequencer, &mut write, &mut bus);
        assert_eq!(response, Response::write_ack(0x40, 0));

        assert!(bus.cycles.is_empty());
    }

    #[test]
    fn abort_policy_stops_at_first_error() {
        let sequencer = Sequencer::new(BusWidth::Bits32, BusErrorPolicy::Abort);
        let command = Command::write(0, vec![0u8; 12]).expect("payload");
        let mut pending = sequencer.begin(command);
        let mut bus = Recorder {
            fail_at: Some(1),
            ..Recorder::default()
        };

        let (response, _) = drain(&sequencer, &mut pending, &mut bus);

        assert_eq!(response.kind, ResponseKind::BusError);
        assert_eq!((response.address, response.length), (0, 12));
        assert_eq!(bus.cycles.len(), 2);
    }

    #[test]
    fn continue_policy_zero_fills_failed_reads() {
        let sequencer = Sequencer::new(BusWidth::Bits32, BusErrorPolicy::Continue);
        let mut pending = sequencer.begin(Command::read(0, 8));
        let mut bus = Recorder {
            read_word: 0x0403_0201,
            fail_at: Some(0),
            ..Recorder::default()
        };

        let (response, _) = drain(&sequencer, &mut pending, &mut bus);

        assert_eq!(bus.cycles.len(), 2);
        assert_eq!(
            response,
            Response::read_data(0, 8, vec![0, 0, 0, 0, 1, 2, 3, 4])
        );
        assert_eq!(pending.fault(), Some(BridgeFault::BusError));
    }

    #[test]
    fn continue_policy_write_with_failed_cycle_is_not_acknowledged() {
        let sequencer = Sequencer::new(BusWidth::Bits32, BusErrorPolicy::Continue);
        let command = Command::write(0, vec![0x5A; 12]).expect("payload");
        let mut pending = sequencer.begin(command);
        let mut bus = Recorder {
            fail_at: Some(1),
            ..Recorder::default()
        };

        let (response, steps) = drain(&sequencer, &mut pending, &mut bus);

        assert_eq!(steps, 3);
        assert_eq!(bus.cycles.len(), 3);
        assert_eq!(response, Response::bus_error(0, 12));
        assert_eq!(pending.fault(), Some(BridgeFault::BusError));
    }

    #[test]
    fn clean_write_reports_no_fault() {
        let sequencer = Sequencer::new(BusWidth::Bits32, BusErrorPolicy::Continue);
        let mut pending = sequencer.begin(Command::write(4, vec![1, 2]).expect("payload"));
        let mut bus = Recorder::default();

        let (response, _) = drain(&sequencer, &mut pending, &mut bus);

        assert_eq!(response, Response::write_ack(4, 2));
        assert_eq!(pending.fault(), None);
    }

    #[test]
    fn transfer_past_top_of_address_space_wraps_to_word_zero() {
        let sequencer = Sequencer::new(BusWidth::Bits32, BusErrorPolicy::Abort);
        let command = Command::write(0xFFFF_FFFE, vec![1, 2, 3, 4]).expect("payload");
        let mut pending = sequencer.begin(command);
        let mut bus = Recorder::default();

        let (response, _) = drain(&sequencer, &mut pending, &mut bus);

        assert_eq!(response, Response::write_ack(0xFFFF_FFFE, 4));
        assert_eq!(bus.cycles.len(), 2);
        assert_eq!(bus.cycles[0].address, 0xFFFF_FFFC);
        assert_eq!(bus.cycles[0].select.bits(), 0b1100);
        assert_eq!(bus.cycles[1].address, 0);
        assert_eq!(bus.cycles[1].select.bits(), 0b0011);
    }

    #[test]
    fn byte_wide_bus_issues_one_cycle_per_byte() {
        let sequencer = Sequencer::new(BusWidth::Bits8, BusErrorPolicy::Abort);
        let command = Command::write(7, vec![1, 2, 3]).expect("payload");
        let mut pending = sequencer.begin(command);
        let mut bus = Recorder::default();

        drain(&sequencer, &mut pending, &mut bus);

        let addresses: Vec<u32> = bus.cycles.iter().map(|c| c.address).collect();
        assert_eq!(addresses, vec![7, 8, 9]);
        assert!(bus.cycles.iter().all(|c| c.select.bits() == 1));
    }
}
