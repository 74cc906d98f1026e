//! Byte-addressed RAM bus target with configurable latency and fault windows.

use crate::bus::{lane_byte, with_lane, BusCycle, BusSignal, BusTarget, BusWidth, Direction};

/// Default RAM size (64 KiB).
pub const DEFAULT_RAM_BYTES: usize = u16::MAX as usize + 1;

/// Inclusive byte-address range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AddressWindow {
    /// Inclusive start address.
    pub start: u32,
    /// Inclusive end address.
    pub end: u32,
}

impl AddressWindow {
    /// Creates a window covering `start..=end`.
    #[must_use]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Returns `true` when `address` falls inside the window.
    #[must_use]
    pub const fn contains(self, address: u32) -> bool {
        address >= self.start && address <= self.end
    }
}

/// Flat RAM answering one word per cycle.
///
/// Addresses wrap modulo the RAM size. A cycle with any selected lane inside
/// an error window is answered on the error line; one touching a silent
/// window is never answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RamTarget {
    memory: Box<[u8]>,
    width: BusWidth,
    latency: u32,
    clocks: u32,
    error_windows: Vec<AddressWindow>,
    silent_windows: Vec<AddressWindow>,
    cycles_serviced: u64,
}

impl Default for RamTarget {
    fn default() -> Self {
        Self::new(DEFAULT_RAM_BYTES, BusWidth::default())
    }
}

impl RamTarget {
    /// Allocates zeroed RAM of `size` bytes (at least one) for a `width` bus.
    #[must_use]
    pub fn new(size: usize, width: BusWidth) -> Self {
        Self {
            memory: vec![0; size.max(1)].into_boxed_slice(),
            width,
            latency: 1,
            clocks: 0,
            error_windows: Vec::new(),
            silent_windows: Vec::new(),
            cycles_serviced: 0,
        }
    }

    /// Sets the number of clocks per cycle; values below one are treated as one.
    #[must_use]
    pub fn with_latency(mut self, clocks: u32) -> Self {
        self.latency = clocks.max(1);
        self
    }

    /// Adds a window whose cycles end on the error line.
    #[must_use]
    pub fn with_error_window(mut self, window: AddressWindow) -> Self {
        self.error_windows.push(window);
        self
    }

    /// Adds a window whose cycles are never answered.
    #[must_use]
    pub fn with_silent_window(mut self, window: AddressWindow) -> Self {
        self.silent_windows.push(window);
        self
    }

    /// RAM size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.memory.len()
    }

    /// Always `false`; RAM holds at least one byte.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }

    /// Cycles answered with an acknowledge or an error.
    #[must_use]
    pub const fn cycles_serviced(&self) -> u64 {
        self.cycles_serviced
    }

    /// Copies `len` bytes starting at `address`, wrapping at the end of RAM.
    #[must_use]
    pub fn read_mem(&self, address: u32, len: usize) -> Vec<u8> {
        (0..len)
            .map(|offset| self.memory[self.index(address, offset)])
            .collect()
    }

    /// Stores `bytes` starting at `address`, wrapping at the end of RAM.
    pub fn write_mem(&mut self, address: u32, bytes: &[u8]) {
        for (offset, byte) in bytes.iter().enumerate() {
            let index = self.index(address, offset);
            self.memory[index] = *byte;
        }
    }

    fn index(&self, address: u32, offset: usize) -> usize {
        let base = usize::try_from(address).unwrap_or(usize::MAX) % self.memory.len();
        (base + offset % self.memory.len()) % self.memory.len()
    }

    fn touches(&self, windows: &[AddressWindow], cycle: &BusCycle) -> bool {
        (0..self.width.bytes())
            .filter(|lane| cycle.select.contains(*lane))
            .map(|lane| cycle.address.wrapping_add(u32::from(lane)))
            .any(|address| windows.iter().any(|w| w.contains(address)))
    }

    fn service(&mut self, cycle: &BusCycle) -> BusSignal {
        if self.touches(&self.error_windows, cycle) {
            return BusSignal::Err;
        }
        match cycle.direction {
            Direction::Read => {
                let word = (0..self.width.bytes()).fold(0u64, |word, lane| {
                    let byte = self.memory[self.index(cycle.address, usize::from(lane))];
                    with_lane(word, lane, byte)
                });
                BusSignal::Ack(word)
            }
            Direction::Write => {
                for lane in (0..self.width.bytes()).filter(|lane| cycle.select.contains(*lane)) {
                    let index = self.index(cycle.address, usize::from(lane));
                    self.memory[index] = lane_byte(cycle.data, lane);
                }
                BusSignal::Ack(0)
            }
        }
    }
}

impl BusTarget for RamTarget {
    fn clock(&mut self, cycle: &BusCycle) -> BusSignal {
        if self.touches(&self.silent_windows, cycle) {
            return BusSignal::Wait;
        }
        self.clocks += 1;
        if self.clocks < self.latency {
            return BusSignal::Wait;
        }
        self.clocks = 0;
        self.cycles_serviced += 1;
        self.service(cycle)
    }

    fn release(&mut self) {
        self.clocks = 0;
    }
}
