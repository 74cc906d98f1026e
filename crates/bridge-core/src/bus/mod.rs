//! Memory-mapped bus primitives: widths, byte lanes, cycles and the target contract.

/// Single-cycle bus master.
pub mod transactor;

pub use transactor::{BusOutcome, Transactor};

use crate::ConfigError;

/// Data-bus width. Lane `i` of a word carries the byte at `word_address + i`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum BusWidth {
    /// One byte lane.
    Bits8 = 1,
    /// Two byte lanes.
    Bits16 = 2,
    /// Four byte lanes.
    #[default]
    Bits32 = 4,
    /// Eight byte lanes.
    Bits64 = 8,
}

impl BusWidth {
    /// Maps a lane count onto a supported width.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnsupportedBusWidth`] for anything other than
    /// 1, 2, 4 or 8 bytes.
    pub const fn from_bytes(bytes: u8) -> Result<Self, ConfigError> {
        match bytes {
            1 => Ok(Self::Bits8),
            2 => Ok(Self::Bits16),
            4 => Ok(Self::Bits32),
            8 => Ok(Self::Bits64),
            other => Err(ConfigError::UnsupportedBusWidth(other)),
        }
    }

    /// Number of byte lanes.
    #[must_use]
    pub const fn bytes(self) -> u8 {
        self as u8
    }

    /// Rounds `address` down to the containing word.
    #[must_use]
    pub const fn align(self, address: u32) -> u32 {
        address & !(self.bytes() as u32 - 1)
    }

    /// Lane that `address` falls on within its word.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn lane_offset(self, address: u32) -> u8 {
        (address & (self.bytes() as u32 - 1)) as u8
    }

    /// Mask with every lane of this width selected.
    #[must_use]
    pub const fn full_mask(self) -> ByteMask {
        ByteMask::lanes(0, self.bytes())
    }
}

/// Byte-lane select mask, one bit per lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ByteMask(u8);

impl ByteMask {
    /// No lane selected.
    pub const EMPTY: Self = Self(0);

    /// Selects the half-open lane range `[start, end)`. `end` is clamped to 8.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn lanes(start: u8, end: u8) -> Self {
        let end = if end > 8 { 8 } else { end };
        if start >= end {
            return Self::EMPTY;
        }
        let bits = (1u16 << end) - (1u16 << start);
        Self(bits as u8)
    }

    /// Raw select bits.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Returns `true` when `lane` is selected.
    #[must_use]
    pub const fn contains(self, lane: u8) -> bool {
        lane < 8 && self.0 & (1 << lane) != 0
    }

    /// Number of selected lanes.
    #[must_use]
    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }
}

/// Reads lane `lane` out of a bus word.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn lane_byte(word: u64, lane: u8) -> u8 {
    (word >> ((lane & 7) as u32 * 8)) as u8
}

/// Returns `word` with lane `lane` replaced by `byte`.
#[must_use]
pub const fn with_lane(word: u64, lane: u8, byte: u8) -> u64 {
    let shift = (lane & 7) as u32 * 8;
    (word & !(0xFF << shift)) | ((byte as u64) << shift)
}

/// Cycle direction, driven on the write-enable line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Direction {
    /// Write-enable low.
    Read,
    /// Write-enable high.
    Write,
}

/// One word-aligned bus cycle as asserted by the master.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct BusCycle {
    /// Word-aligned byte address.
    pub address: u32,
    /// Write-enable state.
    pub direction: Direction,
    /// Write data; zero for reads.
    pub data: u64,
    /// Active byte lanes.
    pub select: ByteMask,
}

impl BusCycle {
    /// Read cycle selecting `select`.
    #[must_use]
    pub const fn read(address: u32, select: ByteMask) -> Self {
        Self {
            address,
            direction: Direction::Read,
            data: 0,
            select,
        }
    }

    /// Write cycle driving `data` on the lanes in `select`.
    #[must_use]
    pub const fn write(address: u32, data: u64, select: ByteMask) -> Self {
        Self {
            address,
            direction: Direction::Write,
            data,
            select,
        }
    }
}

/// What a target drives back on one clock while a cycle is asserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BusSignal {
    /// Neither acknowledge nor error yet.
    Wait,
    /// Acknowledge, with read data for read cycles.
    Ack(u64),
    /// Error line asserted.
    Err,
}

/// Contract of the device on the far side of the bus.
pub trait BusTarget {
    /// Samples the asserted cycle for one clock and returns the response lines.
    fn clock(&mut self, cycle: &BusCycle) -> BusSignal;

    /// Called when the master drops a cycle without any response.
    fn release(&mut self) {}
}

impl<T: BusTarget + ?Sized> BusTarget for &mut T {
    fn clock(&mut self, cycle: &BusCycle) -> BusSignal {
        (**self).clock(cycle)
    }

    fn release(&mut self) {
        (**self).release();
    }
}
