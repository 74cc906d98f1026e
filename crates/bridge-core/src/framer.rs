//! Response framer: pushes one response packet onto the output stream.

use crate::stream::{Beat, StreamSink};
use crate::wire::{Response, ResponseKind};

/// Progress of pushing a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FramerStatus {
    /// Sink accepted a byte; more remain.
    Pushed,
    /// Sink refused the byte; retry later.
    Refused,
    /// Sink accepted the final byte.
    Complete,
}

/// A response packet being emitted byte by byte.
///
/// The frame end marker is set on the final byte, so each response is its
/// own transport frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFrame {
    kind: ResponseKind,
    address: u32,
    length: u16,
    bytes: Vec<u8>,
    position: usize,
}

impl ResponseFrame {
    /// Encodes `response` for emission.
    #[must_use]
    pub fn new(response: &Response) -> Self {
        Self {
            kind: response.kind,
            address: response.address,
            length: response.length,
            bytes: response.encode(),
            position: 0,
        }
    }

    /// Response kind being emitted.
    #[must_use]
    pub const fn kind(&self) -> ResponseKind {
        self.kind
    }

    /// Echoed command address.
    #[must_use]
    pub const fn address(&self) -> u32 {
        self.address
    }

    /// Echoed command length.
    #[must_use]
    pub const fn length(&self) -> u16 {
        self.length
    }

    /// Next byte to offer, or `None` once everything was accepted.
    #[must_use]
    pub fn peek(&self) -> Option<Beat> {
        let data = *self.bytes.get(self.position)?;
        let last = self.position + 1 == self.bytes.len();
        Some(Beat { data, last })
    }

    /// Bytes not yet accepted.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }

    /// Returns `true` once the final byte was accepted.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.position >= self.bytes.len()
    }

    /// Offers the next byte to `sink`.
    pub fn push<K: StreamSink + ?Sized>(&mut self, sink: &mut K) -> FramerStatus {
        let Some(beat) = self.peek() else {
            return FramerStatus::Complete;
        };
        if !sink.offer(beat) {
            return FramerStatus::Refused;
        }
        self.position += 1;
        if beat.last {
            FramerStatus::Complete
        } else {
            FramerStatus::Pushed
        }
    }
}
