//! Command decoder for the input byte stream.
//!
//! The decoder is fed one byte at a time and is told separately when the
//! transport closes a frame. It recognizes request headers, hands payload
//! bytes back one by one, and discards everything else as filler.

use crate::api::FramingMode;
use crate::wire::{CommandKind, Header, HEADER_FIELD_BYTES};
use crate::BridgeFault;

/// Decoder scanning state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DecoderState {
    /// Waiting for a request opcode; other bytes are filler.
    #[default]
    ScanningForOpcode,
    /// Collecting the address and length fields after an opcode.
    AssemblingHeader {
        /// Opcode already matched.
        kind: CommandKind,
        /// Field bytes received so far.
        fields: [u8; HEADER_FIELD_BYTES],
        /// Number of valid bytes in `fields`.
        filled: u8,
    },
    /// Collecting write payload.
    ConsumingPayload {
        /// Payload bytes still expected.
        remaining: u16,
    },
    /// Discarding everything up to the end of the current frame.
    DrainingFrame,
}

/// Result of feeding one byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecoderEvent {
    /// Byte accepted; more are needed before anything completes.
    NeedMore,
    /// Byte was filler and has been dropped.
    Discarded {
        /// Dropped byte.
        byte: u8,
    },
    /// Byte completed a header.
    HeaderReady(Header),
    /// Byte belongs to the payload of the current write.
    ByteConsumedAsPayload {
        /// Payload byte.
        byte: u8,
        /// Payload bytes still expected after this one.
        remaining: u16,
    },
}

/// Byte-at-a-time request decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Decoder {
    framing: FramingMode,
    state: DecoderState,
}

impl Decoder {
    /// Creates a decoder in the scanning state.
    #[must_use]
    pub const fn new(framing: FramingMode) -> Self {
        Self {
            framing,
            state: DecoderState::ScanningForOpcode,
        }
    }

    /// Current scanning state.
    #[must_use]
    pub const fn state(&self) -> DecoderState {
        self.state
    }

    /// Returns `true` while a header is partially assembled.
    #[must_use]
    pub const fn is_assembling_header(&self) -> bool {
        matches!(self.state, DecoderState::AssemblingHeader { .. })
    }

    /// Drops any partial command and resumes scanning.
    #[allow(clippy::missing_const_for_fn)]
    pub fn reset(&mut self) {
        self.state = DecoderState::ScanningForOpcode;
    }

    /// Consumes one input byte.
    pub fn feed(&mut self, byte: u8) -> DecoderEvent {
        match self.state {
            DecoderState::ScanningForOpcode => {
                if let Some(kind) = CommandKind::from_request_opcode(byte) {
                    self.state = DecoderState::AssemblingHeader {
                        kind,
                        fields: [0; HEADER_FIELD_BYTES],
                        filled: 0,
                    };
                    DecoderEvent::NeedMore
                } else {
                    if self.framing == FramingMode::OnePerFrame {
                        self.state = DecoderState::DrainingFrame;
                    }
                    DecoderEvent::Discarded { byte }
                }
            }
            DecoderState::AssemblingHeader {
                kind,
                mut fields,
                filled,
            } => {
                fields[usize::from(filled)] = byte;
                let filled = filled + 1;
                if usize::from(filled) < HEADER_FIELD_BYTES {
                    self.state = DecoderState::AssemblingHeader {
                        kind,
                        fields,
                        filled,
                    };
                    return DecoderEvent::NeedMore;
                }

                let header = Header::from_fields(kind, fields);
                if kind == CommandKind::Write && header.length > 0 {
                    self.state = DecoderState::ConsumingPayload {
                        remaining: header.length,
                    };
                } else {
                    self.finish_command();
                }
                DecoderEvent::HeaderReady(header)
            }
            DecoderState::ConsumingPayload { remaining } => {
                let remaining = remaining.saturating_sub(1);
                if remaining == 0 {
                    self.finish_command();
                } else {
                    self.state = DecoderState::ConsumingPayload { remaining };
                }
                DecoderEvent::ByteConsumedAsPayload { byte, remaining }
            }
            DecoderState::DrainingFrame => DecoderEvent::Discarded { byte },
        }
    }

    /// Signals the end of the current transport frame.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeFault::TruncatedHeader`] or
    /// [`BridgeFault::TruncatedPayload`] when the frame closes in the middle
    /// of a command. The partial command is dropped either way.
    pub fn frame_boundary(&mut self) -> Result<(), BridgeFault> {
        let state = self.state;
        self.state = DecoderState::ScanningForOpcode;
        match state {
            DecoderState::AssemblingHeader { .. } => Err(BridgeFault::TruncatedHeader),
            DecoderState::ConsumingPayload { .. } => Err(BridgeFault::TruncatedPayload),
            DecoderState::ScanningForOpcode | DecoderState::DrainingFrame => Ok(()),
        }
    }

    fn finish_command(&mut self) {
        self.state = match self.framing {
            FramingMode::Scan => DecoderState::ScanningForOpcode,
            FramingMode::OnePerFrame => DecoderState::DrainingFrame,
        };
    }
}
