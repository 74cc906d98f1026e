//! Byte-exact packet layouts for requests and responses.
//!
//! Every packet starts with a one-byte opcode followed by a big-endian
//! 32-bit address and a big-endian 16-bit byte count. Write requests and read
//! responses carry `length` payload bytes after the header.

use thiserror::Error;

/// Opcode of a read request.
pub const READ_REQ: u8 = 0xA1;
/// Opcode of a write request.
pub const WRITE_REQ: u8 = 0xA2;
/// Opcode of a read response.
pub const READ_RESP: u8 = 0xA3;
/// Opcode of a write acknowledgement.
pub const WRITE_RESP: u8 = 0xA4;
/// Opcode of a bus-error response.
pub const ERROR_RESP: u8 = 0xA5;

/// Width of the address field.
pub const ADDRESS_BYTES: usize = 4;
/// Width of the length field.
pub const LENGTH_BYTES: usize = 2;
/// Header bytes following the opcode.
pub const HEADER_FIELD_BYTES: usize = ADDRESS_BYTES + LENGTH_BYTES;
/// Full header size including the opcode.
pub const HEADER_BYTES: usize = 1 + HEADER_FIELD_BYTES;

/// Errors raised by the host-side packet codec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    /// Buffer ended before the packet did.
    #[error("packet truncated: needed {needed} bytes, {available} available")]
    Truncated {
        /// Bytes required to finish the packet.
        needed: usize,
        /// Bytes actually present.
        available: usize,
    },
    /// Leading byte is not a response opcode.
    #[error("unknown response opcode {0:#04x}")]
    UnknownOpcode(u8),
    /// Payload does not fit the 16-bit length field.
    #[error("payload of {0} bytes exceeds the 16-bit length field")]
    PayloadTooLong(usize),
}

/// Direction of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum CommandKind {
    /// Read `length` bytes starting at `address`.
    Read,
    /// Write `length` payload bytes starting at `address`.
    Write,
}

impl CommandKind {
    /// Matches a request opcode byte.
    #[must_use]
    pub const fn from_request_opcode(byte: u8) -> Option<Self> {
        match byte {
            READ_REQ => Some(Self::Read),
            WRITE_REQ => Some(Self::Write),
            _ => None,
        }
    }

    /// Returns the request opcode for this kind.
    #[must_use]
    pub const fn request_opcode(self) -> u8 {
        match self {
            Self::Read => READ_REQ,
            Self::Write => WRITE_REQ,
        }
    }
}

/// Decoded fixed-size command header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Header {
    /// Command direction selected by the opcode.
    pub kind: CommandKind,
    /// Byte address of the first byte.
    pub address: u32,
    /// Number of bytes to move.
    pub length: u16,
}

impl Header {
    /// Builds a header from the six bytes following the opcode.
    #[must_use]
    pub const fn from_fields(kind: CommandKind, fields: [u8; HEADER_FIELD_BYTES]) -> Self {
        Self {
            kind,
            address: u32::from_be_bytes([fields[0], fields[1], fields[2], fields[3]]),
            length: u16::from_be_bytes([fields[4], fields[5]]),
        }
    }

    /// Encodes the header with its request opcode.
    #[must_use]
    pub fn to_bytes(self) -> [u8; HEADER_BYTES] {
        encode_header(self.kind.request_opcode(), self.address, self.length)
    }
}

/// A complete request as accepted by the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Command {
    /// Command direction.
    pub kind: CommandKind,
    /// Byte address of the first byte.
    pub address: u32,
    /// Number of bytes to move.
    pub length: u16,
    /// Write data; empty for reads.
    pub payload: Vec<u8>,
}

impl Command {
    /// Creates a read command.
    #[must_use]
    pub const fn read(address: u32, length: u16) -> Self {
        Self {
            kind: CommandKind::Read,
            address,
            length,
            payload: Vec::new(),
        }
    }

    /// Creates a write command whose length is taken from the payload.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::PayloadTooLong`] when the payload exceeds
    /// `u16::MAX` bytes.
    pub fn write(address: u32, payload: Vec<u8>) -> Result<Self, WireError> {
        let length =
            u16::try_from(payload.len()).map_err(|_| WireError::PayloadTooLong(payload.len()))?;
        Ok(Self {
            kind: CommandKind::Write,
            address,
            length,
            payload,
        })
    }

    /// Returns the header describing this command.
    #[must_use]
    pub const fn header(&self) -> Header {
        Header {
            kind: self.kind,
            address: self.address,
            length: self.length,
        }
    }

    /// Encodes the request packet exactly as it travels on the input stream.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_BYTES + self.payload.len());
        bytes.extend_from_slice(&self.header().to_bytes());
        if self.kind == CommandKind::Write {
            bytes.extend_from_slice(&self.payload);
        }
        bytes
    }
}

/// Kind of response packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ResponseKind {
    /// Every cycle of a write was acknowledged.
    WriteAck,
    /// Read data in ascending address order.
    ReadData,
    /// A bus cycle failed and the command was aborted.
    BusError,
}

impl ResponseKind {
    /// Returns the opcode byte for this response kind.
    #[must_use]
    pub const fn opcode(self) -> u8 {
        match self {
            Self::WriteAck => WRITE_RESP,
            Self::ReadData => READ_RESP,
            Self::BusError => ERROR_RESP,
        }
    }

    /// Matches a response opcode byte.
    #[must_use]
    pub const fn from_opcode(byte: u8) -> Option<Self> {
        match byte {
            WRITE_RESP => Some(Self::WriteAck),
            READ_RESP => Some(Self::ReadData),
            ERROR_RESP => Some(Self::BusError),
            _ => None,
        }
    }
}

/// A response packet. Address and length always echo the command.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Response {
    /// Response kind.
    pub kind: ResponseKind,
    /// Address of the originating command.
    pub address: u32,
    /// Length of the originating command.
    pub length: u16,
    /// Read data; empty for every other kind.
    pub payload: Vec<u8>,
}

impl Response {
    /// Write acknowledgement echoing `address` and `length`.
    #[must_use]
    pub const fn write_ack(address: u32, length: u16) -> Self {
        Self {
            kind: ResponseKind::WriteAck,
            address,
            length,
            payload: Vec::new(),
        }
    }

    /// Read data response; `length` is taken from the command, not the payload.
    #[must_use]
    pub const fn read_data(address: u32, length: u16, payload: Vec<u8>) -> Self {
        Self {
            kind: ResponseKind::ReadData,
            address,
            length,
            payload,
        }
    }

    /// Bus-error response echoing `address` and `length`.
    #[must_use]
    pub const fn bus_error(address: u32, length: u16) -> Self {
        Self {
            kind: ResponseKind::BusError,
            address,
            length,
            payload: Vec::new(),
        }
    }

    /// Encodes the response packet exactly as it travels on the output stream.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_BYTES + self.payload.len());
        bytes.extend_from_slice(&encode_header(
            self.kind.opcode(),
            self.address,
            self.length,
        ));
        if self.kind == ResponseKind::ReadData {
            bytes.extend_from_slice(&self.payload);
        }
        bytes
    }

    /// Parses one response from the front of `bytes`.
    ///
    /// Returns the response and the number of bytes it occupied.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::UnknownOpcode`] when the first byte is not a
    /// response opcode and [`WireError::Truncated`] when the buffer ends early.
    pub fn parse(bytes: &[u8]) -> Result<(Self, usize), WireError> {
        let Some(&opcode) = bytes.first() else {
            return Err(WireError::Truncated {
                needed: HEADER_BYTES,
                available: 0,
            });
        };
        let kind = ResponseKind::from_opcode(opcode).ok_or(WireError::UnknownOpcode(opcode))?;

        if bytes.len() < HEADER_BYTES {
            return Err(WireError::Truncated {
                needed: HEADER_BYTES,
                available: bytes.len(),
            });
        }

        let mut fields = [0u8; HEADER_FIELD_BYTES];
        fields.copy_from_slice(&bytes[1..HEADER_BYTES]);
        let header = Header::from_fields(CommandKind::Read, fields);

        let payload_len = if kind == ResponseKind::ReadData {
            usize::from(header.length)
        } else {
            0
        };
        let total = HEADER_BYTES + payload_len;
        if bytes.len() < total {
            return Err(WireError::Truncated {
                needed: total,
                available: bytes.len(),
            });
        }

        let response = Self {
            kind,
            address: header.address,
            length: header.length,
            payload: bytes[HEADER_BYTES..total].to_vec(),
        };
        Ok((response, total))
    }

    /// Parses a back-to-back sequence of responses.
    ///
    /// # Errors
    ///
    /// Propagates the first [`Response::parse`] failure.
    pub fn parse_all(mut bytes: &[u8]) -> Result<Vec<Self>, WireError> {
        let mut responses = Vec::new();
        while !bytes.is_empty() {
            let (response, used) = Self::parse(bytes)?;
            responses.push(response);
            bytes = &bytes[used..];
        }
        Ok(responses)
    }
}

fn encode_header(opcode: u8, address: u32, length: u16) -> [u8; HEADER_BYTES] {
    let mut header = [0u8; HEADER_BYTES];
    header[0] = opcode;
    header[1..=ADDRESS_BYTES].copy_from_slice(&address.to_be_bytes());
    header[1 + ADDRESS_BYTES..].copy_from_slice(&length.to_be_bytes());
    header
}
