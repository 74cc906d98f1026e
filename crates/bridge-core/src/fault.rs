use thiserror::Error;

/// Fault classes used for diagnostics aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum FaultClass {
    /// The input stream framing cut a command short.
    Framing,
    /// The bus target failed a cycle.
    Bus,
}

/// Stable fault taxonomy raised while servicing commands.
///
/// None of these is fatal: the bridge records the fault, applies the
/// configured policy, and resumes scanning for the next header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum BridgeFault {
    /// Frame ended after an opcode but before the address/length fields.
    #[error("frame ended before the command header was complete")]
    TruncatedHeader = 0x01,
    /// Frame ended before every byte of a write payload arrived.
    #[error("frame ended before the write payload was complete")]
    TruncatedPayload = 0x02,
    /// Target answered a cycle on the error line.
    #[error("bus target signalled an error")]
    BusError = 0x03,
    /// Target stayed silent past the configured wait-state limit.
    #[error("bus target did not answer within the wait-state limit")]
    BusTimeout = 0x04,
}

impl BridgeFault {
    /// Converts a fault to its stable one-byte code.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Converts a stable one-byte code back into a fault.
    #[must_use]
    pub const fn from_u8(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(Self::TruncatedHeader),
            0x02 => Some(Self::TruncatedPayload),
            0x03 => Some(Self::BusError),
            0x04 => Some(Self::BusTimeout),
            _ => None,
        }
    }

    /// Returns the diagnostics class for this fault.
    #[must_use]
    pub const fn class(self) -> FaultClass {
        match self {
            Self::TruncatedHeader | Self::TruncatedPayload => FaultClass::Framing,
            Self::BusError | Self::BusTimeout => FaultClass::Bus,
        }
    }
}
