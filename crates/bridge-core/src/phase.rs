/// Host-observable phase of the bridge state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum BridgePhase {
    /// Scanning input for an opcode.
    #[default]
    Idle,
    /// Opcode seen, address/length fields still arriving.
    Decoding,
    /// Header decoded, write payload still arriving.
    ReceivingPayload,
    /// Issuing bus cycles.
    Transferring,
    /// Pushing the response onto the output stream.
    Responding,
}

impl BridgePhase {
    /// Busy covers everything from a decoded header to the final response byte.
    #[must_use]
    pub const fn is_busy(self) -> bool {
        matches!(
            self,
            Self::ReceivingPayload | Self::Transferring | Self::Responding
        )
    }

    /// Phases in which the bridge pulls bytes from the input stream.
    #[must_use]
    pub const fn accepts_input(self) -> bool {
        matches!(self, Self::Idle | Self::Decoding | Self::ReceivingPayload)
    }
}
