//! Errors returned by the DSI host.
use core::fmt;

use crate::poll::Wait;

/// Errors returned by [`DsiHost`](crate::DsiHost) operations.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// The command was malformed. Nothing was written to the controller.
    InvalidArgument(InvalidCommand),
    /// A bounded poll ran out of retries.
    Timeout(Timeout),
    /// The host has not been bound to a register block yet.
    NotInitialized,
}

/// Reasons a command is rejected before any register is touched.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum InvalidCommand {
    /// A short packet carries more parameter bytes than its encoding holds
    /// (two for generic packets, one for DCS packets).
    ShortPayloadTooLong { len: usize, max: usize },
    /// A long write payload does not fit in the payload write FIFO.
    LongPayloadTooLong { len: usize, fifo_depth: usize },
    /// A response was requested for a payload longer than a short read
    /// can carry.
    ReadWithLongPayload { len: usize },
    /// DCS reads with parameter bytes are not supported.
    DcsReadWithPayload { len: usize },
    /// A read command was given no response buffer.
    MissingResponse,
    /// The response length does not fit in a maximum return packet size
    /// request.
    ResponseTooLong { len: usize },
    /// Virtual channel ids are two bits wide.
    VirtualChannel(u8),
}

/// Identifies which bounded wait expired.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Timeout {
    /// A FIFO status wait on `DSI_CMD_PKT_STATUS`.
    Fifo(Wait),
    /// BTA phase 1: the PHY never left the transmit direction, so the
    /// peripheral never took the bus.
    BtaTransmit,
    /// BTA phase 2: the PHY never returned from the receive direction, so the
    /// peripheral never released the bus.
    BtaReceive,
}

/// Errors returned by [`DsiConfig::validate`](crate::DsiConfig::validate).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum InvalidConfig {
    /// Virtual channel ids are two bits wide.
    VirtualChannel(u8),
    ZeroRetries,
    ZeroFifoDepth,
}

// === impl Error ===

impl From<InvalidCommand> for Error {
    fn from(error: InvalidCommand) -> Self {
        Self::InvalidArgument(error)
    }
}

impl From<Timeout> for Error {
    fn from(timeout: Timeout) -> Self {
        Self::Timeout(timeout)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidArgument(error) => write!(f, "invalid DSI command: {error}"),
            Error::Timeout(timeout) => write!(f, "timed out {timeout}"),
            Error::NotInitialized => f.write_str("DSI host is not initialized"),
        }
    }
}

// === impl InvalidCommand ===

impl fmt::Display for InvalidCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidCommand::ShortPayloadTooLong { len, max } => write!(
                f,
                "short packet payload of {len} bytes exceeds the {max} byte limit"
            ),
            InvalidCommand::LongPayloadTooLong { len, fifo_depth } => write!(
                f,
                "long write payload of {len} bytes exceeds the {fifo_depth} byte payload FIFO"
            ),
            InvalidCommand::ReadWithLongPayload { len } => write!(
                f,
                "cannot request a response with a {len} byte payload"
            ),
            InvalidCommand::DcsReadWithPayload { len } => {
                write!(f, "DCS reads with {len} parameter bytes are not supported")
            }
            InvalidCommand::MissingResponse => f.write_str("read command has no response buffer"),
            InvalidCommand::ResponseTooLong { len } => write!(
                f,
                "response of {len} bytes exceeds the maximum return packet size ({})",
                u16::MAX
            ),
            InvalidCommand::VirtualChannel(vc) => {
                write!(f, "virtual channel {vc} is out of range (0..=3)")
            }
        }
    }
}

// === impl Timeout ===

impl fmt::Display for Timeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timeout::Fifo(wait) => write!(f, "waiting for {wait}"),
            Timeout::BtaTransmit => f.write_str("waiting for the PHY to leave TX (no BTA ack)"),
            Timeout::BtaReceive => {
                f.write_str("waiting for the PHY to return to TX (bus not released)")
            }
        }
    }
}

// === impl InvalidConfig ===

impl fmt::Display for InvalidConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidConfig::VirtualChannel(vc) => {
                write!(f, "virtual channel {vc} is out of range (0..=3)")
            }
            InvalidConfig::ZeroRetries => f.write_str("poll retry count must be non-zero"),
            InvalidConfig::ZeroFifoDepth => f.write_str("payload FIFO depth must be non-zero"),
        }
    }
}
