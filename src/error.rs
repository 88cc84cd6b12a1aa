//! Error types for KNX TP1 / TPUART operations.
//!
//! This module provides structured error types with backtraces (when std is
//! enabled) and helper methods for error information.
//!
//! Note that the `Telegram` payload accessors deliberately do NOT use these
//! types: a wrong-length payload read returns a zero/empty default instead of
//! an error. Only frame assembly, serial I/O, addressing and registration
//! surface `KnxError`.

use core::fmt;

#[cfg(feature = "std")]
use std::backtrace::Backtrace;

/// Result type alias for KNX TPUART operations.
pub type Result<T> = core::result::Result<T, KnxError>;

// =============================================================================
// Error Kind Enums (Internal)
// =============================================================================

/// Protocol error variants (internal)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) enum ProtocolErrorKind {
    InvalidFrame,
    InvalidChecksum,
    PayloadTooLarge,
}

/// Serial line error variants (internal)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) enum SerialErrorKind {
    SendFailed,
    SendNotConfirmed,
    ReceiveFailed,
    BufferTooSmall,
}

/// Addressing error variants (internal)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) enum AddressingErrorKind {
    InvalidIndividualAddress,
    InvalidGroupAddress,
    OutOfRange,
}

// =============================================================================
// Main Error Type
// =============================================================================

/// KNX TPUART error types.
///
/// This is the main error type returned by all fallible operations.
/// It contains a backtrace (when the std feature is enabled) and detailed
/// error information through helper methods.
#[derive(Debug)]
pub enum KnxError {
    /// Protocol-related errors (frame shape, checksum, payload size)
    Protocol(ProtocolError),
    /// Serial line errors (write, confirmation, receive)
    Serial(SerialError),
    /// Addressing errors (invalid address format, out of range)
    Addressing(AddressingError),
    /// A bounded wait elapsed without the expected byte arriving
    Timeout,
    /// A fixed-capacity collection (listen-address set) is full
    CapacityExceeded,
}

// =============================================================================
// Structured Error Types
// =============================================================================

/// Protocol error with optional backtrace
#[derive(Debug)]
pub struct ProtocolError {
    kind: ProtocolErrorKind,
    #[cfg(feature = "std")]
    backtrace: Backtrace,
}

impl ProtocolError {
    pub(crate) fn new(kind: ProtocolErrorKind) -> Self {
        Self {
            kind,
            #[cfg(feature = "std")]
            backtrace: Backtrace::capture(),
        }
    }

    /// Check if this is an invalid frame error
    pub fn is_invalid_frame(&self) -> bool {
        matches!(self.kind, ProtocolErrorKind::InvalidFrame)
    }

    /// Check if this is a checksum error
    pub fn is_invalid_checksum(&self) -> bool {
        matches!(self.kind, ProtocolErrorKind::InvalidChecksum)
    }
}

/// Serial line error with optional backtrace
#[derive(Debug)]
pub struct SerialError {
    kind: SerialErrorKind,
    #[cfg(feature = "std")]
    backtrace: Backtrace,
}

impl SerialError {
    pub(crate) fn new(kind: SerialErrorKind) -> Self {
        Self {
            kind,
            #[cfg(feature = "std")]
            backtrace: Backtrace::capture(),
        }
    }

    /// Check if the chip reported a negative send confirmation
    pub fn is_send_not_confirmed(&self) -> bool {
        matches!(self.kind, SerialErrorKind::SendNotConfirmed)
    }

    /// Check if buffer is too small
    pub fn is_buffer_too_small(&self) -> bool {
        matches!(self.kind, SerialErrorKind::BufferTooSmall)
    }
}

/// Addressing error with optional backtrace
#[derive(Debug)]
pub struct AddressingError {
    kind: AddressingErrorKind,
    #[cfg(feature = "std")]
    backtrace: Backtrace,
}

impl AddressingError {
    pub(crate) fn new(kind: AddressingErrorKind) -> Self {
        Self {
            kind,
            #[cfg(feature = "std")]
            backtrace: Backtrace::capture(),
        }
    }

    /// Check if address is out of range
    pub fn is_out_of_range(&self) -> bool {
        matches!(self.kind, AddressingErrorKind::OutOfRange)
    }
}

// =============================================================================
// Convenience Constructors for KnxError
// =============================================================================

impl KnxError {
    // Protocol errors
    pub(crate) fn invalid_frame() -> Self {
        Self::Protocol(ProtocolError::new(ProtocolErrorKind::InvalidFrame))
    }

    pub(crate) fn invalid_checksum() -> Self {
        Self::Protocol(ProtocolError::new(ProtocolErrorKind::InvalidChecksum))
    }

    pub(crate) fn payload_too_large() -> Self {
        Self::Protocol(ProtocolError::new(ProtocolErrorKind::PayloadTooLarge))
    }

    // Serial errors. These three are public so that `SerialPort`
    // implementations outside this crate can report hardware faults in the
    // engine's vocabulary.

    /// The port rejected a write.
    pub fn send_failed() -> Self {
        Self::Serial(SerialError::new(SerialErrorKind::SendFailed))
    }

    pub(crate) fn send_not_confirmed() -> Self {
        Self::Serial(SerialError::new(SerialErrorKind::SendNotConfirmed))
    }

    /// A read failed for a reason other than a timeout (framing, parity,
    /// overrun).
    pub fn receive_failed() -> Self {
        Self::Serial(SerialError::new(SerialErrorKind::ReceiveFailed))
    }

    /// A caller-supplied buffer cannot hold the data.
    pub fn buffer_too_small() -> Self {
        Self::Serial(SerialError::new(SerialErrorKind::BufferTooSmall))
    }

    // Addressing errors
    pub(crate) fn invalid_group_address() -> Self {
        Self::Addressing(AddressingError::new(AddressingErrorKind::InvalidGroupAddress))
    }

    pub(crate) fn invalid_individual_address() -> Self {
        Self::Addressing(AddressingError::new(
            AddressingErrorKind::InvalidIndividualAddress,
        ))
    }

    pub(crate) fn address_out_of_range() -> Self {
        Self::Addressing(AddressingError::new(AddressingErrorKind::OutOfRange))
    }

    /// Check if this error is a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, KnxError::Timeout)
    }
}

// =============================================================================
// Display Implementation
// =============================================================================

impl fmt::Display for KnxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KnxError::Protocol(e) => write!(f, "Protocol error: {:?}", e.kind),
            KnxError::Serial(e) => write!(f, "Serial error: {:?}", e.kind),
            KnxError::Addressing(e) => write!(f, "Addressing error: {:?}", e.kind),
            KnxError::Timeout => write!(f, "Operation timeout"),
            KnxError::CapacityExceeded => write!(f, "Capacity exceeded"),
        }
    }
}

// Implement std::error::Error for std-based applications
#[cfg(feature = "std")]
impl std::error::Error for KnxError {}
