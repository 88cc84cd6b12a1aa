//! Serial port abstraction.
//!
//! The protocol engine talks to the TPUART chip through the [`SerialPort`]
//! trait, so the same engine runs against a hardware UART on an embedded
//! target or against [`MockSerial`] in tests.

pub mod mock;

#[doc(inline)]
pub use mock::MockSerial;

use crate::error::Result;

/// Byte-oriented serial port with per-read timeouts.
///
/// Implementations wrap a hardware UART (or any byte stream). All three
/// operations are blocking but bounded: `read` and `peek` wait at most
/// `timeout_ms` milliseconds for a byte to arrive.
pub trait SerialPort {
    /// Read one byte, waiting up to `timeout_ms` for it to arrive.
    ///
    /// # Errors
    ///
    /// Returns a timeout error if no byte arrived in time, or a receive
    /// error for a hardware fault (framing, overrun).
    fn read(&mut self, timeout_ms: u32) -> Result<u8>;

    /// Look at the next byte without consuming it, waiting up to
    /// `timeout_ms`. Returns `None` if no byte arrived in time.
    fn peek(&mut self, timeout_ms: u32) -> Option<u8>;

    /// Write all of `data` to the port.
    ///
    /// # Errors
    ///
    /// Returns a send error if the port rejects the write.
    fn write(&mut self, data: &[u8]) -> Result<()>;
}
