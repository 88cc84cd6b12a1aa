//! In-memory serial port for tests.

use heapless::{Deque, Vec};

use crate::error::{KnxError, Result};
use crate::serial::SerialPort;

/// Scripted serial port backed by in-memory queues.
///
/// Bytes queued with [`MockSerial::queue_bytes`] are handed out by `read` and
/// `peek` in FIFO order; everything the engine writes is captured and can be
/// inspected with [`MockSerial::written`]. Timeouts are simulated by an empty
/// receive queue, so the `timeout_ms` arguments are ignored.
///
/// # Examples
///
/// ```
/// use knx_tpuart::serial::{MockSerial, SerialPort};
///
/// let mut port = MockSerial::new();
/// port.queue_bytes(&[0x8B]);
///
/// assert_eq!(port.peek(10), Some(0x8B));
/// assert_eq!(port.read(10).unwrap(), 0x8B);
/// assert!(port.read(10).is_err());
/// ```
#[derive(Debug, Default)]
pub struct MockSerial {
    rx: Deque<u8, 256>,
    tx: Vec<u8, 256>,
}

impl MockSerial {
    /// Create a mock port with empty queues.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes for the engine to receive.
    ///
    /// # Panics
    ///
    /// Panics if the receive queue overflows (test fixture too large).
    pub fn queue_bytes(&mut self, data: &[u8]) {
        for &byte in data {
            self.rx.push_back(byte).unwrap();
        }
    }

    /// Everything written to the port so far, in order.
    pub fn written(&self) -> &[u8] {
        &self.tx
    }

    /// Number of bytes still waiting to be read.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Drop queued receive bytes and forget captured writes.
    pub fn reset(&mut self) {
        self.rx.clear();
        self.tx.clear();
    }
}

impl SerialPort for MockSerial {
    fn read(&mut self, _timeout_ms: u32) -> Result<u8> {
        // Empty queue stands in for an expired timeout
        self.rx.pop_front().ok_or(KnxError::Timeout)
    }

    fn peek(&mut self, _timeout_ms: u32) -> Option<u8> {
        self.rx.front().copied()
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.tx
            .extend_from_slice(data)
            .map_err(|_| KnxError::send_failed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_fifo_order() {
        let mut port = MockSerial::new();
        port.queue_bytes(&[1, 2, 3]);

        assert_eq!(port.read(10).unwrap(), 1);
        assert_eq!(port.read(10).unwrap(), 2);
        assert_eq!(port.read(10).unwrap(), 3);
    }

    #[test]
    fn test_empty_queue_is_timeout() {
        let mut port = MockSerial::new();
        let err = port.read(10).unwrap_err();
        assert!(err.is_timeout());
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut port = MockSerial::new();
        port.queue_bytes(&[0x42]);

        assert_eq!(port.peek(10), Some(0x42));
        assert_eq!(port.peek(10), Some(0x42));
        assert_eq!(port.read(10).unwrap(), 0x42);
        assert_eq!(port.peek(10), None);
    }

    #[test]
    fn test_write_is_captured() {
        let mut port = MockSerial::new();
        port.write(&[0x01]).unwrap();
        port.write(&[0x02, 0x03]).unwrap();
        assert_eq!(port.written(), &[0x01, 0x02, 0x03]);
    }

    #[test]
    fn test_reset_clears_both_sides() {
        let mut port = MockSerial::new();
        port.queue_bytes(&[9]);
        port.write(&[8]).unwrap();
        port.reset();

        assert_eq!(port.pending(), 0);
        assert!(port.written().is_empty());
    }
}
