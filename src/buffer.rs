//! Per-socket receive accumulation and the single in-flight transmit slot.
//!
//! The receive side is a byte-stream accumulator, not message-oriented: each
//! inbound data event appends to the buffer, and `recv` drains from the
//! front in whatever chunk size the caller provides. The transmit side holds
//! at most one copy of outbound data between `send` and the stack's sent
//! acknowledgment; refusing a second send while one is outstanding is the
//! adapter's backpressure mechanism.

use bytes::{Buf, BytesMut};

/// Accumulates unread inbound data for one socket.
///
/// Invariant: the buffer is empty if and only if `len()` is 0 - there is no
/// separate length bookkeeping to fall out of sync.
#[derive(Debug, Default, PartialEq)]
pub struct RxBuffer {
    buf: BytesMut,
}

impl RxBuffer {
    /// Create an empty receive buffer.
    pub fn new() -> Self {
        Self {
            buf: BytesMut::new(),
        }
    }

    /// Number of unread bytes buffered.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Check whether any unread data is buffered.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Append an inbound payload to the back of the buffer.
    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Copy up to `out.len()` bytes into `out`, consuming them from the
    /// front of the buffer. Returns the number of bytes copied, which may be
    /// less than requested without meaning end-of-stream.
    pub fn read_into(&mut self, out: &mut [u8]) -> usize {
        let n = self.buf.len().min(out.len());
        out[..n].copy_from_slice(&self.buf[..n]);
        self.buf.advance(n);
        n
    }

    /// View the unread bytes without consuming them.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Drop all unread data.
    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

/// Holds the single outstanding transmit copy for one socket.
///
/// Invariant: at most one transmit is in flight at a time; `begin` must not
/// be called while a previous copy is still held.
#[derive(Debug, Default, PartialEq)]
pub struct TxSlot {
    inflight: Option<Box<[u8]>>,
}

impl TxSlot {
    /// Create an empty transmit slot.
    pub fn new() -> Self {
        Self { inflight: None }
    }

    /// Whether a transmit is currently outstanding.
    pub fn is_inflight(&self) -> bool {
        self.inflight.is_some()
    }

    /// Retain a copy of `data` until the stack acknowledges the send.
    pub fn begin(&mut self, data: &[u8]) {
        debug_assert!(self.inflight.is_none());
        self.inflight = Some(data.to_vec().into_boxed_slice());
    }

    /// Release the in-flight copy after the stack's sent acknowledgment.
    /// Tolerates being called with nothing in flight.
    pub fn complete(&mut self) {
        self.inflight = None;
    }

    /// Drop any in-flight copy without an acknowledgment (teardown paths).
    pub fn clear(&mut self) {
        self.inflight = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rx_empty_iff_len_zero() {
        let mut rx = RxBuffer::new();
        assert!(rx.is_empty());
        assert_eq!(rx.len(), 0);

        rx.push(b"abc");
        assert!(!rx.is_empty());
        assert_eq!(rx.len(), 3);

        let mut out = [0u8; 8];
        rx.read_into(&mut out);
        assert!(rx.is_empty());
        assert_eq!(rx.len(), 0);
    }

    #[test]
    fn test_rx_append_grows() {
        let mut rx = RxBuffer::new();
        rx.push(b"hello ");
        rx.push(b"world");
        assert_eq!(rx.as_slice(), b"hello world");
        assert_eq!(rx.len(), 11);
    }

    #[test]
    fn test_rx_partial_read_consumes_front() {
        let mut rx = RxBuffer::new();
        rx.push(b"abcdef");

        let mut out = [0u8; 4];
        assert_eq!(rx.read_into(&mut out), 4);
        assert_eq!(&out, b"abcd");
        assert_eq!(rx.as_slice(), b"ef");

        let mut out = [0u8; 4];
        assert_eq!(rx.read_into(&mut out), 2);
        assert_eq!(&out[..2], b"ef");
        assert!(rx.is_empty());
    }

    #[test]
    fn test_rx_read_into_empty_buffer() {
        let mut rx = RxBuffer::new();
        let mut out = [0u8; 4];
        assert_eq!(rx.read_into(&mut out), 0);
    }

    #[test]
    fn test_rx_stream_fidelity_across_chunk_sizes() {
        let mut rx = RxBuffer::new();
        rx.push(b"the quick brown fox");
        rx.push(b" jumps over");

        let mut collected = Vec::new();
        let mut out = [0u8; 7];
        loop {
            let n = rx.read_into(&mut out);
            if n == 0 {
                break;
            }
            collected.extend_from_slice(&out[..n]);
        }
        assert_eq!(collected, b"the quick brown fox jumps over");
    }

    #[test]
    fn test_tx_single_inflight() {
        let mut tx = TxSlot::new();
        assert!(!tx.is_inflight());

        tx.begin(b"payload");
        assert!(tx.is_inflight());

        tx.complete();
        assert!(!tx.is_inflight());
    }

    #[test]
    fn test_tx_clear_without_ack() {
        let mut tx = TxSlot::new();
        tx.begin(b"payload");
        tx.clear();
        assert!(!tx.is_inflight());
    }
}
