use std::collections::VecDeque;

use bytes::{Bytes, BytesMut};

use crate::error::{Result, TransportError};
use crate::traits::Transport;

/// In-memory transport.
///
/// Inbound bytes are queued with [`MemoryTransport::push_inbound`]; everything
/// the device writes accumulates in an outbound buffer. Used as the loopback
/// for tests and for host-side simulation.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    inbound: VecDeque<u8>,
    outbound: BytesMut,
    flushes: usize,
    closed: bool,
}

impl MemoryTransport {
    /// Create an empty, open transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport with `bytes` already queued for reading.
    pub fn with_inbound(bytes: &[u8]) -> Self {
        let mut transport = Self::new();
        transport.push_inbound(bytes);
        transport
    }

    /// Queue bytes as if the host had sent them.
    pub fn push_inbound(&mut self, bytes: &[u8]) {
        self.inbound.extend(bytes.iter().copied());
    }

    /// Inbound bytes not yet consumed.
    pub fn pending_inbound(&self) -> usize {
        self.inbound.len()
    }

    /// Everything written so far.
    pub fn written(&self) -> &[u8] {
        &self.outbound
    }

    /// Take everything written so far, leaving the outbound buffer empty.
    pub fn take_written(&mut self) -> Bytes {
        self.outbound.split().freeze()
    }

    /// How many times `flush` has been called.
    pub fn flush_count(&self) -> usize {
        self.flushes
    }

    /// Mark the inbound side closed. Buffered bytes remain readable.
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Whether the inbound side has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Transport for MemoryTransport {
    fn available(&mut self) -> Result<usize> {
        if self.inbound.is_empty() && self.closed {
            return Err(TransportError::Closed);
        }
        Ok(self.inbound.len())
    }

    fn read_byte(&mut self) -> Result<Option<u8>> {
        match self.inbound.pop_front() {
            Some(byte) => Ok(Some(byte)),
            None if self.closed => Err(TransportError::Closed),
            None => Ok(None),
        }
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.outbound.extend_from_slice(bytes);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.flushes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_queued_bytes_in_order() {
        let mut transport = MemoryTransport::with_inbound(&[0xde, 0xad]);

        assert_eq!(transport.available().unwrap(), 2);
        assert_eq!(transport.read_byte().unwrap(), Some(0xde));
        assert_eq!(transport.read_byte().unwrap(), Some(0xad));
        assert_eq!(transport.read_byte().unwrap(), None);
    }

    #[test]
    fn records_writes_and_flushes() {
        let mut transport = MemoryTransport::new();

        transport.write(b"abc").unwrap();
        transport.write(b"de").unwrap();
        transport.flush().unwrap();

        assert_eq!(transport.written(), b"abcde");
        assert_eq!(transport.flush_count(), 1);
        assert_eq!(transport.take_written().as_ref(), b"abcde");
        assert!(transport.written().is_empty());
    }

    #[test]
    fn discard_input_empties_inbound_queue() {
        let mut transport = MemoryTransport::with_inbound(&[1, 2, 3, 4]);

        assert_eq!(transport.discard_input().unwrap(), 4);
        assert_eq!(transport.pending_inbound(), 0);
        assert_eq!(transport.discard_input().unwrap(), 0);
    }

    #[test]
    fn closed_reports_only_after_buffered_input_is_consumed() {
        let mut transport = MemoryTransport::with_inbound(&[7]);
        transport.close();

        assert_eq!(transport.available().unwrap(), 1);
        assert_eq!(transport.read_byte().unwrap(), Some(7));
        assert!(matches!(
            transport.available(),
            Err(TransportError::Closed)
        ));
        assert!(matches!(
            transport.read_byte(),
            Err(TransportError::Closed)
        ));
    }

    #[test]
    fn borrowed_transport_forwards_calls() {
        fn echo_one<T: Transport>(mut transport: T) -> Option<u8> {
            let byte = transport.read_byte().unwrap()?;
            transport.write(&[byte]).unwrap();
            transport.flush().unwrap();
            Some(byte)
        }

        let mut transport = MemoryTransport::with_inbound(&[9]);
        assert_eq!(echo_one(&mut transport), Some(9));
        assert_eq!(transport.written(), &[9]);
        assert_eq!(transport.flush_count(), 1);
    }
}
