use std::time::Duration;

use crate::error::Result;

/// A single-channel byte transport between the host and the device.
///
/// Reads never block: [`Transport::read_byte`] returns `Ok(None)` when no
/// byte is buffered right now. A transport whose peer has gone away and
/// which has no buffered input left reports [`TransportError::Closed`].
///
/// [`TransportError::Closed`]: crate::TransportError::Closed
pub trait Transport {
    /// Number of inbound bytes that can be read without waiting.
    fn available(&mut self) -> Result<usize>;

    /// Pop one buffered inbound byte, or `None` if nothing is buffered.
    fn read_byte(&mut self) -> Result<Option<u8>>;

    /// Write all of `bytes` to the outbound side.
    fn write(&mut self, bytes: &[u8]) -> Result<()>;

    /// Flush outbound bytes to the peer.
    fn flush(&mut self) -> Result<()>;

    /// Discard every inbound byte currently buffered.
    ///
    /// Returns the number of discarded bytes.
    fn discard_input(&mut self) -> Result<usize> {
        let mut discarded = 0usize;
        while self.available()? > 0 {
            if self.read_byte()?.is_none() {
                break;
            }
            discarded += 1;
        }
        Ok(discarded)
    }

    /// Wait up to `timeout` for inbound bytes.
    ///
    /// Returns `true` when at least one byte is available. Transports that
    /// cannot wait report the current state immediately.
    fn wait_readable(&mut self, timeout: Duration) -> Result<bool> {
        let _ = timeout;
        Ok(self.available()? > 0)
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn available(&mut self) -> Result<usize> {
        (**self).available()
    }

    fn read_byte(&mut self) -> Result<Option<u8>> {
        (**self).read_byte()
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).write(bytes)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn discard_input(&mut self) -> Result<usize> {
        (**self).discard_input()
    }

    fn wait_readable(&mut self, timeout: Duration) -> Result<bool> {
        (**self).wait_readable(timeout)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn available(&mut self) -> Result<usize> {
        (**self).available()
    }

    fn read_byte(&mut self) -> Result<Option<u8>> {
        (**self).read_byte()
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).write(bytes)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn discard_input(&mut self) -> Result<usize> {
        (**self).discard_input()
    }

    fn wait_readable(&mut self, timeout: Duration) -> Result<bool> {
        (**self).wait_readable(timeout)
    }
}
