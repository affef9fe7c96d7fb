use std::io::{ErrorKind, Read, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Duration;

use bytes::{Buf, BytesMut};
use tracing::{debug, warn};

use crate::error::{Result, TransportError};
use crate::traits::Transport;

const READ_CHUNK_SIZE: usize = 256;
const INITIAL_BUFFER_CAPACITY: usize = 1024;

/// Transport over a blocking `Read` source and a `Write` sink.
///
/// A helper thread owns the source and forwards whatever it reads over a
/// channel, so [`Transport::available`] can answer without blocking. The
/// sink is written on the caller's thread.
pub struct StreamTransport<W> {
    writer: W,
    rx: Receiver<Vec<u8>>,
    pending: BytesMut,
    disconnected: bool,
}

impl<W: Write> StreamTransport<W> {
    /// Start reading from `reader` on a helper thread and write to `writer`.
    pub fn spawn<R>(reader: R, writer: W) -> Result<Self>
    where
        R: Read + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        std::thread::Builder::new()
            .name("periphlink-rx".to_string())
            .spawn(move || pump(reader, tx))?;

        Ok(Self {
            writer,
            rx,
            pending: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            disconnected: false,
        })
    }

    /// Borrow the outbound sink.
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Mutably borrow the outbound sink.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Consume the transport and return the outbound sink.
    pub fn into_writer(self) -> W {
        self.writer
    }

    fn fill(&mut self) {
        loop {
            match self.rx.try_recv() {
                Ok(chunk) => self.pending.extend_from_slice(&chunk),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.disconnected = true;
                    break;
                }
            }
        }
    }
}

impl<W: Write> Transport for StreamTransport<W> {
    fn available(&mut self) -> Result<usize> {
        self.fill();
        if self.pending.is_empty() && self.disconnected {
            return Err(TransportError::Closed);
        }
        Ok(self.pending.len())
    }

    fn read_byte(&mut self) -> Result<Option<u8>> {
        if self.pending.is_empty() {
            self.fill();
        }
        if self.pending.is_empty() {
            if self.disconnected {
                return Err(TransportError::Closed);
            }
            return Ok(None);
        }
        Ok(Some(self.pending.get_u8()))
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let mut offset = 0usize;
        while offset < bytes.len() {
            match self.writer.write(&bytes[offset..]) {
                Ok(0) => {
                    return Err(TransportError::WriteStalled {
                        pending: bytes.len() - offset,
                    })
                }
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        loop {
            match self.writer.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn wait_readable(&mut self, timeout: Duration) -> Result<bool> {
        if self.available()? > 0 {
            return Ok(true);
        }
        match self.rx.recv_timeout(timeout) {
            Ok(chunk) => {
                self.pending.extend_from_slice(&chunk);
                Ok(!self.pending.is_empty())
            }
            Err(RecvTimeoutError::Timeout) => Ok(false),
            Err(RecvTimeoutError::Disconnected) => {
                self.disconnected = true;
                Err(TransportError::Closed)
            }
        }
    }
}

impl<W> std::fmt::Debug for StreamTransport<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamTransport")
            .field("pending", &self.pending.len())
            .field("disconnected", &self.disconnected)
            .finish()
    }
}

fn pump<R: Read>(mut reader: R, tx: Sender<Vec<u8>>) {
    let mut chunk = [0u8; READ_CHUNK_SIZE];
    loop {
        match reader.read(&mut chunk) {
            Ok(0) => {
                debug!("inbound stream reached end of file");
                break;
            }
            Ok(n) => {
                if tx.send(chunk[..n].to_vec()).is_err() {
                    break;
                }
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => {
                warn!(error = %err, "inbound stream read failed");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn drain_until_closed<W: Write>(transport: &mut StreamTransport<W>) -> Vec<u8> {
        let mut received = Vec::new();
        loop {
            match transport.wait_readable(Duration::from_millis(200)) {
                Ok(true) => {
                    while let Some(byte) = transport.read_byte().unwrap() {
                        received.push(byte);
                    }
                }
                Ok(false) => continue,
                Err(TransportError::Closed) => return received,
                Err(err) => panic!("unexpected transport error: {err}"),
            }
        }
    }

    #[test]
    fn reads_everything_then_reports_closed() {
        let source = Cursor::new(vec![0xf0, 0x00, 0x01, 0xf7]);
        let mut transport = StreamTransport::spawn(source, Vec::<u8>::new()).unwrap();

        let received = drain_until_closed(&mut transport);

        assert_eq!(received, vec![0xf0, 0x00, 0x01, 0xf7]);
        assert!(matches!(transport.available(), Err(TransportError::Closed)));
    }

    #[test]
    fn writes_reach_the_sink() {
        let mut transport =
            StreamTransport::spawn(Cursor::new(Vec::<u8>::new()), Vec::<u8>::new()).unwrap();

        transport.write(&[0x00, 0x00, 0x10, 0x00, 0x00]).unwrap();
        transport.flush().unwrap();

        assert_eq!(transport.into_writer(), vec![0x00, 0x00, 0x10, 0x00, 0x00]);
    }

    #[test]
    fn stalled_sink_is_reported() {
        struct ZeroWriter;

        impl Write for ZeroWriter {
            fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
                Ok(0)
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let mut transport =
            StreamTransport::spawn(Cursor::new(Vec::<u8>::new()), ZeroWriter).unwrap();
        let err = transport.write(b"xy").unwrap_err();
        assert!(matches!(err, TransportError::WriteStalled { pending: 2 }));
    }

    #[test]
    fn interrupted_write_and_flush_retry() {
        struct InterruptOnce {
            wrote_once: bool,
            flushed_once: bool,
            data: Vec<u8>,
        }

        impl Write for InterruptOnce {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                if !self.wrote_once {
                    self.wrote_once = true;
                    return Err(std::io::Error::from(ErrorKind::Interrupted));
                }
                self.data.extend_from_slice(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> std::io::Result<()> {
                if !self.flushed_once {
                    self.flushed_once = true;
                    return Err(std::io::Error::from(ErrorKind::Interrupted));
                }
                Ok(())
            }
        }

        let sink = InterruptOnce {
            wrote_once: false,
            flushed_once: false,
            data: Vec::new(),
        };
        let mut transport = StreamTransport::spawn(Cursor::new(Vec::<u8>::new()), sink).unwrap();

        transport.write(b"retry").unwrap();
        transport.flush().unwrap();

        assert_eq!(transport.get_ref().data, b"retry");
    }

    #[test]
    #[cfg(unix)]
    fn live_pipe_delivers_bytes_without_closing() {
        let (mut host, device) = std::os::unix::net::UnixStream::pair().unwrap();
        let writer = device.try_clone().unwrap();
        let mut transport = StreamTransport::spawn(device, writer).unwrap();

        host.write_all(&[1, 2, 3]).unwrap();

        let mut received = Vec::new();
        while received.len() < 3 {
            if transport.wait_readable(Duration::from_secs(2)).unwrap() {
                while let Some(byte) = transport.read_byte().unwrap() {
                    received.push(byte);
                }
            }
        }
        assert_eq!(received, vec![1, 2, 3]);
        assert_eq!(transport.available().unwrap(), 0);

        transport.write(&[4]).unwrap();
        transport.flush().unwrap();
        let mut reply = [0u8; 1];
        std::io::Read::read_exact(&mut host, &mut reply).unwrap();
        assert_eq!(reply, [4]);
    }
}
