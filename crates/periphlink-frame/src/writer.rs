use bytes::BytesMut;
use periphlink_transport::{Transport, TransportError};
use tracing::debug;

use crate::error::Result;
use crate::reply::{encode_diagnostic, encode_reply};

const INITIAL_BUFFER_CAPACITY: usize = 64;

/// Sink for everything a command handler sends back to the host.
///
/// Handlers never see the transport directly. They answer through this
/// trait, which lets the router hand the same handler a real writer or a
/// test double.
pub trait Respond {
    /// Send one reply and drain whatever the host sent meanwhile.
    fn reply(&mut self, command_id: u8, payload: &[u8]) -> Result<()>;

    /// Send a trace message. A no-op unless diagnostics are enabled.
    fn diagnostic(&mut self, text: &str) -> Result<()>;

    /// Whether [`Respond::diagnostic`] sends anything.
    fn diagnostics_enabled(&self) -> bool;
}

impl<R: Respond + ?Sized> Respond for &mut R {
    fn reply(&mut self, command_id: u8, payload: &[u8]) -> Result<()> {
        (**self).reply(command_id, payload)
    }

    fn diagnostic(&mut self, text: &str) -> Result<()> {
        (**self).diagnostic(text)
    }

    fn diagnostics_enabled(&self) -> bool {
        (**self).diagnostics_enabled()
    }
}

/// Configuration for [`ResponseWriter`].
///
/// Inside a dispatch loop this is derived from the device configuration on
/// every frame rather than set directly.
#[derive(Debug, Clone, Default)]
pub struct WriterConfig {
    /// Emit diagnostic messages. Default: false.
    pub diagnostics_enabled: bool,
}

/// Frames replies and diagnostics onto a transport.
pub struct ResponseWriter<T> {
    inner: T,
    buf: BytesMut,
    config: WriterConfig,
    replies: usize,
}

impl<T: Transport> ResponseWriter<T> {
    /// Create a new response writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, WriterConfig::default())
    }

    /// Create a new response writer with explicit configuration.
    pub fn with_config(inner: T, config: WriterConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
            replies: 0,
        }
    }

    /// Write `[0x00, 0x00, command_id, len_hi, len_lo, payload...]`, flush,
    /// then discard every inbound byte buffered at that moment.
    pub fn reply(&mut self, command_id: u8, payload: &[u8]) -> Result<()> {
        self.buf.clear();
        encode_reply(command_id, payload, &mut self.buf)?;
        self.inner.write(&self.buf)?;
        self.inner.flush()?;
        self.replies += 1;

        // a peer that hung up after sending is noticed by the next poll
        let discarded = match self.inner.discard_input() {
            Ok(discarded) => discarded,
            Err(TransportError::Closed) => 0,
            Err(err) => return Err(err.into()),
        };
        if discarded > 0 {
            debug!(
                command_id,
                discarded, "discarded inbound bytes received before the reply"
            );
        }
        Ok(())
    }

    /// Write a diagnostic message when diagnostics are enabled.
    pub fn diagnostic(&mut self, text: &str) -> Result<()> {
        if !self.config.diagnostics_enabled {
            return Ok(());
        }
        self.buf.clear();
        encode_diagnostic(text.as_bytes(), &mut self.buf);
        self.inner.write(&self.buf)?;
        self.inner.flush()?;
        Ok(())
    }

    /// Number of replies written so far.
    pub fn replies(&self) -> usize {
        self.replies
    }

    /// Current writer configuration.
    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    /// Borrow the underlying transport.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying transport.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the transport.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Transport> Respond for ResponseWriter<T> {
    fn reply(&mut self, command_id: u8, payload: &[u8]) -> Result<()> {
        ResponseWriter::reply(self, command_id, payload)
    }

    fn diagnostic(&mut self, text: &str) -> Result<()> {
        ResponseWriter::diagnostic(self, text)
    }

    fn diagnostics_enabled(&self) -> bool {
        self.config.diagnostics_enabled
    }
}

#[cfg(test)]
mod tests {
    use periphlink_transport::MemoryTransport;

    use super::*;
    use crate::error::FrameError;

    #[test]
    fn reply_writes_flushes_and_drains() {
        let mut transport = MemoryTransport::with_inbound(&[0xf0, 0x00, 0x01]);
        let mut writer = ResponseWriter::new(&mut transport);

        writer.reply(0x03, &[0x01, 0xc2]).unwrap();
        assert_eq!(writer.replies(), 1);

        assert_eq!(
            transport.written(),
            &[0x00, 0x00, 0x03, 0x00, 0x02, 0x01, 0xc2]
        );
        assert_eq!(transport.flush_count(), 1);
        assert_eq!(transport.pending_inbound(), 0);
    }

    #[test]
    fn consecutive_replies_are_not_merged() {
        let mut writer = ResponseWriter::new(MemoryTransport::new());

        writer.reply(0x10, &[]).unwrap();
        writer.reply(0x11, &[0x01]).unwrap();

        let transport = writer.into_inner();
        assert_eq!(
            transport.written(),
            &[0x00, 0x00, 0x10, 0x00, 0x00, 0x00, 0x00, 0x11, 0x00, 0x01, 0x01]
        );
        assert_eq!(transport.flush_count(), 2);
    }

    #[test]
    fn diagnostics_disabled_write_nothing() {
        let mut writer = ResponseWriter::new(MemoryTransport::new());

        writer.diagnostic("Arduino::pinMode(13, OUTPUT);\n").unwrap();

        assert!(!Respond::diagnostics_enabled(&writer));
        assert!(writer.get_ref().written().is_empty());
        assert_eq!(writer.get_ref().flush_count(), 0);
    }

    #[test]
    fn diagnostics_enabled_write_trace_message() {
        let config = WriterConfig {
            diagnostics_enabled: true,
        };
        let mut writer = ResponseWriter::with_config(MemoryTransport::with_inbound(&[9]), config);

        writer.diagnostic("ok\n").unwrap();

        assert_eq!(writer.get_ref().written(), &[0x00, 0x01, 0x03, b'o', b'k', b'\n']);
        // diagnostics leave pending input alone
        assert_eq!(writer.get_ref().pending_inbound(), 1);
        assert_eq!(writer.replies(), 0);
    }

    #[test]
    fn oversized_payload_writes_nothing() {
        let mut writer = ResponseWriter::new(MemoryTransport::new());
        let payload = vec![0u8; 70_000];

        let err = writer.reply(0x01, &payload).unwrap_err();

        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
        assert!(writer.get_ref().written().is_empty());
    }

    #[test]
    fn reply_to_closed_peer_still_succeeds() {
        let mut transport = MemoryTransport::with_inbound(&[1, 2]);
        transport.close();
        let mut writer = ResponseWriter::new(&mut transport);

        writer.reply(0x03, &[0, 1]).unwrap();

        assert_eq!(transport.written().len(), 7);
        assert_eq!(transport.pending_inbound(), 0);
        assert!(transport.is_closed());
    }

    #[test]
    fn write_failure_is_reported() {
        struct Broken;

        impl Transport for Broken {
            fn available(&mut self) -> periphlink_transport::Result<usize> {
                Ok(0)
            }

            fn read_byte(&mut self) -> periphlink_transport::Result<Option<u8>> {
                Ok(None)
            }

            fn write(&mut self, bytes: &[u8]) -> periphlink_transport::Result<()> {
                Err(TransportError::WriteStalled {
                    pending: bytes.len(),
                })
            }

            fn flush(&mut self) -> periphlink_transport::Result<()> {
                Ok(())
            }
        }

        let mut writer = ResponseWriter::new(Broken);
        let err = writer.reply(0x10, &[]).unwrap_err();
        assert!(matches!(
            err,
            FrameError::Transport(TransportError::WriteStalled { pending: 5 })
        ));
        assert_eq!(writer.replies(), 0);
    }

    #[test]
    fn respond_through_trait_object() {
        let mut writer = ResponseWriter::new(MemoryTransport::new());
        {
            let out: &mut dyn Respond = &mut writer;
            out.reply(0x11, &[0x00]).unwrap();
        }
        assert_eq!(writer.get_ref().written(), &[0x00, 0x00, 0x11, 0x00, 0x01, 0x00]);
    }
}
