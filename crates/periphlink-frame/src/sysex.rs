//! Firmata-style SysEx framing.
//!
//! On the wire each command travels as one SysEx envelope:
//!
//! ```text
//! 0xF0 │ selector │ sequence │ len hi │ len lo │ id │ body... │ 0xF7
//! ```
//!
//! [`SysexDelimiter`] collects envelopes byte by byte and hands out
//! [`InboundFrame`]s in router order (sequence, length, selector, id, body).

use bytes::{BufMut, BytesMut};
use periphlink_transport::Transport;
use tracing::{debug, trace, warn};

use crate::frame::{InboundFrame, HEADER_LEN};

/// Opens a SysEx envelope.
pub const START_SYSEX: u8 = 0xF0;
/// Closes a SysEx envelope.
pub const END_SYSEX: u8 = 0xF7;

/// Default largest envelope body in bytes.
pub const DEFAULT_MAX_FRAME_LEN: usize = 256;

/// Extracts complete inbound frames from a byte transport.
pub trait FrameDelimiter {
    /// Consume buffered transport bytes until a complete frame is found.
    ///
    /// Returns `Ok(None)` when the buffered bytes do not complete a frame
    /// yet; partial state is kept for the next call.
    fn next_frame(
        &mut self,
        transport: &mut dyn Transport,
    ) -> periphlink_transport::Result<Option<InboundFrame>>;

    /// Number of malformed or oversize frames discarded so far.
    fn discarded(&self) -> u64 {
        0
    }
}

/// Configuration for [`SysexDelimiter`].
#[derive(Debug, Clone)]
pub struct SysexConfig {
    /// Largest envelope body accepted. Default: 256 bytes.
    pub max_frame_len: usize,
}

impl Default for SysexConfig {
    fn default() -> Self {
        Self {
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }
}

/// Collects SysEx envelopes into inbound frames.
#[derive(Debug)]
pub struct SysexDelimiter {
    buf: BytesMut,
    config: SysexConfig,
    in_envelope: bool,
    overflowed: bool,
    discarded: u64,
}

impl Default for SysexDelimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl SysexDelimiter {
    pub fn new() -> Self {
        Self::with_config(SysexConfig::default())
    }

    pub fn with_config(config: SysexConfig) -> Self {
        Self {
            buf: BytesMut::with_capacity(config.max_frame_len),
            config,
            in_envelope: false,
            overflowed: false,
            discarded: 0,
        }
    }

    pub fn config(&self) -> &SysexConfig {
        &self.config
    }

    /// Feed one byte. Returns a frame when `byte` closes a valid envelope.
    pub fn push(&mut self, byte: u8) -> Option<InboundFrame> {
        match byte {
            START_SYSEX => {
                if self.in_envelope {
                    debug!(
                        dropped = self.buf.len(),
                        "sysex start inside open envelope, restarting"
                    );
                    self.discarded += 1;
                }
                self.buf.clear();
                self.in_envelope = true;
                self.overflowed = false;
                None
            }
            END_SYSEX if self.in_envelope => {
                self.in_envelope = false;
                self.finish()
            }
            _ if self.in_envelope => {
                if self.buf.len() < self.config.max_frame_len {
                    self.buf.put_u8(byte);
                } else {
                    self.overflowed = true;
                }
                None
            }
            _ => {
                trace!(byte, "ignoring byte outside sysex envelope");
                None
            }
        }
    }

    fn finish(&mut self) -> Option<InboundFrame> {
        if self.overflowed {
            warn!(
                max = self.config.max_frame_len,
                "discarding oversize sysex envelope"
            );
            self.overflowed = false;
            self.discarded += 1;
            self.buf.clear();
            return None;
        }
        if self.buf.len() < HEADER_LEN {
            warn!(len = self.buf.len(), "discarding truncated sysex envelope");
            self.discarded += 1;
            self.buf.clear();
            return None;
        }

        // [selector, seq, len hi, len lo, id, body...] -> [seq, len hi, len lo, selector, id, body...]
        let data = self.buf.split();
        let mut frame = BytesMut::with_capacity(data.len());
        frame.put_slice(&data[1..4]);
        frame.put_u8(data[0]);
        frame.put_slice(&data[4..]);

        InboundFrame::new(frame.freeze()).ok()
    }
}

impl FrameDelimiter for SysexDelimiter {
    fn next_frame(
        &mut self,
        transport: &mut dyn Transport,
    ) -> periphlink_transport::Result<Option<InboundFrame>> {
        while let Some(byte) = transport.read_byte()? {
            if let Some(frame) = self.push(byte) {
                return Ok(Some(frame));
            }
        }
        Ok(None)
    }

    fn discarded(&self) -> u64 {
        self.discarded
    }
}

/// Wrap an inbound frame in a SysEx envelope, as the host sends it.
pub fn encode_sysex(frame: &InboundFrame, dst: &mut BytesMut) {
    let bytes = frame.as_bytes();
    dst.reserve(bytes.len() + 2);
    dst.put_u8(START_SYSEX);
    dst.put_u8(bytes[3]);
    dst.put_slice(&bytes[..3]);
    dst.put_slice(&bytes[4..]);
    dst.put_u8(END_SYSEX);
}
