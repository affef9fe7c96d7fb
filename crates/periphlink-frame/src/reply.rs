use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// First byte of every outbound message.
pub const MODULE_HEADER: u8 = 0x00;

/// Reply header: module (1) + kind (1) + command id (1) + length (2 BE).
pub const REPLY_HEADER_LEN: usize = 5;

/// Diagnostic header: module (1) + kind (1) + length (1).
pub const DIAGNOSTIC_HEADER_LEN: usize = 3;

/// Largest payload the 2-byte reply length field can describe.
pub const MAX_REPLY_PAYLOAD: usize = u16::MAX as usize;

/// Longest diagnostic text; longer messages are truncated.
pub const MAX_DIAGNOSTIC_LEN: usize = u8::MAX as usize;

/// Kind byte of an outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageKind {
    Reply = 0x00,
    Diagnostic = 0x01,
}

impl MessageKind {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::Reply),
            0x01 => Some(Self::Diagnostic),
            _ => None,
        }
    }
}

/// A message travelling from the device to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    /// Answer to one inbound command.
    Reply { command_id: u8, payload: Bytes },
    /// Free-form trace text.
    Diagnostic { text: Bytes },
}

impl OutboundFrame {
    /// Build a reply message.
    pub fn reply(command_id: u8, payload: impl Into<Bytes>) -> Self {
        Self::Reply {
            command_id,
            payload: payload.into(),
        }
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Reply { .. } => MessageKind::Reply,
            Self::Diagnostic { .. } => MessageKind::Diagnostic,
        }
    }

    /// Encode this message into `dst`.
    pub fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        match self {
            Self::Reply {
                command_id,
                payload,
            } => encode_reply(*command_id, payload, dst),
            Self::Diagnostic { text } => {
                encode_diagnostic(text, dst);
                Ok(())
            }
        }
    }
}

/// Encode a reply into the wire format.
///
/// ```text
/// ┌──────────┬──────────┬────────────┬───────────┬──────────────────┐
/// │ Module   │ Kind     │ Command id │ Length    │ Payload          │
/// │ 0x00     │ 0x00     │ (1B)       │ (2B BE)   │ (Length bytes)   │
/// └──────────┴──────────┴────────────┴───────────┴──────────────────┘
/// ```
pub fn encode_reply(command_id: u8, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > MAX_REPLY_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_REPLY_PAYLOAD,
        });
    }
    dst.reserve(REPLY_HEADER_LEN + payload.len());
    dst.put_u8(MODULE_HEADER);
    dst.put_u8(MessageKind::Reply as u8);
    dst.put_u8(command_id);
    dst.put_u16(payload.len() as u16);
    dst.put_slice(payload);
    Ok(())
}

/// Encode a diagnostic message: `[0x00, 0x01, len, text...]`.
///
/// Text beyond [`MAX_DIAGNOSTIC_LEN`] bytes is cut off.
pub fn encode_diagnostic(text: &[u8], dst: &mut BytesMut) {
    let text = &text[..text.len().min(MAX_DIAGNOSTIC_LEN)];
    dst.reserve(DIAGNOSTIC_HEADER_LEN + text.len());
    dst.put_u8(MODULE_HEADER);
    dst.put_u8(MessageKind::Diagnostic as u8);
    dst.put_u8(text.len() as u8);
    dst.put_slice(text);
}

/// Decode one outbound message from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete message yet.
/// On success, consumes the message bytes from the buffer. Used on the host
/// side of the link.
pub fn decode_outbound(src: &mut BytesMut) -> Result<Option<OutboundFrame>> {
    if src.len() < 2 {
        return Ok(None);
    }

    let module = src[0];
    let kind = MessageKind::from_byte(src[1]);
    if module != MODULE_HEADER || kind.is_none() {
        return Err(FrameError::InvalidHeader {
            module,
            kind: src[1],
        });
    }

    match kind {
        Some(MessageKind::Reply) => {
            if src.len() < REPLY_HEADER_LEN {
                return Ok(None);
            }
            let command_id = src[2];
            let payload_len = u16::from_be_bytes([src[3], src[4]]) as usize;
            if src.len() < REPLY_HEADER_LEN + payload_len {
                return Ok(None);
            }
            src.advance(REPLY_HEADER_LEN);
            let payload = src.split_to(payload_len).freeze();
            Ok(Some(OutboundFrame::Reply {
                command_id,
                payload,
            }))
        }
        _ => {
            if src.len() < DIAGNOSTIC_HEADER_LEN {
                return Ok(None);
            }
            let text_len = src[2] as usize;
            if src.len() < DIAGNOSTIC_HEADER_LEN + text_len {
                return Ok(None);
            }
            src.advance(DIAGNOSTIC_HEADER_LEN);
            let text = src.split_to(text_len).freeze();
            Ok(Some(OutboundFrame::Diagnostic { text }))
        }
    }
}
