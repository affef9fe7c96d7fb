use bytes::Bytes;

use crate::codec;
use crate::error::{FrameError, Result};

/// Fixed inbound prefix: sequence id (1) + declared length (2) + selector (1) + id (1).
pub const HEADER_LEN: usize = 5;

/// Offset of the opaque correlation token.
pub const SEQUENCE_OFFSET: usize = 0;
/// Offset of the big-endian declared payload length.
pub const LENGTH_OFFSET: usize = 1;
/// Offset of the selector byte.
pub const SELECTOR_OFFSET: usize = 3;
/// Offset of the built-in command id, or of the library id for library commands.
pub const TARGET_OFFSET: usize = 4;

/// Top-level split of inbound commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Selector {
    /// Built-in device command; byte 4 is the command id.
    Device = 0x00,
    /// Peripheral-library command; byte 4 is the library id.
    Library = 0x01,
}

impl Selector {
    /// Map a selector byte, or `None` for reserved values.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::Device),
            0x01 => Some(Self::Library),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

/// One complete inbound command.
///
/// ```text
/// ┌──────────┬────────────┬──────────┬───────────────┬──────────────────┐
/// │ Sequence │ Length     │ Selector │ Command /     │ Body             │
/// │ (1B)     │ (2B BE)    │ (1B)     │ Library id    │ (layout-defined) │
/// └──────────┴────────────┴──────────┴───────────────┴──────────────────┘
/// ```
///
/// Construction guarantees the 5-byte header is present; every body access
/// is bounds-checked and fails with [`FrameError::ShortFrame`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundFrame {
    bytes: Bytes,
}

impl InboundFrame {
    /// Wrap raw frame bytes.
    pub fn new(bytes: impl Into<Bytes>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.len() < HEADER_LEN {
            return Err(FrameError::ShortFrame {
                needed: HEADER_LEN,
                len: bytes.len(),
            });
        }
        Ok(Self { bytes })
    }

    /// Opaque correlation token chosen by the host.
    pub fn sequence_id(&self) -> u8 {
        self.bytes[SEQUENCE_OFFSET]
    }

    /// Declared payload length (big-endian on the wire).
    pub fn declared_len(&self) -> u16 {
        u16::from_be_bytes([self.bytes[LENGTH_OFFSET], self.bytes[LENGTH_OFFSET + 1]])
    }

    pub fn selector_byte(&self) -> u8 {
        self.bytes[SELECTOR_OFFSET]
    }

    /// The selector, or `None` for a reserved selector byte.
    pub fn selector(&self) -> Option<Selector> {
        Selector::from_byte(self.selector_byte())
    }

    /// Built-in command id or library id, depending on the selector.
    pub fn target_id(&self) -> u8 {
        self.bytes[TARGET_OFFSET]
    }

    /// Read one raw byte.
    pub fn byte(&self, offset: usize) -> Result<u8> {
        self.require(offset + 1)?;
        Ok(self.bytes[offset])
    }

    /// Unpack `count` raw bytes from packed bytes starting at `offset`.
    pub fn unpack(&self, offset: usize, count: usize) -> Result<Vec<u8>> {
        let needed = offset + codec::packed_len(count);
        self.require(needed)?;
        codec::unpack(count, &self.bytes[offset..needed])
    }

    /// Unpack one raw byte starting at `offset`.
    pub fn unpack_u8(&self, offset: usize) -> Result<u8> {
        let needed = offset + codec::packed_len(1);
        self.require(needed)?;
        codec::unpack_u8(&self.bytes[offset..needed])
    }

    /// Unpack a little-endian `u16` starting at `offset`.
    pub fn unpack_u16(&self, offset: usize) -> Result<u16> {
        let needed = offset + codec::packed_len(2);
        self.require(needed)?;
        codec::unpack_u16_le(&self.bytes[offset..needed])
    }

    /// Fail unless the frame holds at least `len` bytes.
    pub fn require(&self, len: usize) -> Result<()> {
        if self.bytes.len() < len {
            return Err(FrameError::ShortFrame {
                needed: len,
                len: self.bytes.len(),
            });
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false: a frame holds at least its header.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }
}

impl AsRef<[u8]> for InboundFrame {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_fields() {
        let frame = InboundFrame::new(vec![0x2a, 0x01, 0x02, 0x00, 0x10, 13, 1]).unwrap();

        assert_eq!(frame.sequence_id(), 0x2a);
        assert_eq!(frame.declared_len(), 0x0102);
        assert_eq!(frame.selector(), Some(Selector::Device));
        assert_eq!(frame.target_id(), 0x10);
        assert_eq!(frame.byte(5).unwrap(), 13);
        assert_eq!(frame.len(), 7);
    }

    #[test]
    fn header_must_be_complete() {
        let err = InboundFrame::new(vec![0x00, 0x00, 0x00, 0x00]).unwrap_err();
        assert!(matches!(err, FrameError::ShortFrame { needed: 5, len: 4 }));
    }

    #[test]
    fn reserved_selector_is_none() {
        let frame = InboundFrame::new(vec![0, 0, 0, 0x02, 0x01]).unwrap();
        assert_eq!(frame.selector(), None);
        assert_eq!(frame.selector_byte(), 0x02);
    }

    #[test]
    fn body_reads_are_bounds_checked() {
        let frame = InboundFrame::new(vec![0, 0, 2, 0x00, 0x20, 9, 0x68]).unwrap();

        assert_eq!(frame.byte(5).unwrap(), 9);
        assert!(matches!(
            frame.byte(7),
            Err(FrameError::ShortFrame { needed: 8, len: 7 })
        ));
        assert!(matches!(
            frame.unpack_u16(6),
            Err(FrameError::ShortFrame { needed: 9, len: 7 })
        ));
    }

    #[test]
    fn packed_reads() {
        let frame = InboundFrame::new(vec![0, 0, 5, 0x00, 0x20, 9, 0x68, 0x07, 0x00]).unwrap();

        assert_eq!(frame.unpack_u16(6).unwrap(), 1000);
        assert_eq!(frame.unpack(6, 2).unwrap(), vec![0xe8, 0x03]);
        assert_eq!(frame.unpack_u8(6).unwrap(), 0xe8);
    }

    #[test]
    fn selector_bytes_roundtrip() {
        assert_eq!(Selector::Device.as_byte(), 0x00);
        assert_eq!(Selector::Library.as_byte(), 0x01);
        assert_eq!(Selector::from_byte(0x01), Some(Selector::Library));
    }
}
