//! Declarative parameter layouts for fixed-offset frame bodies.
//!
//! Every command reads its parameters at fixed positions after the
//! 5-byte header. A [`FrameLayout`] lists those positions as typed
//! [`Field`]s. Layouts are checked by a `const fn`, so a layout constant
//! with overlapping fields, a field inside the header, or a variable-length
//! field that is not last fails to compile.
//!
//! ```
//! use periphlink_frame::{Field, FrameLayout, InboundFrame};
//!
//! const PIN: Field = Field::byte("pin", 5);
//! const DUTY: Field = Field::packed_u16("duty", 6);
//! const PWM: FrameLayout = FrameLayout::new("pwm", &[PIN, DUTY]);
//!
//! let frame = InboundFrame::new(vec![0, 0, 4, 0x00, 0x21, 9, 0x68, 0x07, 0x00]).unwrap();
//! PWM.require(&frame).unwrap();
//! assert_eq!(PIN.read_u8(&frame).unwrap(), 9);
//! assert_eq!(DUTY.read_u16(&frame).unwrap(), 1000);
//! ```

use crate::codec;
use crate::error::{FrameError, LayoutError, Result};
use crate::frame::{InboundFrame, HEADER_LEN};

/// How a field is carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// One raw byte.
    Byte,
    /// One byte carried by 2 packed bytes.
    PackedU8,
    /// A little-endian `u16` carried by 3 packed bytes.
    PackedU16,
    /// A run of packed bytes whose length is given by another field.
    PackedBytes,
}

impl FieldKind {
    /// Wire width in bytes, or `None` for variable-length kinds.
    pub const fn width(self) -> Option<usize> {
        match self {
            Self::Byte => Some(1),
            Self::PackedU8 => Some(codec::packed_len(1)),
            Self::PackedU16 => Some(codec::packed_len(2)),
            Self::PackedBytes => None,
        }
    }
}

/// One named parameter at a fixed frame offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub offset: usize,
    pub kind: FieldKind,
}

impl Field {
    pub const fn new(name: &'static str, offset: usize, kind: FieldKind) -> Self {
        Self { name, offset, kind }
    }

    pub const fn byte(name: &'static str, offset: usize) -> Self {
        Self::new(name, offset, FieldKind::Byte)
    }

    pub const fn packed_u8(name: &'static str, offset: usize) -> Self {
        Self::new(name, offset, FieldKind::PackedU8)
    }

    pub const fn packed_u16(name: &'static str, offset: usize) -> Self {
        Self::new(name, offset, FieldKind::PackedU16)
    }

    pub const fn packed_bytes(name: &'static str, offset: usize) -> Self {
        Self::new(name, offset, FieldKind::PackedBytes)
    }

    /// First offset past the fixed part of this field.
    pub const fn end(&self) -> usize {
        match self.kind.width() {
            Some(width) => self.offset + width,
            None => self.offset,
        }
    }

    /// Read a [`FieldKind::Byte`] or [`FieldKind::PackedU8`] field.
    pub fn read_u8(&self, frame: &InboundFrame) -> Result<u8> {
        match self.kind {
            FieldKind::Byte => frame.byte(self.offset),
            FieldKind::PackedU8 => frame.unpack_u8(self.offset),
            _ => Err(self.kind_error("u8")),
        }
    }

    /// Read a [`FieldKind::PackedU16`] field.
    pub fn read_u16(&self, frame: &InboundFrame) -> Result<u16> {
        match self.kind {
            FieldKind::PackedU16 => frame.unpack_u16(self.offset),
            _ => Err(self.kind_error("u16")),
        }
    }

    /// Read `count` bytes from a [`FieldKind::PackedBytes`] field.
    pub fn read_bytes(&self, frame: &InboundFrame, count: usize) -> Result<Vec<u8>> {
        match self.kind {
            FieldKind::PackedBytes => frame.unpack(self.offset, count),
            _ => Err(self.kind_error("bytes")),
        }
    }

    fn kind_error(&self, requested: &'static str) -> FrameError {
        FrameError::FieldKind {
            field: self.name,
            requested,
        }
    }
}

/// An ordered, validated list of parameter fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    name: &'static str,
    fields: &'static [Field],
    min_len: usize,
}

impl FrameLayout {
    /// Build a layout, failing const evaluation if it is invalid.
    pub const fn new(name: &'static str, fields: &'static [Field]) -> Self {
        match Self::check(name, fields) {
            Ok(layout) => layout,
            Err(LayoutError::InsideHeader { .. }) => {
                panic!("frame layout field starts inside the frame header")
            }
            Err(LayoutError::Overlap { .. }) => {
                panic!("frame layout fields overlap or are out of order")
            }
            Err(LayoutError::VariableNotLast { .. }) => {
                panic!("variable-length frame layout field must be last")
            }
        }
    }

    /// Validate a layout without panicking.
    pub const fn check(
        name: &'static str,
        fields: &'static [Field],
    ) -> std::result::Result<Self, LayoutError> {
        let mut end = HEADER_LEN;
        let mut i = 0;
        while i < fields.len() {
            let field = &fields[i];
            if field.offset < HEADER_LEN {
                return Err(LayoutError::InsideHeader { field: field.name });
            }
            if field.offset < end {
                return Err(LayoutError::Overlap { field: field.name });
            }
            if field.kind.width().is_none() && i + 1 < fields.len() {
                return Err(LayoutError::VariableNotLast { field: field.name });
            }
            end = field.end();
            i += 1;
        }

        Ok(Self {
            name,
            fields,
            min_len: end,
        })
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub const fn fields(&self) -> &'static [Field] {
        self.fields
    }

    /// Shortest frame that carries every fixed-width field.
    pub const fn min_len(&self) -> usize {
        self.min_len
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&'static Field> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Fail with [`FrameError::ShortFrame`] unless every fixed field is present.
    pub fn require(&self, frame: &InboundFrame) -> Result<()> {
        frame.require(self.min_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PIN: Field = Field::byte("pin", 5);
    const FREQUENCY: Field = Field::packed_u16("frequency", 6);
    const DURATION: Field = Field::packed_u16("duration", 9);
    const TONE: FrameLayout = FrameLayout::new("tone", &[PIN, FREQUENCY, DURATION]);

    #[test]
    fn widths() {
        assert_eq!(FieldKind::Byte.width(), Some(1));
        assert_eq!(FieldKind::PackedU8.width(), Some(2));
        assert_eq!(FieldKind::PackedU16.width(), Some(3));
        assert_eq!(FieldKind::PackedBytes.width(), None);
    }

    #[test]
    fn min_len_covers_last_fixed_field() {
        assert_eq!(TONE.min_len(), 12);
        assert_eq!(TONE.name(), "tone");
        assert_eq!(TONE.fields().len(), 3);

        const EMPTY: FrameLayout = FrameLayout::new("empty", &[]);
        assert_eq!(EMPTY.min_len(), HEADER_LEN);
    }

    #[test]
    fn require_rejects_short_frames() {
        let short = InboundFrame::new(vec![0, 0, 0, 0x00, 0x22, 8, 0, 0, 0]).unwrap();
        assert!(matches!(
            TONE.require(&short),
            Err(FrameError::ShortFrame { needed: 12, len: 9 })
        ));
    }

    #[test]
    fn reads_typed_fields() {
        // pin 8, 440 Hz (0x01b8), 250 ms (0x00fa)
        let frame =
            InboundFrame::new(vec![0, 0, 7, 0x00, 0x22, 8, 0x38, 0x03, 0x00, 0x7a, 0x01, 0x00])
                .unwrap();
        TONE.require(&frame).unwrap();
        assert_eq!(PIN.read_u8(&frame).unwrap(), 8);
        assert_eq!(FREQUENCY.read_u16(&frame).unwrap(), 440);
        assert_eq!(DURATION.read_u16(&frame).unwrap(), 250);
    }

    #[test]
    fn wrong_accessor_is_an_error() {
        let frame = InboundFrame::new(vec![0, 0, 0, 0x00, 0x22, 8, 0, 0, 0]).unwrap();
        assert!(matches!(
            PIN.read_u16(&frame),
            Err(FrameError::FieldKind {
                field: "pin",
                requested: "u16"
            })
        ));
        assert!(FREQUENCY.read_u8(&frame).is_err());
        assert!(PIN.read_bytes(&frame, 1).is_err());
    }

    #[test]
    fn variable_field_reads_requested_count() {
        const DATA: Field = Field::packed_bytes("data", 6);
        let frame = InboundFrame::new(vec![0, 0, 0, 0x01, 0x00, 2, 0x34, 0x24, 0x00]).unwrap();
        assert_eq!(DATA.read_bytes(&frame, 2).unwrap(), vec![0x34, 0x12]);
        assert!(DATA.read_bytes(&frame, 3).is_err());
    }

    #[test]
    fn check_reports_invalid_layouts() {
        const IN_HEADER: &[Field] = &[Field::byte("id", 4)];
        const OVERLAP: &[Field] = &[Field::packed_u16("a", 5), Field::byte("b", 7)];
        const UNORDERED: &[Field] = &[Field::byte("a", 8), Field::byte("b", 6)];
        const TRAILING: &[Field] = &[Field::packed_bytes("data", 5), Field::byte("b", 9)];

        assert_eq!(
            FrameLayout::check("x", IN_HEADER),
            Err(LayoutError::InsideHeader { field: "id" })
        );
        assert_eq!(
            FrameLayout::check("x", OVERLAP),
            Err(LayoutError::Overlap { field: "b" })
        );
        assert_eq!(
            FrameLayout::check("x", UNORDERED),
            Err(LayoutError::Overlap { field: "b" })
        );
        assert_eq!(
            FrameLayout::check("x", TRAILING),
            Err(LayoutError::VariableNotLast { field: "data" })
        );
    }

    #[test]
    fn field_lookup_by_name() {
        assert_eq!(TONE.field("duration"), Some(&DURATION));
        assert_eq!(TONE.field("missing"), None);
    }
}
