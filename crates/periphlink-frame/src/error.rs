use periphlink_transport::TransportError;

/// Errors that can occur while decoding inbound frames or writing replies.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The frame ends before an offset a decoder needs to read.
    #[error("frame too short ({len} bytes, need {needed})")]
    ShortFrame { needed: usize, len: usize },

    /// The packed input cannot carry the requested number of bytes.
    #[error("packed input too short ({available} bytes, {needed} needed to unpack {count})")]
    ShortPacked {
        count: usize,
        needed: usize,
        available: usize,
    },

    /// The payload does not fit the reply length field.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A field was read with an accessor that does not match its kind.
    #[error("field `{field}` cannot be read as {requested}")]
    FieldKind {
        field: &'static str,
        requested: &'static str,
    },

    /// An outbound message carries an unknown module header or kind byte.
    #[error("invalid outbound header (module 0x{module:02x}, kind 0x{kind:02x})")]
    InvalidHeader { module: u8, kind: u8 },

    /// The transport failed while writing a reply.
    #[error("frame transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Errors detected while building a [`FrameLayout`](crate::FrameLayout).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    /// A field starts inside the fixed frame header.
    #[error("field `{field}` overlaps the frame header")]
    InsideHeader { field: &'static str },

    /// A field starts before the previous field ends.
    #[error("field `{field}` overlaps the preceding field")]
    Overlap { field: &'static str },

    /// A variable-length field is followed by another field.
    #[error("variable-length field `{field}` must be last")]
    VariableNotLast { field: &'static str },
}

pub type Result<T> = std::result::Result<T, FrameError>;
