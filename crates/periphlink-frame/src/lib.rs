//! Frame handling for the periphlink command bridge.
//!
//! Inbound commands arrive as [`InboundFrame`]s with a fixed 5-byte header:
//! - a 1-byte sequence id (opaque correlation token)
//! - a 2-byte big-endian declared payload length
//! - a 1-byte selector (built-in device command or peripheral library)
//! - a 1-byte command id or library id
//!
//! Numeric parameters travel 7-bit packed ([`codec`]) and are read through
//! compile-time checked [`FrameLayout`]s. Replies go out through a
//! [`ResponseWriter`] as `[0x00, kind, command id, length (2B BE), payload]`.

pub mod codec;
pub mod error;
pub mod frame;
pub mod layout;
pub mod reply;
pub mod sysex;
pub mod writer;

pub use codec::{packed_len, unpack, unpack_into, unpack_u16_le, unpack_u8};
pub use error::{FrameError, LayoutError, Result};
pub use frame::{InboundFrame, Selector, HEADER_LEN};
pub use layout::{Field, FieldKind, FrameLayout};
pub use reply::{
    decode_outbound, encode_diagnostic, encode_reply, MessageKind, OutboundFrame,
    MAX_DIAGNOSTIC_LEN, MAX_REPLY_PAYLOAD, MODULE_HEADER,
};
pub use sysex::{
    encode_sysex, FrameDelimiter, SysexConfig, SysexDelimiter, END_SYSEX, START_SYSEX,
};
pub use writer::{Respond, ResponseWriter, WriterConfig};
