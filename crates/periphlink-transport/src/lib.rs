//! Byte-oriented transport abstraction.
//!
//! This is the lowest layer of periphlink. The protocol core only needs to
//! know how many inbound bytes are waiting, how to pull one, and how to push
//! and flush outbound bytes. Everything else builds on the [`Transport`]
//! trait provided here.
//!
//! Two implementations ship with the crate:
//! - [`MemoryTransport`] for tests and host-side simulation
//! - [`StreamTransport`] over any `Read`/`Write` pair (stdio, serial device nodes)

pub mod error;
pub mod memory;
pub mod stream;
pub mod traits;

pub use error::{Result, TransportError};
pub use memory::MemoryTransport;
pub use stream::StreamTransport;
pub use traits::Transport;
