//! Peripheral library registry.
//!
//! Libraries are registered once during startup and keep their slot for the
//! life of the process. The slot index is the library id the host puts at
//! byte 4 of a library command.

pub mod error;
pub mod handler;
pub mod registry;

pub use error::{RegistryError, Result};
pub use handler::{Handled, LibraryHandler};
pub use registry::{LibraryRegistry, MAX_LIBRARIES};
