//! Command routing for the periphlink command bridge.
//!
//! [`CommandRouter`] splits each inbound frame on its selector byte:
//! built-in device commands run against a [`Board`], library commands go
//! to the handler registered under the library id. [`Dispatcher`] drives
//! the router from a transport, one frame at a time.

pub mod board;
pub mod command;
pub mod dispatcher;
pub mod error;
pub mod router;

pub use board::{Board, HIGH, INPUT, INPUT_PULLUP, LOW, OUTPUT};
pub use command::{command_name, BuiltinCommand};
pub use dispatcher::{DispatchConfig, DispatchStats, Dispatcher, Poll};
pub use error::{Result, RouterError};
pub use router::{
    CommandRouter, DeviceConfig, DropReason, Outcome, DEFAULT_PLATFORM_ID, DESCRIPTION_SEPARATOR,
};
