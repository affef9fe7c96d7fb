//! Peripheral libraries for the periphlink command bridge.
//!
//! Each library is a [`LibraryHandler`](periphlink_registry::LibraryHandler)
//! that decodes its own command id and parameters, drives hardware through
//! a small trait, and answers with a status byte where the hardware can
//! fail.

pub mod error;
pub mod i2c;
pub mod servo;
pub mod spi;

pub use error::{BusError, Result};
pub use i2c::{I2cBus, I2cLibrary, I2C_LIBRARY_NAME};
pub use servo::{ServoDriver, ServoLibrary, MAX_SERVOS, SERVO_LIBRARY_NAME};
pub use spi::{SpiBus, SpiLibrary, SPI_LIBRARY_NAME};
