//! Host-to-device command bridge for microcontroller pins and peripherals.
//!
//! A host sends small binary command frames over a byte stream; the device
//! side decodes them, runs built-in pin commands or hands them to a
//! registered peripheral library, and answers with a reply frame.
//!
//! # Crate Structure
//!
//! - [`transport`]: byte transport abstraction (memory, stdio, device nodes)
//! - [`frame`]: 7-bit codec, inbound frames, field layouts, reply framing
//! - [`registry`]: fixed-capacity peripheral library registry
//! - [`router`]: built-in command set, command router, dispatch loop
//! - [`peripherals`]: I2C, Servo and SPI libraries (behind `peripherals` feature)

/// Re-export transport types.
pub mod transport {
    pub use periphlink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use periphlink_frame::*;
}

/// Re-export registry types.
pub mod registry {
    pub use periphlink_registry::*;
}

/// Re-export router types.
pub mod router {
    pub use periphlink_router::*;
}

/// Re-export peripheral libraries (requires `peripherals` feature).
#[cfg(feature = "peripherals")]
pub mod peripherals {
    pub use periphlink_peripherals::*;
}
