/// Failures reported by peripheral hardware.
///
/// These never abort a frame: libraries turn them into a status byte in
/// the reply payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BusError {
    /// No device acknowledged the address.
    #[error("no acknowledge from address 0x{address:02x}")]
    Nack { address: u8 },

    /// The device returned fewer bytes than requested.
    #[error("short read ({got} of {expected} bytes)")]
    ShortRead { expected: usize, got: usize },

    /// The bus index does not exist on this board.
    #[error("bus {0} not available")]
    UnsupportedBus(u8),
}

pub type Result<T> = std::result::Result<T, BusError>;
