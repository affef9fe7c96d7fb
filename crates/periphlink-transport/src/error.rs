/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// An I/O error occurred on the underlying stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer closed the channel and no buffered input remains.
    #[error("transport closed")]
    Closed,

    /// The sink accepted zero bytes for a non-empty write.
    #[error("transport write stalled ({pending} bytes pending)")]
    WriteStalled { pending: usize },
}

pub type Result<T> = std::result::Result<T, TransportError>;
