use periphlink_frame::FrameError;
use periphlink_registry::RegistryError;
use periphlink_transport::TransportError;

/// Errors that can occur while routing and dispatching commands.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Library registration failed.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}

impl RouterError {
    /// Whether the error means the peer has gone away.
    pub fn is_closed(&self) -> bool {
        matches!(
            self,
            Self::Transport(TransportError::Closed)
                | Self::Frame(FrameError::Transport(TransportError::Closed))
        )
    }
}

pub type Result<T> = std::result::Result<T, RouterError>;
