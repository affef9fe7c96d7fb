use std::fmt;
use std::io;

use periphlink_frame::FrameError;
use periphlink_registry::RegistryError;
use periphlink_router::RouterError;
use periphlink_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::InvalidInput | io::ErrorKind::InvalidData => DATA_INVALID,
        io::ErrorKind::NotFound
        | io::ErrorKind::PermissionDenied
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::WouldBlock
        | io::ErrorKind::TimedOut => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Io(source) => io_error(context, source),
        TransportError::Closed => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Transport(err) => transport_error(context, err),
        FrameError::ShortFrame { .. }
        | FrameError::ShortPacked { .. }
        | FrameError::PayloadTooLarge { .. }
        | FrameError::InvalidHeader { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

pub fn registry_error(context: &str, err: RegistryError) -> CliError {
    CliError::new(USAGE, format!("{context}: {err}"))
}

pub fn router_error(context: &str, err: RouterError) -> CliError {
    match err {
        RouterError::Transport(err) => transport_error(context, err),
        RouterError::Frame(err) => frame_error(context, err),
        RouterError::Registry(err) => registry_error(context, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_packed_input_is_invalid_data() {
        let err = frame_error(
            "unpack failed",
            FrameError::ShortPacked {
                count: 2,
                needed: 3,
                available: 1,
            },
        );
        assert_eq!(err.code, DATA_INVALID);
        assert!(err.message.starts_with("unpack failed: "));
    }

    #[test]
    fn nested_transport_errors_keep_their_code() {
        let err = router_error(
            "dispatch failed",
            RouterError::Frame(FrameError::Transport(TransportError::WriteStalled {
                pending: 4,
            })),
        );
        assert_eq!(err.code, TRANSPORT_ERROR);

        let missing = io::Error::from(io::ErrorKind::NotFound);
        assert_eq!(io_error("open failed", missing).code, TRANSPORT_ERROR);
    }

    #[test]
    fn full_registry_is_a_usage_error() {
        let err = registry_error(
            "library registration failed",
            RegistryError::RegistryFull { capacity: 16 },
        );
        assert_eq!(err.code, USAGE);
    }
}
