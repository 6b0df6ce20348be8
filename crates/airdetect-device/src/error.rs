use std::time::Duration;

use airdetect_frame::FramingError;

/// Why a device connection stopped.
///
/// All variants are local to one connection; the listener keeps accepting.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// The byte stream could not be split into well-formed frames.
    #[error("framing error: {0}")]
    Framing(FramingError),

    /// Reading from the socket failed.
    #[error("read failed: {0}")]
    Io(std::io::Error),

    /// No frame arrived within the idle deadline.
    #[error("idle for {0:?}, closing")]
    IdleTimeout(Duration),
}

impl From<FramingError> for ConnectionError {
    fn from(err: FramingError) -> Self {
        match err {
            FramingError::Io(io) => ConnectionError::Io(io),
            other => ConnectionError::Framing(other),
        }
    }
}

/// Errors that can occur in device listener operations.
///
/// Connection failures never surface here: each is logged by the task that
/// owns the connection.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] airdetect_transport::TransportError),
}

pub type Result<T> = std::result::Result<T, DeviceError>;
