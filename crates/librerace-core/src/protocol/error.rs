//! Wire protocol errors

use thiserror::Error;

/// Errors on the framed message boundary
#[derive(Error, Debug)]
pub enum WireError {
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Frame error: {0}")]
    FrameError(String),
}

impl From<tokio_util::codec::LinesCodecError> for WireError {
    fn from(err: tokio_util::codec::LinesCodecError) -> Self {
        match err {
            tokio_util::codec::LinesCodecError::MaxLineLengthExceeded => {
                WireError::FrameError("line length limit exceeded".to_string())
            }
            tokio_util::codec::LinesCodecError::Io(e) => WireError::IoError(e),
        }
    }
}
