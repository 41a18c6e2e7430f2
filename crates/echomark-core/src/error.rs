//! Error taxonomy of the recognition engine

use echomark_index::FormatError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EchomarkError {
    /// Unreadable, corrupt or unsupported audio
    #[error("failed to decode audio from {origin}: {reason}")]
    Decoding { origin: String, reason: String },

    /// Audio that cannot be fingerprinted
    #[error("insufficient audio: {0}")]
    InsufficientAudio(String),

    /// A persisted index failed validation; it has to be rebuilt
    #[error("index corrupted: {0}")]
    IndexCorruption(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A count outgrew the 32-bit fields of the index
    #[error("index capacity exceeded: {0}")]
    CapacityExceeded(String),

    #[error("track {0} is already in the index")]
    DuplicateTrack(u32),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<FormatError> for EchomarkError {
    fn from(err: FormatError) -> Self {
        match err {
            FormatError::Io(e) => EchomarkError::Io(e),
            other => EchomarkError::IndexCorruption(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, EchomarkError>;
