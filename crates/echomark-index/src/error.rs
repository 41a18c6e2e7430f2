//! Errors raised while encoding or decoding index files

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("truncated index: need {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("invalid index file: magic bytes mismatch ({0:02x?})")]
    BadMagic([u8; 4]),

    #[error("unsupported index format version {0}")]
    UnsupportedVersion(u16),

    #[error("checksum mismatch: header says {expected:#018x}, payload is {actual:#018x}")]
    ChecksumMismatch { expected: u64, actual: u64 },

    #[error("payload size mismatch: header says {expected} bytes, got {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("failed to decompress payload: {0}")]
    Decompress(std::io::Error),

    #[error("bincode error: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("inconsistent index: {0}")]
    Inconsistent(String),
}

pub type Result<T> = std::result::Result<T, FormatError>;
