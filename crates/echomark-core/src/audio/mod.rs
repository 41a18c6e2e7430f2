//! Audio decoding and resampling
//!
//! Supports WAV, MP3, FLAC and OGG with dedicated pure Rust decoders, and
//! anything Symphonia can probe (MP4/M4A, MKV/WebM, AAC) as a fallback.

mod decoder;
mod probe;
mod resample;

pub use decoder::{decode_audio, decode_audio_bytes, AudioData};
pub use resample::resample_to_target;

use std::path::Path;

/// Supported audio formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
    Mp3,
    Flac,
    Ogg,

    /// Container formats handed to Symphonia
    Container,

    Unknown,
}

impl AudioFormat {
    /// Detect format from file extension
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("wav") | Some("wave") => AudioFormat::Wav,
            Some("mp3") => AudioFormat::Mp3,
            Some("flac") => AudioFormat::Flac,
            Some("ogg") | Some("oga") => AudioFormat::Ogg,
            Some("mp4") | Some("m4a") | Some("aac") | Some("mkv") | Some("mka")
            | Some("webm") => AudioFormat::Container,
            _ => AudioFormat::Unknown,
        }
    }

    /// Detect format from the leading bytes
    pub fn sniff(bytes: &[u8]) -> Self {
        if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE" {
            AudioFormat::Wav
        } else if bytes.starts_with(b"fLaC") {
            AudioFormat::Flac
        } else if bytes.starts_with(b"OggS") {
            AudioFormat::Ogg
        } else if bytes.starts_with(b"ID3")
            || (bytes.len() >= 2 && bytes[0] == 0xFF && (bytes[1] & 0xE0) == 0xE0)
        {
            AudioFormat::Mp3
        } else {
            AudioFormat::Unknown
        }
    }

    /// True for formats that are decoded through Symphonia's probe
    pub fn needs_probe(&self) -> bool {
        matches!(self, AudioFormat::Container | AudioFormat::Unknown)
    }
}

/// Audio file extensions the catalog scanner picks up
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "wav", "wave", "mp3", "flac", "ogg", "oga", "mp4", "m4a", "aac", "mkv", "mka", "webm",
];

/// True if the path has one of the supported audio extensions
pub fn is_supported_audio(path: &Path) -> bool {
    !matches!(AudioFormat::from_path(path), AudioFormat::Unknown)
}
