//! Reference tracks and build reports

use crate::error::EchomarkError;
use crate::index::{TrackId, TrackInfo};
use crate::waveform::Waveform;

/// A reference recording offered to the index
#[derive(Debug, Clone)]
pub struct Track {
    pub id: TrackId,
    pub title: String,
    pub waveform: Waveform,
}

impl Track {
    pub fn new(id: TrackId, title: impl Into<String>, waveform: Waveform) -> Self {
        Self {
            id,
            title: title.into(),
            waveform,
        }
    }
}

/// A track left out of a batch build
#[derive(Debug)]
pub struct SkippedTrack {
    pub id: TrackId,
    pub title: String,
    pub error: EchomarkError,
}

/// Outcome of a batch build or extension
#[derive(Debug, Default)]
pub struct BuildReport {
    pub indexed: Vec<TrackInfo>,
    pub skipped: Vec<SkippedTrack>,
}

impl BuildReport {
    pub fn total_hashes(&self) -> usize {
        self.indexed.iter().map(|t| t.num_hashes as usize).sum()
    }

    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}
