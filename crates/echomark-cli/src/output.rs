//! JSON output formatting

use echomark_core::{Candidate, CatalogIndex, FingerprintConfig, Recognition, TrackInfo};
use serde::Serialize;

/// Summary printed by `embuild`
#[derive(Debug, Serialize)]
pub struct BuildOutput {
    pub status: &'static str,
    pub index_path: String,
    pub tracks_indexed: usize,
    pub tracks_skipped: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedOutput>,
    pub total_tracks: usize,
    pub total_hashes: usize,
    pub total_entries: usize,
    pub processing_time_seconds: f64,
}

#[derive(Debug, Serialize)]
pub struct SkippedOutput {
    pub path: String,
    pub reason: String,
}

/// Result for one query file
#[derive(Debug, Serialize)]
pub struct QueryOutput {
    pub query_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recognition: Option<Recognition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<CandidateOutput>,
}

impl QueryOutput {
    pub fn failed(query_path: String, error: impl ToString) -> Self {
        Self {
            query_path,
            recognition: None,
            error: Some(error.to_string()),
            candidates: Vec::new(),
        }
    }

    pub fn is_match(&self) -> bool {
        self.recognition.as_ref().map_or(false, Recognition::is_match)
    }
}

/// A ranked track, for `--top`
#[derive(Debug, Serialize)]
pub struct CandidateOutput {
    pub track_id: u32,
    pub title: String,
    pub score: usize,
    pub distinct_hashes: usize,
    pub offset_seconds: f64,
}

impl CandidateOutput {
    pub fn new(candidate: &Candidate, index: &CatalogIndex) -> Self {
        Self {
            track_id: candidate.track_id,
            title: index
                .track(candidate.track_id)
                .map(|t| t.title.clone())
                .unwrap_or_default(),
            score: candidate.score,
            distinct_hashes: candidate.distinct_hashes,
            offset_seconds: candidate.offset_frames as f64 * index.config().frame_duration(),
        }
    }
}

/// Summary printed by `emmatch`
#[derive(Debug, Serialize)]
pub struct MatchOutput {
    pub queries: usize,
    pub recognized: usize,
    pub results: Vec<QueryOutput>,
}

/// Summary printed by `eminspect`
#[derive(Debug, Serialize)]
pub struct InspectOutput<'a> {
    pub index_path: String,
    pub num_tracks: usize,
    pub num_hashes: usize,
    pub num_entries: usize,
    pub fingerprint: &'a FingerprintConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracks: Option<&'a [TrackInfo]>,
}

/// Print any output structure as pretty JSON
pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing output: {}", e),
    }
}
