//! Offset-histogram matching of query fingerprints against an index
//!
//! Every query hash found in the index votes for `(track, offset)` where
//! offset is the reference anchor time minus the query anchor time. A clip
//! taken from a reference track puts most of its votes in one bucket; the
//! tallest bucket per track is that track's score.

use crate::config::MatchingConfig;
use crate::error::Result;
use crate::fingerprint::Fingerprint;
use crate::index::{CatalogIndex, TrackId};
use crate::waveform::Waveform;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

#[cfg(test)]
mod tests;

/// Best alignment of the query against one track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub track_id: TrackId,
    /// Votes in the tallest offset bucket
    pub score: usize,
    /// Reference frame minus query frame
    pub offset_frames: i64,
    /// Distinct hashes shared by query and track
    pub distinct_hashes: usize,
}

/// An identified track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub track_id: TrackId,
    pub title: String,
    pub score: usize,
    /// Share of query hashes that landed in the winning bucket
    pub confidence: f64,
    pub offset_frames: i64,
    /// Position of the query start inside the reference, in seconds
    pub offset_seconds: f64,
    pub distinct_hashes: usize,
    pub query_hashes: usize,

    // Span of the aligned matches, in seconds
    pub query_start: f64,
    pub query_stop: f64,
    pub ref_start: f64,
    pub ref_stop: f64,
}

/// Outcome of a recognition attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Recognition {
    Match(MatchResult),
    /// Nothing reached the minimum score
    NoMatch {
        query_hashes: usize,
        best_score: usize,
    },
}

impl Recognition {
    pub fn is_match(&self) -> bool {
        matches!(self, Recognition::Match(_))
    }

    pub fn as_match(&self) -> Option<&MatchResult> {
        match self {
            Recognition::Match(result) => Some(result),
            Recognition::NoMatch { .. } => None,
        }
    }
}

/// Matcher over a borrowed index
pub struct Matcher<'a> {
    index: &'a CatalogIndex,
    config: MatchingConfig,
}

impl<'a> Matcher<'a> {
    pub fn new(index: &'a CatalogIndex, config: &MatchingConfig) -> Self {
        Self {
            index,
            config: config.clone(),
        }
    }

    /// Fingerprint a clip with the index parameters and recognize it
    pub fn recognize(&self, waveform: &Waveform) -> Result<Recognition> {
        let fingerprints = crate::extract_fingerprints(waveform, self.index.config())?;
        Ok(self.recognize_fingerprints(&fingerprints))
    }

    /// Recognize already extracted query fingerprints
    pub fn recognize_fingerprints(&self, query: &[Fingerprint]) -> Recognition {
        let candidates = self.rank(query);
        let best = match candidates.into_iter().next() {
            Some(best) => best,
            None => {
                log::debug!("No query hash found in the index ({} hashes)", query.len());
                return Recognition::NoMatch {
                    query_hashes: query.len(),
                    best_score: 0,
                };
            }
        };

        if best.score < self.config.min_matches {
            log::debug!(
                "Best candidate {} scored {} (need {})",
                best.track_id,
                best.score,
                self.config.min_matches
            );
            return Recognition::NoMatch {
                query_hashes: query.len(),
                best_score: best.score,
            };
        }

        let frame_duration = self.index.config().frame_duration();
        let span = self.aligned_span(query, best.track_id, best.offset_frames);
        let title = self
            .index
            .track(best.track_id)
            .map(|t| t.title.clone())
            .unwrap_or_default();

        log::debug!(
            "Matched track {} {:?}: score {}/{}, offset {} frames",
            best.track_id,
            title,
            best.score,
            query.len(),
            best.offset_frames
        );

        Recognition::Match(MatchResult {
            track_id: best.track_id,
            title,
            score: best.score,
            confidence: (best.score as f64 / query.len() as f64).min(1.0),
            offset_frames: best.offset_frames,
            offset_seconds: best.offset_frames as f64 * frame_duration,
            distinct_hashes: best.distinct_hashes,
            query_hashes: query.len(),
            query_start: span.query_start as f64 * frame_duration,
            query_stop: span.query_stop as f64 * frame_duration,
            ref_start: span.ref_start as f64 * frame_duration,
            ref_stop: span.ref_stop as f64 * frame_duration,
        })
    }

    /// Every track sharing a hash with the query, best first.
    ///
    /// Ordered by score, then distinct shared hashes (both descending),
    /// then track id.
    pub fn rank(&self, query: &[Fingerprint]) -> Vec<Candidate> {
        let mut histogram: HashMap<(TrackId, i64), usize> = HashMap::new();
        let mut shared: HashMap<TrackId, HashSet<u64>> = HashMap::new();

        for fp in query {
            let entries = self.index.lookup(fp.hash);
            for entry in entries {
                let offset = entry.anchor_time as i64 - fp.anchor_time as i64;
                *histogram.entry((entry.track_id, offset)).or_insert(0) += 1;
                shared.entry(entry.track_id).or_default().insert(fp.hash);
            }
        }

        // Tallest bucket per track; equal heights keep the smallest offset
        let mut best: HashMap<TrackId, (usize, i64)> = HashMap::new();
        for (&(track_id, offset), &count) in &histogram {
            best.entry(track_id)
                .and_modify(|current| {
                    if count > current.0 || (count == current.0 && offset < current.1) {
                        *current = (count, offset);
                    }
                })
                .or_insert((count, offset));
        }

        let mut candidates: Vec<Candidate> = best
            .into_iter()
            .map(|(track_id, (score, offset_frames))| Candidate {
                track_id,
                score,
                offset_frames,
                distinct_hashes: shared.get(&track_id).map(HashSet::len).unwrap_or(0),
            })
            .collect();
        candidates.sort_by(compare_candidates);

        log::trace!(
            "{} query hashes, {} offset buckets, {} candidate tracks",
            query.len(),
            histogram.len(),
            candidates.len()
        );

        candidates
    }

    /// First and last anchor frames of the votes in one bucket
    fn aligned_span(&self, query: &[Fingerprint], track_id: TrackId, offset: i64) -> Span {
        let mut span: Option<Span> = None;

        for fp in query {
            for entry in self.index.lookup(fp.hash) {
                if entry.track_id != track_id
                    || entry.anchor_time as i64 - fp.anchor_time as i64 != offset
                {
                    continue;
                }
                let (q, r) = (fp.anchor_time, entry.anchor_time);
                span = Some(match span {
                    None => Span {
                        query_start: q,
                        query_stop: q,
                        ref_start: r,
                        ref_stop: r,
                    },
                    Some(s) => Span {
                        query_start: s.query_start.min(q),
                        query_stop: s.query_stop.max(q),
                        ref_start: s.ref_start.min(r),
                        ref_stop: s.ref_stop.max(r),
                    },
                });
            }
        }

        span.unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Span {
    query_start: u32,
    query_stop: u32,
    ref_start: u32,
    ref_stop: u32,
}

fn compare_candidates(a: &Candidate, b: &Candidate) -> Ordering {
    b.score
        .cmp(&a.score)
        .then(b.distinct_hashes.cmp(&a.distinct_hashes))
        .then(a.track_id.cmp(&b.track_id))
}
