//! Inverted index from fingerprint hash to track occurrences
//!
//! The index is a plain value: lookups borrow it shared, `add_track` and
//! `extend` borrow it exclusively. [`SharedIndex`] puts it behind a
//! readers-writer lock for callers that query and grow it from different
//! threads.

use crate::catalog::{BuildReport, SkippedTrack, Track};
use crate::config::{FingerprintConfig, MatchingConfig};
use crate::error::{EchomarkError, Result};
use crate::fingerprint::Fingerprint;
use crate::matching::{Matcher, Recognition};
use crate::waveform::Waveform;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub type TrackId = u32;

/// Occurrence of a hash inside a reference track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub track_id: TrackId,
    pub anchor_time: u32,
}

/// Per-track bookkeeping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackInfo {
    pub id: TrackId,
    pub title: String,
    pub duration_ms: u32,
    /// Number of catalog entries the track contributed
    pub num_hashes: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogIndex {
    config: FingerprintConfig,
    /// Tracks in insertion order
    tracks: Vec<TrackInfo>,
    positions: HashMap<TrackId, usize>,
    buckets: HashMap<u64, Vec<CatalogEntry>>,
}

impl CatalogIndex {
    /// Create an empty index for `config`
    pub fn new(config: FingerprintConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            tracks: Vec::new(),
            positions: HashMap::new(),
            buckets: HashMap::new(),
        })
    }

    /// Build an index over a whole catalog.
    ///
    /// Tracks are fingerprinted in parallel and inserted in input order.
    /// Tracks that cannot be fingerprinted are skipped and reported.
    pub fn build(tracks: Vec<Track>, config: FingerprintConfig) -> Result<(Self, BuildReport)> {
        let mut index = Self::new(config)?;
        let report = index.extend(tracks);
        Ok((index, report))
    }

    /// Fingerprint and append a batch of tracks
    pub fn extend(&mut self, tracks: Vec<Track>) -> BuildReport {
        let mut report = BuildReport::default();

        let mut seen: HashSet<TrackId> = HashSet::new();
        let mut accepted = Vec::with_capacity(tracks.len());
        for track in tracks {
            if self.contains_track(track.id) || !seen.insert(track.id) {
                log::warn!("Skipping {:?}: duplicate track id {}", track.title, track.id);
                report.skipped.push(SkippedTrack {
                    id: track.id,
                    title: track.title,
                    error: EchomarkError::DuplicateTrack(track.id),
                });
            } else {
                accepted.push(track);
            }
        }

        let config = &self.config;
        let extracted: Vec<(Track, Result<Vec<Fingerprint>>)> = accepted
            .into_par_iter()
            .map(|track| {
                let fingerprints = crate::extract_fingerprints(&track.waveform, config);
                (track, fingerprints)
            })
            .collect();

        for (track, fingerprints) in extracted {
            let inserted = fingerprints.and_then(|fingerprints| {
                let duration_ms = track.waveform.duration_ms();
                self.insert_fingerprints(track.id, &track.title, duration_ms, &fingerprints)
            });
            match inserted {
                Ok(info) => report.indexed.push(info),
                Err(error) => {
                    log::warn!("Skipping {:?} (id {}): {}", track.title, track.id, error);
                    report.skipped.push(SkippedTrack {
                        id: track.id,
                        title: track.title,
                        error,
                    });
                }
            }
        }

        log::info!(
            "Indexed {} tracks ({} hashes), skipped {}",
            report.indexed.len(),
            report.total_hashes(),
            report.skipped.len()
        );

        report
    }

    /// Fingerprint one track and append its entries
    pub fn add_track(&mut self, track: Track) -> Result<TrackInfo> {
        if self.contains_track(track.id) {
            return Err(EchomarkError::DuplicateTrack(track.id));
        }
        let fingerprints = crate::extract_fingerprints(&track.waveform, &self.config)?;
        self.insert_fingerprints(
            track.id,
            &track.title,
            track.waveform.duration_ms(),
            &fingerprints,
        )
    }

    /// Append already extracted fingerprints of a new track
    pub fn insert_fingerprints(
        &mut self,
        id: TrackId,
        title: &str,
        duration_ms: u32,
        fingerprints: &[Fingerprint],
    ) -> Result<TrackInfo> {
        if self.contains_track(id) {
            return Err(EchomarkError::DuplicateTrack(id));
        }
        let num_hashes = hash_count(fingerprints.len())?;

        for fp in fingerprints {
            self.buckets.entry(fp.hash).or_default().push(CatalogEntry {
                track_id: id,
                anchor_time: fp.anchor_time,
            });
        }

        let info = TrackInfo {
            id,
            title: title.to_string(),
            duration_ms,
            num_hashes,
        };
        self.positions.insert(id, self.tracks.len());
        self.tracks.push(info.clone());

        log::debug!(
            "Added track {} {:?}: {} hashes",
            id,
            info.title,
            info.num_hashes
        );

        Ok(info)
    }

    /// All occurrences of `hash`; empty if it never occurred
    pub fn lookup(&self, hash: u64) -> &[CatalogEntry] {
        self.buckets.get(&hash).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn config(&self) -> &FingerprintConfig {
        &self.config
    }

    pub fn tracks(&self) -> &[TrackInfo] {
        &self.tracks
    }

    pub fn track(&self, id: TrackId) -> Option<&TrackInfo> {
        self.positions.get(&id).map(|&pos| &self.tracks[pos])
    }

    pub fn contains_track(&self, id: TrackId) -> bool {
        self.positions.contains_key(&id)
    }

    pub fn num_tracks(&self) -> usize {
        self.tracks.len()
    }

    /// Number of distinct hashes
    pub fn num_hashes(&self) -> usize {
        self.buckets.len()
    }

    /// Number of entries over all buckets
    pub fn num_entries(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// Smallest id above every id in the index
    pub fn next_track_id(&self) -> TrackId {
        self.tracks.iter().map(|t| t.id + 1).max().unwrap_or(0)
    }

    pub(crate) fn buckets(&self) -> impl Iterator<Item = (&u64, &Vec<CatalogEntry>)> {
        self.buckets.iter()
    }

    /// Reassemble an index from persisted parts
    pub(crate) fn from_parts(
        config: FingerprintConfig,
        tracks: Vec<TrackInfo>,
        buckets: HashMap<u64, Vec<CatalogEntry>>,
    ) -> Result<Self> {
        config.validate()?;

        let mut positions = HashMap::with_capacity(tracks.len());
        for (pos, track) in tracks.iter().enumerate() {
            if positions.insert(track.id, pos).is_some() {
                return Err(EchomarkError::DuplicateTrack(track.id));
            }
        }

        Ok(Self {
            config,
            tracks,
            positions,
            buckets,
        })
    }
}

/// Per-track hash count as stored in the index
fn hash_count(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| {
        EchomarkError::CapacityExceeded(format!("{} fingerprints in a single track", len))
    })
}

/// An index shared between threads: many concurrent readers, one writer
#[derive(Debug, Clone)]
pub struct SharedIndex {
    inner: Arc<RwLock<CatalogIndex>>,
}

impl SharedIndex {
    pub fn new(index: CatalogIndex) -> Self {
        Self {
            inner: Arc::new(RwLock::new(index)),
        }
    }

    /// Shared access for lookups
    pub fn read(&self) -> RwLockReadGuard<'_, CatalogIndex> {
        // Readers never mutate, so a poisoned lock still guards a usable index
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CatalogIndex> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Recognize a clip; fingerprinting happens outside the lock
    pub fn recognize(&self, waveform: &Waveform, config: &MatchingConfig) -> Result<Recognition> {
        let extracted_with = self.read().config().clone();
        let fingerprints = crate::extract_fingerprints(waveform, &extracted_with)?;
        self.recognize_extracted(waveform, &extracted_with, &fingerprints, config)
    }

    /// Match fingerprints taken under `extracted_with`, re-extracting if the
    /// index was replaced with a differently configured one meanwhile
    fn recognize_extracted(
        &self,
        waveform: &Waveform,
        extracted_with: &FingerprintConfig,
        fingerprints: &[Fingerprint],
        config: &MatchingConfig,
    ) -> Result<Recognition> {
        let index = self.read();
        if index.config() != extracted_with {
            log::debug!("Index configuration changed during extraction, re-extracting query");
            return Matcher::new(&index, config).recognize(waveform);
        }
        Ok(Matcher::new(&index, config).recognize_fingerprints(fingerprints))
    }

    /// Add one track; fingerprinting happens outside the lock
    pub fn add_track(&self, track: Track) -> Result<TrackInfo> {
        let extracted_with = {
            let index = self.read();
            if index.contains_track(track.id) {
                return Err(EchomarkError::DuplicateTrack(track.id));
            }
            index.config().clone()
        };
        let fingerprints = crate::extract_fingerprints(&track.waveform, &extracted_with)?;
        self.insert_extracted(track, &extracted_with, &fingerprints)
    }

    fn insert_extracted(
        &self,
        track: Track,
        extracted_with: &FingerprintConfig,
        fingerprints: &[Fingerprint],
    ) -> Result<TrackInfo> {
        let mut index = self.write();
        if index.config() != extracted_with {
            log::debug!(
                "Index configuration changed during extraction, re-extracting track {}",
                track.id
            );
            return index.add_track(track);
        }
        index.insert_fingerprints(
            track.id,
            &track.title,
            track.waveform.duration_ms(),
            fingerprints,
        )
    }

    /// Swap in a freshly built index, returning the previous one
    pub fn replace(&self, index: CatalogIndex) -> CatalogIndex {
        std::mem::replace(&mut *self.write(), index)
    }

    /// Clone of the current index
    pub fn snapshot(&self) -> CatalogIndex {
        self.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(hash: u64, anchor_time: u32) -> Fingerprint {
        Fingerprint { hash, anchor_time }
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut index = CatalogIndex::new(FingerprintConfig::default()).unwrap();
        index
            .insert_fingerprints(3, "three", 1000, &[fp(1, 10), fp(2, 11), fp(1, 40)])
            .unwrap();
        index.insert_fingerprints(5, "five", 2000, &[fp(1, 7)]).unwrap();

        assert_eq!(
            index.lookup(1),
            &[
                CatalogEntry { track_id: 3, anchor_time: 10 },
                CatalogEntry { track_id: 3, anchor_time: 40 },
                CatalogEntry { track_id: 5, anchor_time: 7 },
            ]
        );
        assert!(index.lookup(99).is_empty());
        assert_eq!(index.num_tracks(), 2);
        assert_eq!(index.num_hashes(), 2);
        assert_eq!(index.num_entries(), 4);
        assert_eq!(index.track(3).unwrap().num_hashes, 3);
        assert_eq!(index.next_track_id(), 6);
    }

    #[test]
    fn test_duplicate_track_is_rejected() {
        let mut index = CatalogIndex::new(FingerprintConfig::default()).unwrap();
        index.insert_fingerprints(1, "a", 0, &[fp(1, 1)]).unwrap();
        let err = index.insert_fingerprints(1, "b", 0, &[fp(2, 2)]).unwrap_err();

        assert!(matches!(err, EchomarkError::DuplicateTrack(1)));
        assert!(index.lookup(2).is_empty());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = FingerprintConfig {
            hop_size: 0,
            ..FingerprintConfig::default()
        };
        assert!(matches!(
            CatalogIndex::new(config),
            Err(EchomarkError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_build_skips_unusable_tracks() {
        let config = FingerprintConfig::default();
        let tracks = vec![
            Track::new(0, "too short", Waveform::new(vec![0.1; 100], 11025)),
            Track::new(1, "silence", Waveform::new(vec![0.0; 11025], 11025)),
            Track::new(1, "duplicate", Waveform::new(vec![0.0; 11025], 11025)),
        ];
        let (index, report) = CatalogIndex::build(tracks, config).unwrap();

        assert_eq!(index.num_tracks(), 0);
        assert!(report.indexed.is_empty());
        assert_eq!(report.skipped.len(), 3);
        assert!(matches!(report.skipped[0].error, EchomarkError::DuplicateTrack(1)));
        assert!(report.skipped[1..]
            .iter()
            .all(|s| matches!(s.error, EchomarkError::InsufficientAudio(_))));
    }

    /// Percussive notes at scattered pitches, enough for a confident match
    fn melody(seed: u32, secs: f32) -> Waveform {
        let rate = 11025usize;
        let len = (secs * rate as f32) as usize;
        let note_len = rate / 4;
        let mut samples = vec![0.0f32; len];
        for (n, onset) in (0..len).step_by(rate / 5).enumerate() {
            let freq = 250.0 + ((n as u32 * 7919 + seed * 104_729) % 2600) as f32;
            let end = (onset + note_len).min(len);
            for (k, sample) in samples[onset..end].iter_mut().enumerate() {
                let t = k as f32 / rate as f32;
                *sample += 0.3 * (-t / 0.06).exp() * (2.0 * std::f32::consts::PI * freq * t).sin();
            }
        }
        Waveform::new(samples, rate as u32)
    }

    fn fine_config() -> FingerprintConfig {
        FingerprintConfig {
            hop_size: 128,
            ..FingerprintConfig::default()
        }
    }

    fn index_of(tracks: Vec<Track>, config: FingerprintConfig) -> CatalogIndex {
        let (index, report) = CatalogIndex::build(tracks, config).unwrap();
        assert!(report.is_clean(), "skipped: {:?}", report.skipped);
        index
    }

    #[test]
    fn test_replace_returns_previous_index() {
        let shared = SharedIndex::new(index_of(
            vec![Track::new(0, "old", melody(1, 6.0))],
            FingerprintConfig::default(),
        ));
        let fresh = index_of(vec![Track::new(4, "new", melody(2, 6.0))], fine_config());

        let previous = shared.replace(fresh.clone());
        assert!(previous.contains_track(0));
        assert_eq!(previous.config(), &FingerprintConfig::default());

        let snapshot = shared.snapshot();
        assert_eq!(snapshot, fresh);
        assert!(!snapshot.contains_track(0));
        assert_eq!(snapshot.config().hop_size, 128);
    }

    #[test]
    fn test_stale_query_fingerprints_are_reextracted() {
        let track = Track::new(2, "melody", melody(3, 8.0));
        // Aligned to both hop sizes
        let start = 256 * 80;
        let clip = Waveform::new(
            track.waveform.samples[start..start + 4 * 11025].to_vec(),
            11025,
        );
        let matching = MatchingConfig::default();

        let shared = SharedIndex::new(CatalogIndex::new(FingerprintConfig::default()).unwrap());
        let stale_config = shared.read().config().clone();
        let stale = crate::extract_fingerprints(&clip, &stale_config).unwrap();

        shared.replace(index_of(vec![track], fine_config()));
        let result = shared
            .recognize_extracted(&clip, &stale_config, &stale, &matching)
            .unwrap();

        let snapshot = shared.snapshot();
        let expected = Matcher::new(&snapshot, &matching).recognize(&clip).unwrap();
        assert_eq!(result, expected);
        assert_eq!(result.as_match().map(|m| m.track_id), Some(2));
    }

    #[test]
    fn test_stale_track_fingerprints_are_reextracted() {
        let track = Track::new(6, "melody", melody(5, 6.0));
        let shared = SharedIndex::new(CatalogIndex::new(FingerprintConfig::default()).unwrap());
        let stale_config = shared.read().config().clone();
        let stale = crate::extract_fingerprints(&track.waveform, &stale_config).unwrap();

        shared.replace(CatalogIndex::new(fine_config()).unwrap());
        let info = shared
            .insert_extracted(track.clone(), &stale_config, &stale)
            .unwrap();

        let fresh = crate::extract_fingerprints(&track.waveform, &fine_config()).unwrap();
        assert_eq!(info.num_hashes as usize, fresh.len());
        assert_ne!(fresh.len(), stale.len());
        assert_eq!(shared.read().track(6), Some(&info));
    }

    #[test]
    fn test_hash_count_must_fit_the_index() {
        assert_eq!(hash_count(12).unwrap(), 12);
        #[cfg(target_pointer_width = "64")]
        assert!(matches!(
            hash_count(u32::MAX as usize + 1),
            Err(EchomarkError::CapacityExceeded(_))
        ));
    }
}
