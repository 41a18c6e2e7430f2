//! Saving and loading a [`CatalogIndex`]
//!
//! The container format (header, checksum, compression) lives in the
//! `echomark-index` crate; this module maps the in-memory index onto it and
//! checks what the container cannot know about, such as the fingerprint
//! parameters and the per-track hash counts.

use crate::config::FingerprintConfig;
use crate::error::{EchomarkError, Result};
use crate::fingerprint::HashLayout;
use crate::index::{CatalogEntry, CatalogIndex, TrackInfo};
use crate::settings::IndexStorageConfig;
use echomark_index::{
    BucketRecord, Encoding, EntryRecord, IndexFile, IndexMetadata, IndexReader, IndexWriter,
    TrackRecord,
};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Snapshot an index into its persisted form
pub fn to_index_file(index: &CatalogIndex) -> Result<IndexFile> {
    let params = serde_json::to_string(index.config())
        .map_err(|e| EchomarkError::InvalidConfig(e.to_string()))?;

    let tracks = index
        .tracks()
        .iter()
        .map(|t| TrackRecord {
            id: t.id,
            title: t.title.clone(),
            duration_ms: t.duration_ms,
            num_hashes: t.num_hashes,
        })
        .collect();

    let buckets = index
        .buckets()
        .map(|(&hash, entries)| BucketRecord {
            hash,
            entries: entries
                .iter()
                .map(|e| EntryRecord {
                    track_id: e.track_id,
                    anchor_time: e.anchor_time,
                })
                .collect(),
        })
        .collect();

    let mut file = IndexFile {
        metadata: IndexMetadata::new(params),
        tracks,
        buckets,
    };
    file.normalize();
    Ok(file)
}

/// Rebuild an index from its persisted form
pub fn from_index_file(file: IndexFile) -> Result<CatalogIndex> {
    let config: FingerprintConfig = serde_json::from_str(&file.metadata.fingerprint_params)
        .map_err(|e| corrupt(format!("unreadable fingerprint parameters: {}", e)))?;
    config
        .validate()
        .map_err(|e| corrupt(format!("stored fingerprint parameters rejected: {}", e)))?;

    let layout = HashLayout::new(&config);
    let hash_bits = 2 * config.hash_freq_bits + config.hash_delta_bits;

    let mut entry_counts: HashMap<u32, u64> = HashMap::new();
    let mut buckets = HashMap::with_capacity(file.buckets.len());
    for bucket in file.buckets {
        if hash_bits < 64 && bucket.hash >> hash_bits != 0 {
            let (f1, f2, dt) = layout.decode(bucket.hash);
            return Err(corrupt(format!(
                "hash {:#x} does not fit the hash layout (decodes to {}, {}, {})",
                bucket.hash, f1, f2, dt
            )));
        }
        let entries: Vec<CatalogEntry> = bucket
            .entries
            .into_iter()
            .map(|e| {
                *entry_counts.entry(e.track_id).or_insert(0) += 1;
                CatalogEntry {
                    track_id: e.track_id,
                    anchor_time: e.anchor_time,
                }
            })
            .collect();
        buckets.insert(bucket.hash, entries);
    }

    let tracks: Vec<TrackInfo> = file
        .tracks
        .into_iter()
        .map(|t| TrackInfo {
            id: t.id,
            title: t.title,
            duration_ms: t.duration_ms,
            num_hashes: t.num_hashes,
        })
        .collect();

    for track in &tracks {
        let stored = entry_counts.get(&track.id).copied().unwrap_or(0);
        if stored != track.num_hashes as u64 {
            return Err(corrupt(format!(
                "track {} declares {} hashes but the index holds {}",
                track.id, track.num_hashes, stored
            )));
        }
    }

    CatalogIndex::from_parts(config, tracks, buckets).map_err(|e| corrupt(e.to_string()))
}

/// Encode an index into bytes
pub fn save_index(index: &CatalogIndex, encoding: Encoding) -> Result<Vec<u8>> {
    let file = to_index_file(index)?;
    Ok(IndexWriter::new(encoding).to_bytes(&file)?)
}

/// Decode an index from bytes; any inconsistency is an `IndexCorruption`
pub fn load_index(bytes: &[u8]) -> Result<CatalogIndex> {
    let file = IndexReader::from_bytes(bytes)?;
    from_index_file(file)
}

/// Write an index to disk with the configured encoding.
///
/// The file is written next to its destination and renamed into place, so
/// a failed save leaves the previous index intact.
pub fn save_index_to_path(
    index: &CatalogIndex,
    path: &Path,
    storage: &IndexStorageConfig,
) -> Result<()> {
    let file = to_index_file(index)?;
    let tmp_path = path.with_extension("tmp");
    let written = IndexWriter::new(storage.encoding())
        .with_level(storage.compression_level)
        .write(&tmp_path, &file)?;
    fs::rename(&tmp_path, path)?;

    log::info!(
        "Saved index to {} ({} tracks, {} hashes, {} bytes)",
        path.display(),
        index.num_tracks(),
        index.num_hashes(),
        written
    );
    Ok(())
}

/// Read an index from disk
pub fn load_index_from_path(path: &Path) -> Result<CatalogIndex> {
    let file = IndexReader::read(path)?;
    let index = from_index_file(file)?;

    log::info!(
        "Loaded index from {} ({} tracks, {} hashes)",
        path.display(),
        index.num_tracks(),
        index.num_hashes()
    );
    Ok(index)
}

fn corrupt(reason: String) -> EchomarkError {
    EchomarkError::IndexCorruption(reason)
}
