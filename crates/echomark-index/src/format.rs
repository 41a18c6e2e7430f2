//! Index file format structures

use crate::error::{FormatError, Result};
use serde::{Deserialize, Serialize};

/// Magic bytes for index files: "EMIX"
pub const MAGIC: [u8; 4] = [0x45, 0x4D, 0x49, 0x58];

/// Current format version
pub const VERSION: u16 = 1;

/// Fixed header size in bytes
pub const HEADER_SIZE: usize = 48;

/// Algorithm identifier stored in the metadata section
pub const ALGORITHM_ID: &str = "ECHOMARK";

/// Header flag: payload is zstd-compressed
pub const FLAG_COMPRESSED: u16 = 0x1;

/// File header (48 bytes, little-endian)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexHeader {
    /// Magic bytes: "EMIX"
    pub magic: [u8; 4],
    /// Format version
    pub version: u16,
    /// Flags (bit 0: compressed)
    pub flags: u16,
    /// Size of the bincode payload before compression
    pub payload_size: u64,
    /// Size of the payload as stored after the header
    pub stored_size: u64,
    /// Number of tracks
    pub num_tracks: u32,
    /// Number of distinct hashes
    pub num_hashes: u32,
    /// Number of catalog entries over all buckets
    pub num_entries: u64,
    /// CRC-64 (ECMA-182) of the stored payload
    pub checksum: u64,
}

impl IndexHeader {
    pub fn new(file: &IndexFile) -> Result<Self> {
        Ok(Self {
            magic: MAGIC,
            version: VERSION,
            flags: 0,
            payload_size: 0,
            stored_size: 0,
            num_tracks: count_u32("tracks", file.tracks.len())?,
            num_hashes: count_u32("hashes", file.buckets.len())?,
            num_entries: file.num_entries(),
            checksum: 0,
        })
    }

    pub fn is_compressed(&self) -> bool {
        (self.flags & FLAG_COMPRESSED) != 0
    }

    pub fn set_compressed(&mut self, compressed: bool) {
        if compressed {
            self.flags |= FLAG_COMPRESSED;
        } else {
            self.flags &= !FLAG_COMPRESSED;
        }
    }
}

/// Narrow a count to a 32-bit header field
pub(crate) fn count_u32(what: &str, len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| {
        FormatError::Inconsistent(format!("{} {} exceed the 32-bit header field", len, what))
    })
}

/// Metadata section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMetadata {
    /// Algorithm ID (e.g., "ECHOMARK")
    pub algorithm_id: String,
    /// Fingerprint parameters the index was built with (JSON)
    pub fingerprint_params: String,
    /// Creation time, RFC 3339
    pub created_at: String,
}

impl IndexMetadata {
    pub fn new(fingerprint_params: String) -> Self {
        Self {
            algorithm_id: ALGORITHM_ID.to_string(),
            fingerprint_params,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// One reference track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub id: u32,
    pub title: String,
    pub duration_ms: u32,
    pub num_hashes: u32,
}

/// Occurrence of a hash inside a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRecord {
    pub track_id: u32,
    pub anchor_time: u32,
}

/// All occurrences of one hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketRecord {
    pub hash: u64,
    pub entries: Vec<EntryRecord>,
}

/// Complete index file structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexFile {
    pub metadata: IndexMetadata,
    /// Tracks in insertion order
    pub tracks: Vec<TrackRecord>,
    /// Buckets sorted by hash
    pub buckets: Vec<BucketRecord>,
}

impl IndexFile {
    /// Total number of entries over all buckets
    pub fn num_entries(&self) -> u64 {
        self.buckets.iter().map(|b| b.entries.len() as u64).sum()
    }

    /// Sort buckets by hash so equal indexes serialize identically
    pub fn normalize(&mut self) {
        self.buckets.sort_unstable_by_key(|b| b.hash);
    }
}
