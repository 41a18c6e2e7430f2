//! Index file reader

use crate::error::{FormatError, Result};
use crate::format::{IndexFile, IndexHeader, ALGORITHM_ID, HEADER_SIZE, MAGIC, VERSION};
use crate::writer::CRC64;
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

pub struct IndexReader;

impl IndexReader {
    /// Read an index file from disk
    pub fn read(path: &Path) -> Result<IndexFile> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// Decode an index file, binary or JSON
    pub fn from_bytes(bytes: &[u8]) -> Result<IndexFile> {
        let index_file = if looks_like_json(bytes) {
            serde_json::from_slice::<IndexFile>(bytes)?
        } else {
            Self::decode_binary(bytes)?
        };

        validate(&index_file)?;

        Ok(index_file)
    }

    fn decode_binary(bytes: &[u8]) -> Result<IndexFile> {
        if bytes.len() < HEADER_SIZE {
            return Err(FormatError::Truncated {
                expected: HEADER_SIZE,
                actual: bytes.len(),
            });
        }

        let mut reader = &bytes[..HEADER_SIZE];
        let header = Self::read_header(&mut reader)?;

        if header.magic != MAGIC {
            return Err(FormatError::BadMagic(header.magic));
        }
        if header.version != VERSION {
            return Err(FormatError::UnsupportedVersion(header.version));
        }

        let stored = &bytes[HEADER_SIZE..];
        if stored.len() as u64 != header.stored_size {
            return Err(FormatError::SizeMismatch {
                expected: header.stored_size,
                actual: stored.len() as u64,
            });
        }

        let checksum = CRC64.checksum(stored);
        if checksum != header.checksum {
            return Err(FormatError::ChecksumMismatch {
                expected: header.checksum,
                actual: checksum,
            });
        }

        let payload = if header.is_compressed() {
            zstd::decode_all(stored).map_err(FormatError::Decompress)?
        } else {
            stored.to_vec()
        };
        if payload.len() as u64 != header.payload_size {
            return Err(FormatError::SizeMismatch {
                expected: header.payload_size,
                actual: payload.len() as u64,
            });
        }

        let index_file: IndexFile = bincode::deserialize(&payload)?;

        if index_file.tracks.len() as u64 != header.num_tracks as u64
            || index_file.buckets.len() as u64 != header.num_hashes as u64
            || index_file.num_entries() != header.num_entries
        {
            return Err(FormatError::Inconsistent(format!(
                "header counts ({} tracks, {} hashes, {} entries) \
                 disagree with payload ({}, {}, {})",
                header.num_tracks,
                header.num_hashes,
                header.num_entries,
                index_file.tracks.len(),
                index_file.buckets.len(),
                index_file.num_entries()
            )));
        }

        Ok(index_file)
    }

    fn read_header<R: Read>(reader: &mut R) -> Result<IndexHeader> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;

        let version = Self::read_u16(reader)?;
        let flags = Self::read_u16(reader)?;
        let payload_size = Self::read_u64(reader)?;
        let stored_size = Self::read_u64(reader)?;
        let num_tracks = Self::read_u32(reader)?;
        let num_hashes = Self::read_u32(reader)?;
        let num_entries = Self::read_u64(reader)?;
        let checksum = Self::read_u64(reader)?;

        Ok(IndexHeader {
            magic,
            version,
            flags,
            payload_size,
            stored_size,
            num_tracks,
            num_hashes,
            num_entries,
            checksum,
        })
    }

    fn read_u16<R: Read>(reader: &mut R) -> Result<u16> {
        let mut buf = [0u8; 2];
        reader.read_exact(&mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    fn read_u32<R: Read>(reader: &mut R) -> Result<u32> {
        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    fn read_u64<R: Read>(reader: &mut R) -> Result<u64> {
        let mut buf = [0u8; 8];
        reader.read_exact(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }
}

fn looks_like_json(bytes: &[u8]) -> bool {
    bytes
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .map(|&b| b == b'{')
        .unwrap_or(false)
}

/// Structural checks shared by both encodings
fn validate(index_file: &IndexFile) -> Result<()> {
    if index_file.metadata.algorithm_id != ALGORITHM_ID {
        return Err(FormatError::Inconsistent(format!(
            "unknown algorithm id {:?}",
            index_file.metadata.algorithm_id
        )));
    }

    let mut track_ids = HashSet::with_capacity(index_file.tracks.len());
    for track in &index_file.tracks {
        if !track_ids.insert(track.id) {
            return Err(FormatError::Inconsistent(format!(
                "track id {} appears twice",
                track.id
            )));
        }
    }

    let mut hashes = HashSet::with_capacity(index_file.buckets.len());
    for bucket in &index_file.buckets {
        if !hashes.insert(bucket.hash) {
            return Err(FormatError::Inconsistent(format!(
                "hash {:#x} appears in two buckets",
                bucket.hash
            )));
        }
        if bucket.entries.is_empty() {
            return Err(FormatError::Inconsistent(format!(
                "hash {:#x} has an empty bucket",
                bucket.hash
            )));
        }
        if let Some(entry) = bucket
            .entries
            .iter()
            .find(|e| !track_ids.contains(&e.track_id))
        {
            return Err(FormatError::Inconsistent(format!(
                "hash {:#x} references unknown track {}",
                bucket.hash, entry.track_id
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{BucketRecord, EntryRecord, IndexMetadata, TrackRecord};
    use crate::writer::{Encoding, IndexWriter};

    fn sample_file() -> IndexFile {
        IndexFile {
            metadata: IndexMetadata::new(r#"{"window_size":1024}"#.to_string()),
            tracks: vec![
                TrackRecord { id: 0, title: "first".into(), duration_ms: 1000, num_hashes: 2 },
                TrackRecord { id: 1, title: "second".into(), duration_ms: 2000, num_hashes: 1 },
            ],
            buckets: vec![
                BucketRecord {
                    hash: 42,
                    entries: vec![
                        EntryRecord { track_id: 0, anchor_time: 3 },
                        EntryRecord { track_id: 1, anchor_time: 9 },
                    ],
                },
                BucketRecord {
                    hash: 7,
                    entries: vec![EntryRecord { track_id: 0, anchor_time: 11 }],
                },
            ],
        }
    }

    #[test]
    fn test_binary_round_trip() {
        let mut original = sample_file();
        for encoding in [
            Encoding::Binary { compress: false },
            Encoding::Binary { compress: true },
            Encoding::Json,
        ] {
            let bytes = IndexWriter::new(encoding).to_bytes(&original).unwrap();
            let decoded = IndexReader::from_bytes(&bytes).unwrap();
            original.normalize();
            assert_eq!(decoded, original, "encoding {:?}", encoding);
        }
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.emix");
        let mut original = sample_file();

        let written = IndexWriter::default().write(&path, &original).unwrap();
        assert_eq!(written, std::fs::metadata(&path).unwrap().len());

        original.normalize();
        assert_eq!(IndexReader::read(&path).unwrap(), original);

        let err = IndexReader::read(&dir.path().join("absent.emix")).unwrap_err();
        assert!(matches!(err, FormatError::Io(_)));
    }

    #[test]
    fn test_flipped_byte_is_rejected() {
        let mut bytes = IndexWriter::new(Encoding::Binary { compress: false })
            .to_bytes(&sample_file())
            .unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;

        let err = IndexReader::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, FormatError::ChecksumMismatch { .. }));
    }

    #[test]
    fn test_truncated_and_bad_magic() {
        let bytes = IndexWriter::default().to_bytes(&sample_file()).unwrap();

        let err = IndexReader::from_bytes(&bytes[..20]).unwrap_err();
        assert!(matches!(err, FormatError::Truncated { .. }));

        let err = IndexReader::from_bytes(&bytes[..bytes.len() - 4]).unwrap_err();
        assert!(matches!(err, FormatError::SizeMismatch { .. }));

        let mut bad = bytes.clone();
        bad[0] = b'X';
        let err = IndexReader::from_bytes(&bad).unwrap_err();
        assert!(matches!(err, FormatError::BadMagic(_)));
    }

    #[test]
    fn test_dangling_track_reference() {
        let mut file = sample_file();
        file.buckets[0].entries.push(EntryRecord { track_id: 99, anchor_time: 0 });
        let bytes = IndexWriter::new(Encoding::Json).to_bytes(&file).unwrap();

        let err = IndexReader::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, FormatError::Inconsistent(_)));
    }
}
