//! Index file writer

use crate::error::Result;
use crate::format::{IndexFile, IndexHeader};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// CRC used for the payload checksum
pub(crate) const CRC64: crc::Crc<u64> = crc::Crc::<u64>::new(&crc::CRC_64_ECMA_182);

/// Output encoding of an index file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Header + bincode payload, optionally zstd-compressed
    Binary { compress: bool },
    /// Pretty-printed JSON of the whole `IndexFile`
    Json,
}

impl Default for Encoding {
    fn default() -> Self {
        Encoding::Binary { compress: true }
    }
}

pub struct IndexWriter {
    encoding: Encoding,
    level: i32,
}

impl IndexWriter {
    pub fn new(encoding: Encoding) -> Self {
        Self { encoding, level: 3 }
    }

    /// Set the zstd compression level
    pub fn with_level(mut self, level: i32) -> Self {
        self.level = level;
        self
    }

    /// Encode an index file into bytes
    pub fn to_bytes(&self, index_file: &IndexFile) -> Result<Vec<u8>> {
        let mut index_file = index_file.clone();
        index_file.normalize();

        match self.encoding {
            Encoding::Json => Ok(serde_json::to_vec_pretty(&index_file)?),
            Encoding::Binary { compress } => self.encode_binary(&index_file, compress),
        }
    }

    /// Write an index file to disk, returning the number of bytes written
    pub fn write(&self, path: &Path, index_file: &IndexFile) -> Result<u64> {
        let bytes = self.to_bytes(index_file)?;

        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(&bytes)?;
        writer.flush()?;

        Ok(bytes.len() as u64)
    }

    fn encode_binary(&self, index_file: &IndexFile, compress: bool) -> Result<Vec<u8>> {
        let payload = bincode::serialize(index_file)?;

        let mut header = IndexHeader::new(index_file)?;
        header.payload_size = payload.len() as u64;
        header.set_compressed(compress);

        let stored = if compress {
            zstd::encode_all(&payload[..], self.level)?
        } else {
            payload
        };
        header.stored_size = stored.len() as u64;
        header.checksum = CRC64.checksum(&stored);

        let mut out = Vec::with_capacity(crate::format::HEADER_SIZE + stored.len());
        write_header(&mut out, &header)?;
        out.extend_from_slice(&stored);

        Ok(out)
    }
}

impl Default for IndexWriter {
    fn default() -> Self {
        Self::new(Encoding::default())
    }
}

fn write_header<W: Write>(writer: &mut W, header: &IndexHeader) -> Result<()> {
    writer.write_all(&header.magic)?;
    writer.write_all(&header.version.to_le_bytes())?;
    writer.write_all(&header.flags.to_le_bytes())?;
    writer.write_all(&header.payload_size.to_le_bytes())?;
    writer.write_all(&header.stored_size.to_le_bytes())?;
    writer.write_all(&header.num_tracks.to_le_bytes())?;
    writer.write_all(&header.num_hashes.to_le_bytes())?;
    writer.write_all(&header.num_entries.to_le_bytes())?;
    writer.write_all(&header.checksum.to_le_bytes())?;

    Ok(())
}
