//! Echomark index file format library

pub mod error;
pub mod format;
pub mod reader;
pub mod writer;

pub use error::FormatError;
pub use format::{
    BucketRecord, EntryRecord, IndexFile, IndexHeader, IndexMetadata, TrackRecord, ALGORITHM_ID,
    HEADER_SIZE, MAGIC, VERSION,
};
pub use reader::IndexReader;
pub use writer::{Encoding, IndexWriter};
