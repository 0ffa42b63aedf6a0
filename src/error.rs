//! Error taxonomy for the indexing and search core.

use std::path::PathBuf;
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The index storage location is unusable: the parent directory is
    /// missing or not writable.
    #[error("invalid index location {path}: parent directory missing or not writable")]
    Configuration { path: PathBuf },

    /// A batch index (or garbage collection) was requested while another
    /// write pass holds the handle.
    #[error("indexing already in progress")]
    AlreadyIndexing,

    /// A search was requested while the handle is indexing. Partial results
    /// during a write burst are disallowed.
    #[error("search unavailable while indexing is in progress")]
    NowIndexing,

    /// Text extraction failed for a single file. Batch indexing surfaces
    /// this per file without aborting the rest of the walk.
    #[error("failed to extract text from {path}: {reason}")]
    Extraction { path: PathBuf, reason: String },

    /// Operation on a handle after `close()`.
    #[error("index handle is closed")]
    HandleClosed,

    /// The query text could not be turned into an executable query.
    /// Practically unreachable for escaped non-empty input.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error(transparent)]
    Index(#[from] tantivy::TantivyError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error concerns a single file rather than the index as a
    /// whole. Batch indexing skips past these.
    pub fn is_per_file(&self) -> bool {
        matches!(self, Error::Extraction { .. })
    }
}
