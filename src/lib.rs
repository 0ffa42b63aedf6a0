//! deskfind: a local document indexing and search core.
//!
//! Watched directories are walked, their files' text extracted and stored in
//! a tantivy index, and queried with a dual-field scheme: infix wildcard on
//! the whole path, prefix wildcard on content terms. One process-wide
//! registry hands out a single handle per index storage path; each handle
//! enforces an Idle/Indexing state machine so searches never observe a
//! half-written batch.

pub mod config;
pub mod error;
pub mod extract;
pub mod index;
pub mod progress;
pub mod search;
pub mod walk;

pub use config::{Config, IndexConfig, WatchedDirectory};
pub use error::{Error, Result};
pub use index::{IndexHandle, IndexRegistry, IndexState};
pub use progress::{IndexProgress, NullReporter, ProgressReporter, TerminalReporter};
pub use search::{IndexedDocument, MatchedField, SearchHit};
pub use walk::DirectoryWalker;
