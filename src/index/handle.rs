//! The index handle: one open index, its write and read sessions, and the
//! indexing state machine.
//!
//! A handle owns the tantivy index for one storage path. Writes go through a
//! mutex-held writer with a commit after every document, so a reloaded reader
//! always observes the latest upsert. The Idle/Indexing state is a single
//! atomic and its transition is a compare-and-swap: concurrent batch starts
//! lose cleanly instead of racing.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, RwLock};

use serde::Serialize;
use tantivy::collector::{DocSetCollector, TopDocs};
use tantivy::directory::MmapDirectory;
use tantivy::query::{AllQuery, Query};
use tantivy::schema::Value;
use tantivy::{doc, DocAddress, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tracing::{debug, info, warn};

use crate::config::WatchedDirectory;
use crate::error::{Error, Result};
use crate::extract;
use crate::index::schema::IndexSchema;
use crate::progress::{IndexProgress, ProgressReporter};
use crate::search::highlight;
use crate::search::query::QueryBuilder;
use crate::search::results::{self, IndexedDocument, MatchedField, SearchHit};
use crate::walk::DirectoryWalker;

/// Writer heap budget.
const WRITER_HEAP_BYTES: usize = 50_000_000;

/// Upper bound on ranked hits per search.
const MAX_HITS: usize = 100;

const STATE_IDLE: u8 = 0;
const STATE_INDEXING: u8 = 1;

/// Observable state of a handle's write side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexState {
    Idle,
    Indexing,
}

/// Live sessions of an open handle. `None` after close.
struct HandleInner {
    index: Index,
    writer: Mutex<IndexWriter>,
    reader: IndexReader,
    schema: IndexSchema,
    query_builder: QueryBuilder,
}

/// One open index, identified by its canonical storage path.
pub struct IndexHandle {
    index_path: PathBuf,
    state: AtomicU8,
    inner: RwLock<Option<HandleInner>>,
}

// IndexWriter is not Debug, so the derive is unavailable.
impl fmt::Debug for IndexHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexHandle")
            .field("index_path", &self.index_path)
            .field("state", &self.state())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Resets the handle to Idle when an indexing pass ends, on every exit path.
struct IndexingGuard<'a> {
    state: &'a AtomicU8,
}

impl Drop for IndexingGuard<'_> {
    fn drop(&mut self) {
        self.state.store(STATE_IDLE, Ordering::Release);
    }
}

impl IndexHandle {
    /// Open or create the index at `index_path`.
    ///
    /// An empty index is seeded with one placeholder document and committed
    /// immediately, so a point-in-time reader can always be opened.
    pub fn open(index_path: &Path) -> Result<Self> {
        std::fs::create_dir_all(index_path)?;

        let schema = IndexSchema::new();
        let dir = MmapDirectory::open(index_path).map_err(tantivy::TantivyError::from)?;
        let index = Index::open_or_create(dir, schema.schema.clone())?;

        let mut writer: IndexWriter = index.writer(WRITER_HEAP_BYTES)?;
        let reader: IndexReader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;

        if reader.searcher().num_docs() == 0 {
            writer.add_document(TantivyDocument::new())?;
            writer.commit()?;
            reader.reload()?;
        }

        info!(path = %index_path.display(), docs = reader.searcher().num_docs(), "Opened index");

        let query_builder = QueryBuilder::new(&schema);
        Ok(Self {
            index_path: index_path.to_path_buf(),
            state: AtomicU8::new(STATE_IDLE),
            inner: RwLock::new(Some(HandleInner {
                index,
                writer: Mutex::new(writer),
                reader,
                schema,
                query_builder,
            })),
        })
    }

    /// Storage path this handle is keyed by.
    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    /// Current write-side state.
    pub fn state(&self) -> IndexState {
        if self.state.load(Ordering::Acquire) == STATE_INDEXING {
            IndexState::Indexing
        } else {
            IndexState::Idle
        }
    }

    pub fn is_closed(&self) -> bool {
        self.read_inner().is_none()
    }

    /// Win the Idle→Indexing transition or fail. The returned guard restores
    /// Idle on drop.
    fn begin_indexing(&self) -> Result<IndexingGuard<'_>> {
        self.state
            .compare_exchange(
                STATE_IDLE,
                STATE_INDEXING,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map_err(|_| Error::AlreadyIndexing)?;
        Ok(IndexingGuard { state: &self.state })
    }

    /// Batch-index every used watched directory, in input order.
    ///
    /// Fails with [`Error::AlreadyIndexing`] if another write pass holds the
    /// handle. The total file count is pre-computed with a non-mutating walk
    /// so each progress snapshot carries a meaningful denominator.
    pub fn index_directories(
        &self,
        directories: &[WatchedDirectory],
        reporter: &dyn ProgressReporter,
    ) -> Result<()> {
        // Fail before the walk: a batch over roots yielding no files must
        // still report closure rather than no-op.
        if self.is_closed() {
            return Err(Error::HandleClosed);
        }
        let _guard = self.begin_indexing()?;

        let total = Self::count_files(directories);
        info!(roots = directories.iter().filter(|d| d.used).count(), total, "Batch indexing started");

        let mut current = 0;
        for dir in directories.iter().filter(|d| d.used) {
            self.walk_and_index(Path::new(&dir.path), dir.recursive, &mut current, total, reporter)?;
        }

        info!(files = current, "Batch indexing finished");
        Ok(())
    }

    /// Count regular files across all used roots without mutating anything.
    pub fn count_files(directories: &[WatchedDirectory]) -> usize {
        directories
            .iter()
            .filter(|d| d.used)
            .map(|d| DirectoryWalker::new(&d.path, d.recursive).count_files())
            .sum()
    }

    /// Index a single root, usable standalone. Computes its own total and
    /// does not take the exclusivity guard; callers needing exclusivity must
    /// check [`IndexHandle::state`] themselves.
    pub fn index_directory(
        &self,
        root: &Path,
        recursive: bool,
        reporter: &dyn ProgressReporter,
    ) -> Result<()> {
        if self.is_closed() {
            return Err(Error::HandleClosed);
        }
        let total = DirectoryWalker::new(root, recursive).count_files();
        let mut current = 0;
        self.walk_and_index(root, recursive, &mut current, total, reporter)
    }

    fn walk_and_index(
        &self,
        root: &Path,
        recursive: bool,
        current: &mut usize,
        total: usize,
        reporter: &dyn ProgressReporter,
    ) -> Result<()> {
        for file in DirectoryWalker::new(root, recursive).files() {
            match self.index_file(&file) {
                Ok(()) => {}
                // A single file's failure must not abort the walk or skew
                // the progress accounting for the rest of the batch.
                Err(e) if e.is_per_file() => {
                    warn!(path = %file.display(), error = %e, "Skipping file");
                }
                Err(e) => return Err(e),
            }
            *current += 1;
            reporter.update(IndexProgress {
                current: *current,
                total,
                path: file,
            });
        }
        Ok(())
    }

    /// Index one file: extract its text and upsert by absolute path.
    ///
    /// The delete-by-key, add, and commit happen under one writer-lock
    /// acquisition, so a reloaded reader sees either the old document or the
    /// new one, never both. Commit-per-document trades write throughput for
    /// immediate search visibility.
    pub fn index_file(&self, path: &Path) -> Result<()> {
        let guard = self.read_inner();
        let inner = guard.as_ref().ok_or(Error::HandleClosed)?;

        let abs = path.canonicalize().map_err(|e| Error::Extraction {
            path: path.to_path_buf(),
            reason: format!("cannot resolve path: {e}"),
        })?;
        let contents = extract::extract_text(&abs)?;
        let path_str = abs.to_string_lossy().into_owned();

        let document = doc!(
            inner.schema.path_string => path_str.clone(),
            inner.schema.contents => contents,
        );

        let mut writer = lock_writer(&inner.writer);
        writer.delete_term(Term::from_field_text(inner.schema.path_string, &path_str));
        writer.add_document(document)?;
        writer.commit()?;

        debug!(path = %abs.display(), "Indexed");
        Ok(())
    }

    /// Run the dual-field OR query and return at most 100 ranked hits.
    ///
    /// Fails with [`Error::NowIndexing`] while a write pass is running. The
    /// reader is reloaded first (open-if-changed): a no-op when nothing was
    /// committed since the previous search.
    pub fn search(&self, input: &str) -> Result<Vec<SearchHit>> {
        if self.state() == IndexState::Indexing {
            return Err(Error::NowIndexing);
        }
        let guard = self.read_inner();
        let inner = guard.as_ref().ok_or(Error::HandleClosed)?;

        let query = inner.query_builder.build(input)?;
        inner.reader.reload()?;
        let searcher = inner.reader.searcher();

        let top_docs = searcher.search(&query, &TopDocs::with_limit(MAX_HITS))?;
        Ok(top_docs
            .into_iter()
            .map(|(score, address)| SearchHit { address, score })
            .collect())
    }

    /// Fetch the stored fields of a hit.
    pub fn get_document(&self, address: DocAddress) -> Result<IndexedDocument> {
        let guard = self.read_inner();
        let inner = guard.as_ref().ok_or(Error::HandleClosed)?;

        let searcher = inner.reader.searcher();
        let doc: TantivyDocument = searcher.doc(address)?;
        Ok(results::to_indexed_document(&doc, &inner.schema))
    }

    /// Scoring rationale for a hit against the given query, as pretty JSON.
    pub fn get_explanation(&self, address: DocAddress, input: &str) -> Result<String> {
        let guard = self.read_inner();
        let inner = guard.as_ref().ok_or(Error::HandleClosed)?;

        let query = inner.query_builder.build(input)?;
        let searcher = inner.reader.searcher();
        let explanation = query.explain(&searcher, address)?;
        Ok(explanation.to_pretty_json())
    }

    /// Probe each stored field with its own single-field wildcard query and
    /// report the first one that matches, path first.
    pub fn matched_field(&self, address: DocAddress, input: &str) -> Result<Option<MatchedField>> {
        let guard = self.read_inner();
        let inner = guard.as_ref().ok_or(Error::HandleClosed)?;
        let searcher = inner.reader.searcher();

        let path_query = inner.query_builder.path_probe(input)?;
        if path_query.explain(&searcher, address).is_ok() {
            return Ok(Some(MatchedField::Path));
        }

        let contents_query = inner.query_builder.contents_probe(input)?;
        if contents_query.explain(&searcher, address).is_ok() {
            return Ok(Some(MatchedField::Contents));
        }

        Ok(None)
    }

    /// Best-effort highlighted preview for a hit. Never empty: falls back
    /// from contents fragments to path fragments to a plain prefix.
    pub fn highlight(&self, address: DocAddress, input: &str) -> Result<String> {
        let terms = QueryBuilder::terms(input);
        if terms.is_empty() {
            return Err(Error::InvalidQuery("empty query".to_string()));
        }
        let document = self.get_document(address)?;
        Ok(highlight::build_preview(
            &document.contents,
            &document.path,
            &terms,
        ))
    }

    /// Term → total-frequency mapping for a hit's contents.
    pub fn term_frequencies(&self, address: DocAddress) -> Result<BTreeMap<String, u64>> {
        let guard = self.read_inner();
        let inner = guard.as_ref().ok_or(Error::HandleClosed)?;

        let searcher = inner.reader.searcher();
        let doc: TantivyDocument = searcher.doc(address)?;
        let contents = doc
            .get_first(inner.schema.contents)
            .and_then(|v| v.as_str())
            .unwrap_or("");

        let analyzer = inner.index.tokenizer_for_field(inner.schema.contents)?;
        Ok(results::term_frequencies(analyzer, contents))
    }

    /// Delete every indexed document whose file no longer exists on disk.
    ///
    /// Reconciles deletions and moves that bypassed the indexer; this is an
    /// on-demand sweep, not a filesystem watch. Takes the same exclusivity
    /// guard as batch indexing since it shares the writer.
    pub fn garbage_collect(&self) -> Result<usize> {
        let _guard = self.begin_indexing()?;
        let guard = self.read_inner();
        let inner = guard.as_ref().ok_or(Error::HandleClosed)?;

        inner.reader.reload()?;
        let searcher = inner.reader.searcher();
        let addresses = searcher.search(&AllQuery, &DocSetCollector)?;

        let mut stale: Vec<String> = Vec::new();
        for address in addresses {
            let doc: TantivyDocument = searcher.doc(address)?;
            // The seeded placeholder has no path field and is skipped.
            if let Some(path) = doc.get_first(inner.schema.path_string).and_then(|v| v.as_str()) {
                if !Path::new(path).exists() {
                    stale.push(path.to_string());
                }
            }
        }

        if !stale.is_empty() {
            let mut writer = lock_writer(&inner.writer);
            for path in &stale {
                debug!(path = %path, "Purging stale document");
                writer.delete_term(Term::from_field_text(inner.schema.path_string, path));
            }
            writer.commit()?;
        }

        info!(removed = stale.len(), "Garbage collection finished");
        Ok(stale.len())
    }

    /// Number of live indexed files (the placeholder document is excluded).
    pub fn live_documents(&self) -> Result<usize> {
        let guard = self.read_inner();
        let inner = guard.as_ref().ok_or(Error::HandleClosed)?;

        inner.reader.reload()?;
        let searcher = inner.reader.searcher();
        let addresses = searcher.search(&AllQuery, &DocSetCollector)?;

        let mut count = 0;
        for address in addresses {
            let doc: TantivyDocument = searcher.doc(address)?;
            if doc.get_first(inner.schema.path_string).is_some() {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Release write/read sessions and storage. Every later call on this
    /// handle fails with [`Error::HandleClosed`], including a second close.
    pub fn close(&self) -> Result<()> {
        let mut guard = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let inner = guard.take().ok_or(Error::HandleClosed)?;

        let HandleInner { writer, .. } = inner;
        let writer = writer
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        writer.wait_merging_threads()?;

        info!(path = %self.index_path.display(), "Closed index handle");
        Ok(())
    }

    fn read_inner(&self) -> std::sync::RwLockReadGuard<'_, Option<HandleInner>> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn lock_writer(writer: &Mutex<IndexWriter>) -> std::sync::MutexGuard<'_, IndexWriter> {
    writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
