//! End-to-end tests for the indexing and search core.
//!
//! These tests build real on-disk indexes in temp directories, run batch
//! indexing over real files, and validate search, highlighting, state
//! exclusivity and garbage collection against the public API.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use deskfind::{
    Error, IndexHandle, IndexProgress, IndexRegistry, IndexState, MatchedField, NullReporter,
    ProgressReporter, WatchedDirectory,
};
use tempfile::TempDir;

const RECIPE_FILE: &str = "\
Grilled salmon with lemon butter.
Season the fillet, grill four minutes per side, finish with butter.
";

const MEETING_FILE: &str = "\
Quarterly planning meeting notes.
Action items: update the bootloader documentation, review budget.
";

const TODO_FILE: &str = "\
- buy groceries
- call the dentist
- renew passport
";

struct TestContext {
    registry: IndexRegistry,
    handle: Arc<IndexHandle>,
    docs_dir: PathBuf,
    _temp_dir: TempDir, // keep alive for test duration
}

/// Create an index over a docs directory populated with the three fixtures.
fn setup() -> TestContext {
    let temp_dir = TempDir::new().unwrap();
    let docs_dir = temp_dir.path().join("docs");
    fs::create_dir_all(&docs_dir).unwrap();
    fs::write(docs_dir.join("recipe.txt"), RECIPE_FILE).unwrap();
    fs::write(docs_dir.join("meeting.md"), MEETING_FILE).unwrap();
    fs::write(docs_dir.join("todo.txt"), TODO_FILE).unwrap();

    let registry = IndexRegistry::new();
    let handle = registry.get(&temp_dir.path().join("index")).unwrap();

    TestContext {
        registry,
        handle,
        docs_dir,
        _temp_dir: temp_dir,
    }
}

fn watched(ctx: &TestContext) -> Vec<WatchedDirectory> {
    vec![WatchedDirectory::new(
        ctx.docs_dir.to_string_lossy().to_string(),
    )]
}

fn index_all(ctx: &TestContext) {
    ctx.handle
        .index_directories(&watched(ctx), &NullReporter)
        .unwrap();
}

#[test]
fn test_batch_index_and_search_contents() {
    let ctx = setup();
    index_all(&ctx);

    let hits = ctx.handle.search("salmon").unwrap();
    assert_eq!(hits.len(), 1);

    let doc = ctx.handle.get_document(hits[0].address).unwrap();
    assert!(doc.path.ends_with("recipe.txt"));
    assert!(doc.contents.contains("Grilled salmon"));
}

#[test]
fn test_search_matches_path_or_contents() {
    let ctx = setup();
    index_all(&ctx);

    // "bootloader" appears only in contents, "todo" only in a path
    let by_contents = ctx.handle.search("bootloader").unwrap();
    assert_eq!(by_contents.len(), 1);
    assert_eq!(
        ctx.handle
            .matched_field(by_contents[0].address, "bootloader")
            .unwrap(),
        Some(MatchedField::Contents)
    );

    let by_path = ctx.handle.search("todo").unwrap();
    assert_eq!(by_path.len(), 1);
    assert_eq!(
        ctx.handle.matched_field(by_path[0].address, "todo").unwrap(),
        Some(MatchedField::Path)
    );
}

#[test]
fn test_one_term_hits_by_path_and_by_contents() {
    let temp_dir = TempDir::new().unwrap();
    let docs = temp_dir.path().join("docs");
    fs::create_dir_all(&docs).unwrap();
    fs::write(docs.join("bootloader.txt"), "boot sequence overview").unwrap();
    fs::write(docs.join("guide.txt"), "how to flash the bootloader").unwrap();

    let registry = IndexRegistry::new();
    let handle = registry.get(&temp_dir.path().join("index")).unwrap();
    handle
        .index_directories(
            &[WatchedDirectory::new(docs.to_string_lossy().to_string())],
            &NullReporter,
        )
        .unwrap();

    let hits = handle.search("bootloader").unwrap();
    assert_eq!(hits.len(), 2);
}

#[test]
fn test_multi_term_query_is_union() {
    let ctx = setup();
    index_all(&ctx);

    let hits = ctx.handle.search("salmon passport").unwrap();
    assert_eq!(hits.len(), 2);
}

#[test]
fn test_search_is_case_insensitive_on_contents() {
    let ctx = setup();
    index_all(&ctx);

    assert_eq!(ctx.handle.search("SALMON").unwrap().len(), 1);
    assert_eq!(ctx.handle.search("Quarterly").unwrap().len(), 1);
}

#[test]
fn test_empty_query_is_rejected() {
    let ctx = setup();
    index_all(&ctx);

    assert!(matches!(
        ctx.handle.search("   "),
        Err(Error::InvalidQuery(_))
    ));
}

#[test]
fn test_reindexing_is_idempotent() {
    let ctx = setup();
    index_all(&ctx);
    index_all(&ctx);
    index_all(&ctx);

    assert_eq!(ctx.handle.live_documents().unwrap(), 3);
    assert_eq!(ctx.handle.search("salmon").unwrap().len(), 1);
}

#[test]
fn test_updated_file_is_visible_after_reindex() {
    let ctx = setup();
    index_all(&ctx);

    fs::write(ctx.docs_dir.join("todo.txt"), "- water the hydrangeas\n").unwrap();
    index_all(&ctx);

    assert_eq!(ctx.handle.live_documents().unwrap(), 3);
    assert_eq!(ctx.handle.search("hydrangeas").unwrap().len(), 1);
    assert!(ctx.handle.search("passport").unwrap().is_empty());
}

#[test]
fn test_garbage_collect_removes_deleted_files() {
    let ctx = setup();
    index_all(&ctx);

    fs::remove_file(ctx.docs_dir.join("recipe.txt")).unwrap();
    let removed = ctx.handle.garbage_collect().unwrap();

    assert_eq!(removed, 1);
    assert_eq!(ctx.handle.live_documents().unwrap(), 2);
    assert!(ctx.handle.search("salmon").unwrap().is_empty());
    assert_eq!(ctx.handle.state(), IndexState::Idle);
}

#[test]
fn test_garbage_collect_with_nothing_stale() {
    let ctx = setup();
    index_all(&ctx);

    assert_eq!(ctx.handle.garbage_collect().unwrap(), 0);
    assert_eq!(ctx.handle.live_documents().unwrap(), 3);
}

#[test]
fn test_highlight_contents_match() {
    let ctx = setup();
    index_all(&ctx);

    let hits = ctx.handle.search("salmon").unwrap();
    let preview = ctx.handle.highlight(hits[0].address, "salmon").unwrap();
    assert!(preview.contains("<b>salmon</b>"));
}

#[test]
fn test_highlight_falls_back_to_path() {
    let ctx = setup();
    index_all(&ctx);

    // "todo" appears only in the path, so the preview marks the path and
    // still shows the start of the contents
    let hits = ctx.handle.search("todo").unwrap();
    let preview = ctx.handle.highlight(hits[0].address, "todo").unwrap();
    assert!(preview.contains("<b>todo</b>"));
    assert!(!preview.is_empty());
}

#[test]
fn test_highlight_never_empty() {
    let ctx = setup();
    index_all(&ctx);

    // a term that appears nowhere in this document still yields a preview
    let hits = ctx.handle.search("salmon").unwrap();
    let preview = ctx.handle.highlight(hits[0].address, "zzzzz").unwrap();
    assert!(!preview.is_empty());
}

#[test]
fn test_explanation_is_produced_for_hits() {
    let ctx = setup();
    index_all(&ctx);

    let hits = ctx.handle.search("salmon").unwrap();
    let explanation = ctx
        .handle
        .get_explanation(hits[0].address, "salmon")
        .unwrap();
    assert!(explanation.contains("value"));
}

#[test]
fn test_term_frequencies() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("fruit.txt");
    fs::write(&file, "apple banana apple cherry apple banana").unwrap();

    let registry = IndexRegistry::new();
    let handle = registry.get(&temp_dir.path().join("index")).unwrap();
    handle.index_file(&file).unwrap();

    let hits = handle.search("apple").unwrap();
    let frequencies = handle.term_frequencies(hits[0].address).unwrap();

    assert_eq!(frequencies.get("apple"), Some(&3));
    assert_eq!(frequencies.get("banana"), Some(&2));
    assert_eq!(frequencies.get("cherry"), Some(&1));
}

#[test]
fn test_shallow_directory_skips_subdirectories() {
    let temp_dir = TempDir::new().unwrap();
    let docs = temp_dir.path().join("docs");
    let nested = docs.join("nested");
    fs::create_dir_all(&nested).unwrap();
    fs::write(docs.join("top.txt"), "surface").unwrap();
    fs::write(nested.join("deep.txt"), "buried").unwrap();

    let registry = IndexRegistry::new();
    let handle = registry.get(&temp_dir.path().join("index")).unwrap();
    let dirs = vec![WatchedDirectory::shallow(
        docs.to_string_lossy().to_string(),
    )];
    handle.index_directories(&dirs, &NullReporter).unwrap();

    assert_eq!(handle.search("surface").unwrap().len(), 1);
    assert!(handle.search("buried").unwrap().is_empty());
}

#[test]
fn test_transcoded_file_is_searchable() {
    let temp_dir = TempDir::new().unwrap();
    let docs = temp_dir.path().join("docs");
    fs::create_dir_all(&docs).unwrap();

    let (encoded, _, _) = encoding_rs::SHIFT_JIS.encode("検索エンジン hello world");
    fs::write(docs.join("sjis.txt"), &*encoded).unwrap();

    let registry = IndexRegistry::new();
    let handle = registry.get(&temp_dir.path().join("index")).unwrap();
    handle
        .index_directories(
            &[WatchedDirectory::new(docs.to_string_lossy().to_string())],
            &NullReporter,
        )
        .unwrap();

    assert_eq!(handle.search("検索エンジン").unwrap().len(), 1);
    assert_eq!(handle.search("hello").unwrap().len(), 1);
}

/// Progress reporter that records every snapshot it receives.
struct RecordingReporter {
    snapshots: Mutex<Vec<IndexProgress>>,
}

impl ProgressReporter for RecordingReporter {
    fn update(&self, progress: IndexProgress) {
        self.snapshots.lock().unwrap().push(progress);
    }
}

#[test]
fn test_progress_snapshots_cover_every_file() {
    let ctx = setup();
    let reporter = RecordingReporter {
        snapshots: Mutex::new(Vec::new()),
    };
    ctx.handle
        .index_directories(&watched(&ctx), &reporter)
        .unwrap();

    let snapshots = reporter.snapshots.into_inner().unwrap();
    assert_eq!(snapshots.len(), 3);
    assert!(snapshots.iter().all(|s| s.total == 3));
    assert_eq!(
        snapshots.iter().map(|s| s.current).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert!(snapshots.last().unwrap().path.exists());
}

/// Progress reporter that re-enters the handle mid-batch, observing the
/// state machine from inside a running indexing pass.
struct ReentrantReporter {
    handle: Arc<IndexHandle>,
    search_errors: Mutex<Vec<Error>>,
    batch_errors: Mutex<Vec<Error>>,
}

impl ProgressReporter for ReentrantReporter {
    fn update(&self, _progress: IndexProgress) {
        if let Err(e) = self.handle.search("anything") {
            self.search_errors.lock().unwrap().push(e);
        }
        if let Err(e) = self.handle.index_directories(&[], &NullReporter) {
            self.batch_errors.lock().unwrap().push(e);
        }
    }
}

#[test]
fn test_searches_and_batches_are_rejected_while_indexing() {
    let ctx = setup();
    let reporter = ReentrantReporter {
        handle: ctx.handle.clone(),
        search_errors: Mutex::new(Vec::new()),
        batch_errors: Mutex::new(Vec::new()),
    };
    ctx.handle
        .index_directories(&watched(&ctx), &reporter)
        .unwrap();

    let search_errors = reporter.search_errors.into_inner().unwrap();
    assert_eq!(search_errors.len(), 3);
    assert!(search_errors.iter().all(|e| matches!(e, Error::NowIndexing)));

    let batch_errors = reporter.batch_errors.into_inner().unwrap();
    assert_eq!(batch_errors.len(), 3);
    assert!(batch_errors
        .iter()
        .all(|e| matches!(e, Error::AlreadyIndexing)));

    // and afterwards the handle is usable again
    assert_eq!(ctx.handle.state(), IndexState::Idle);
    assert_eq!(ctx.handle.search("salmon").unwrap().len(), 1);
}

#[test]
fn test_registry_reuses_and_reopens_handles() {
    let temp_dir = TempDir::new().unwrap();
    let registry = IndexRegistry::new();
    let index_path = temp_dir.path().join("index");

    let first = registry.get(&index_path).unwrap();
    let again = registry.get(&index_path).unwrap();
    assert!(Arc::ptr_eq(&first, &again));

    registry.close(&index_path).unwrap();
    assert!(first.is_closed());

    // a fresh handle over the same storage sees the persisted documents
    let file = temp_dir.path().join("note.txt");
    fs::write(&file, "persistent data").unwrap();
    let reopened = registry.get(&index_path).unwrap();
    assert!(!Arc::ptr_eq(&first, &reopened));
    reopened.index_file(&file).unwrap();

    registry.close(&index_path).unwrap();
    let third = registry.get(&index_path).unwrap();
    assert_eq!(third.search("persistent").unwrap().len(), 1);
}

#[test]
fn test_unwritable_storage_location_is_rejected() {
    let registry = IndexRegistry::new();
    let err = registry
        .get(Path::new("/this-parent-does-not-exist/index"))
        .unwrap_err();
    assert!(matches!(err, Error::Configuration { .. }));
    assert!(registry.is_empty());
}

#[test]
fn test_closed_handle_rejects_everything() {
    let ctx = setup();
    index_all(&ctx);
    ctx.registry.close_all().unwrap();

    assert!(ctx.handle.is_closed());
    assert!(matches!(
        ctx.handle.search("salmon"),
        Err(Error::HandleClosed)
    ));
    assert!(matches!(
        ctx.handle.index_directories(&watched(&ctx), &NullReporter),
        Err(Error::HandleClosed)
    ));
    assert!(matches!(
        ctx.handle.garbage_collect(),
        Err(Error::HandleClosed)
    ));

    // even a batch over an empty root must report closure, not no-op
    let empty = ctx._temp_dir.path().join("empty");
    fs::create_dir_all(&empty).unwrap();
    assert!(matches!(
        ctx.handle.index_directories(
            &[WatchedDirectory::new(empty.to_string_lossy().to_string())],
            &NullReporter,
        ),
        Err(Error::HandleClosed)
    ));
    assert!(matches!(
        ctx.handle.index_directory(&empty, true, &NullReporter),
        Err(Error::HandleClosed)
    ));
}

#[test]
fn test_binary_files_are_skipped_not_fatal() {
    let ctx = setup();
    fs::write(ctx.docs_dir.join("image.bin"), [0u8, 216, 255, 0, 1]).unwrap();
    index_all(&ctx);

    // three text fixtures indexed, the binary skipped
    assert_eq!(ctx.handle.live_documents().unwrap(), 3);
}
