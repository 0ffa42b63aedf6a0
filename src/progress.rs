//! Progress reporting for batch indexing.
//!
//! The indexer hands the reporter an owned snapshot per visited file, on the
//! indexing thread itself. Reporters must not block materially.

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::PathBuf;

/// Snapshot of batch progress at one visited file.
#[derive(Debug, Clone, Serialize)]
pub struct IndexProgress {
    /// Files visited so far, including the one in `path`.
    pub current: usize,
    /// Total regular files discovered by the pre-count walk.
    pub total: usize,
    /// File just processed.
    pub path: PathBuf,
}

/// Receives indexing progress callbacks. Rendering (UI, log, push channel)
/// lives behind this seam.
pub trait ProgressReporter: Send + Sync {
    fn update(&self, progress: IndexProgress);
}

/// Discards all progress updates.
pub struct NullReporter;

impl ProgressReporter for NullReporter {
    fn update(&self, _progress: IndexProgress) {}
}

/// Terminal progress bar reporter.
pub struct TerminalReporter {
    bar: ProgressBar,
}

impl TerminalReporter {
    /// The bar starts with length 0; the first snapshot sizes it.
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta})")
                .unwrap()
                .progress_chars("█▓░"),
        );
        Self { bar }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for TerminalReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for TerminalReporter {
    fn update(&self, progress: IndexProgress) {
        self.bar.set_length(progress.total as u64);
        self.bar.set_position(progress.current as u64);
        if let Some(name) = progress.path.file_name() {
            self.bar.set_message(name.to_string_lossy().to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recording(Mutex<Vec<(usize, usize)>>);

    impl ProgressReporter for Recording {
        fn update(&self, progress: IndexProgress) {
            self.0.lock().unwrap().push((progress.current, progress.total));
        }
    }

    #[test]
    fn test_snapshot_carries_counts() {
        let reporter = Recording(Mutex::new(Vec::new()));
        reporter.update(IndexProgress {
            current: 1,
            total: 3,
            path: PathBuf::from("/tmp/a.txt"),
        });
        reporter.update(IndexProgress {
            current: 2,
            total: 3,
            path: PathBuf::from("/tmp/b.txt"),
        });

        let seen = reporter.0.lock().unwrap();
        assert_eq!(*seen, vec![(1, 3), (2, 3)]);
    }

    #[test]
    fn test_terminal_reporter_sizes_bar_from_snapshot() {
        let reporter = TerminalReporter::new();
        reporter.update(IndexProgress {
            current: 2,
            total: 7,
            path: PathBuf::from("/tmp/a.txt"),
        });

        assert_eq!(reporter.bar.length(), Some(7));
        assert_eq!(reporter.bar.position(), 2);
    }
}
