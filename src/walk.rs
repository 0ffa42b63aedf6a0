//! Directory walking for the indexer.
//!
//! Enumerates regular files under a root, either across the whole tree or
//! only the root's direct children. Visitation order is whatever the
//! underlying traversal yields; nothing downstream may assume sorting.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Enumerates regular files under a single root.
#[derive(Debug, Clone)]
pub struct DirectoryWalker {
    root: PathBuf,
    recursive: bool,
}

impl DirectoryWalker {
    pub fn new(root: impl Into<PathBuf>, recursive: bool) -> Self {
        Self {
            root: root.into(),
            recursive,
        }
    }

    /// Iterate over every regular file under the root. A root that is not a
    /// directory yields nothing. Unreadable entries are logged and skipped.
    pub fn files(&self) -> impl Iterator<Item = PathBuf> {
        let walker = if self.root.is_dir() {
            let mut walk = WalkDir::new(&self.root);
            if !self.recursive {
                walk = walk.max_depth(1);
            }
            Some(walk.into_iter())
        } else {
            tracing::debug!(root = %self.root.display(), "Walk root is not a directory, skipping");
            None
        };

        walker
            .into_iter()
            .flatten()
            .filter_map(|entry| match entry {
                Ok(entry) if entry.file_type().is_file() => Some(entry.path().to_path_buf()),
                Ok(_) => None,
                Err(e) => {
                    tracing::debug!(error = %e, "Error walking directory");
                    None
                }
            })
    }

    /// Count regular files under the root without touching the index.
    /// Used to pre-compute batch progress totals.
    pub fn count_files(&self) -> usize {
        self.files().count()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
