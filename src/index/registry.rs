//! Process-wide registry of open index handles, keyed by canonical storage
//! path.
//!
//! The map lock is held only to look up or insert an entry cell; the actual
//! open happens inside the entry's `OnceCell`, so concurrent opens of the
//! same path collapse into one while opens of distinct paths proceed in
//! parallel.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use once_cell::sync::OnceCell;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::index::handle::IndexHandle;

type HandleCell = Arc<OnceCell<Arc<IndexHandle>>>;

#[derive(Default)]
pub struct IndexRegistry {
    handles: RwLock<HashMap<PathBuf, HandleCell>>,
}

impl IndexRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the handle for `index_path`, opening it on first use.
    ///
    /// The path is normalized before keying, so spellings that resolve to
    /// the same directory share one handle. A storage location whose parent
    /// is missing or not writable is rejected before tantivy touches it.
    pub fn get(&self, index_path: &Path) -> Result<Arc<IndexHandle>> {
        let key = Self::normalize(index_path)?;

        let cell = {
            let mut handles = self.write_map();
            handles.entry(key.clone()).or_default().clone()
        };

        let result = cell.get_or_try_init(|| {
            debug!(path = %key.display(), "Opening index handle");
            IndexHandle::open(&key).map(Arc::new)
        });

        match result {
            Ok(handle) => Ok(handle.clone()),
            Err(e) => {
                // Drop the failed cell so a later attempt can retry the open.
                let mut handles = self.write_map();
                if let Some(existing) = handles.get(&key) {
                    if existing.get().is_none() {
                        handles.remove(&key);
                    }
                }
                Err(e)
            }
        }
    }

    /// Close and deregister the handle at `index_path`, if open.
    pub fn close(&self, index_path: &Path) -> Result<bool> {
        let key = Self::normalize(index_path)?;

        let cell = self.write_map().remove(&key);
        match cell.and_then(|c| c.get().cloned()) {
            Some(handle) => {
                handle.close()?;
                info!(path = %key.display(), "Deregistered index handle");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Close every open handle. The first close failure is returned after
    /// all handles have been attempted.
    pub fn close_all(&self) -> Result<()> {
        let cells: Vec<HandleCell> = {
            let mut handles = self.write_map();
            handles.drain().map(|(_, cell)| cell).collect()
        };

        let mut first_err = None;
        for cell in cells {
            if let Some(handle) = cell.get() {
                if let Err(e) = handle.close() {
                    first_err.get_or_insert(e);
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Number of registered storage paths.
    pub fn len(&self) -> usize {
        self.read_map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_map().is_empty()
    }

    /// Canonicalize the parent (which must exist and be writable) and
    /// re-attach the final component, which may not exist yet.
    fn normalize(index_path: &Path) -> Result<PathBuf> {
        let configuration_error = || Error::Configuration {
            path: index_path.to_path_buf(),
        };

        let parent = index_path.parent().ok_or_else(configuration_error)?;
        let parent = if parent.as_os_str().is_empty() {
            Path::new(".")
        } else {
            parent
        };
        let canonical_parent = parent.canonicalize().map_err(|_| configuration_error())?;

        let metadata = canonical_parent
            .metadata()
            .map_err(|_| configuration_error())?;
        if metadata.permissions().readonly() {
            return Err(configuration_error());
        }

        match index_path.file_name() {
            Some(name) => Ok(canonical_parent.join(name)),
            None => Ok(canonical_parent),
        }
    }

    fn read_map(&self) -> std::sync::RwLockReadGuard<'_, HashMap<PathBuf, HandleCell>> {
        self.handles
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_map(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<PathBuf, HandleCell>> {
        self.handles
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
