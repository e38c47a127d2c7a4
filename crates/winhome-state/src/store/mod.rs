//! JSON-file backed state store.

use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::error::StateError;

/// Tracing target for state persistence.
const STATE_TARGET: &str = "winhome_state::store";

/// Set of managed item identifiers persisted as a JSON array.
///
/// All methods take `&self`; the cache and file writes are serialised behind
/// one mutex so [`StateStore::mark_applied`] may be called from worker
/// threads.
///
/// # Example
///
/// ```no_run
/// use winhome_state::StateStore;
///
/// let store = StateStore::new("winhome.state.json");
/// store.mark_applied("winget:Git.Git")?;
/// assert!(store.load().contains("winget:Git.Git"));
/// # Ok::<(), winhome_state::StateError>(())
/// ```
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    cache: Mutex<Option<BTreeSet<String>>>,
}

impl StateStore {
    /// Creates a store backed by `path`. Nothing is read until first use.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Mutex::new(None),
        }
    }

    /// Backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the state file and refreshes the cache.
    ///
    /// A missing file yields an empty set. A file that is not a JSON array of
    /// strings is logged and also yields an empty set.
    #[must_use]
    pub fn load(&self) -> BTreeSet<String> {
        let items = read_state(&self.path);
        *self.lock() = Some(items.clone());
        items
    }

    /// Replaces the stored set with `items` and flushes it to disk.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] when the file cannot be written.
    pub fn save(&self, items: &BTreeSet<String>) -> Result<(), StateError> {
        let mut cache = self.lock();
        write_state(&self.path, items)?;
        *cache = Some(items.clone());
        info!(
            target: STATE_TARGET,
            path = %self.path.display(),
            items = items.len(),
            "state saved"
        );
        Ok(())
    }

    /// Adds `item` and persists immediately unless it is already recorded.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] when the file cannot be written. The cache is
    /// left unchanged in that case.
    pub fn mark_applied(&self, item: &str) -> Result<(), StateError> {
        let mut cache = self.lock();
        let items = cache.get_or_insert_with(|| read_state(&self.path));
        if items.contains(item) {
            return Ok(());
        }
        let mut next = items.clone();
        next.insert(item.to_owned());
        write_state(&self.path, &next)?;
        *items = next;
        debug!(target: STATE_TARGET, item, "marked applied");
        Ok(())
    }

    /// Recorded identifiers in sorted order.
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        let mut cache = self.lock();
        cache
            .get_or_insert_with(|| read_state(&self.path))
            .iter()
            .cloned()
            .collect()
    }

    /// Copies the state file to `destination`.
    ///
    /// When no state file exists yet an empty array is written instead.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Copy`] when the copy fails.
    pub fn backup(&self, destination: &Path) -> Result<(), StateError> {
        let _cache = self.lock();
        if self.path.exists() {
            fs::copy(&self.path, destination).map_err(|source| StateError::Copy {
                from: self.path.clone(),
                to: destination.to_path_buf(),
                source: Arc::new(source),
            })?;
        } else {
            write_state(destination, &BTreeSet::new())?;
        }
        info!(
            target: STATE_TARGET,
            backup = %destination.display(),
            "state backed up"
        );
        Ok(())
    }

    /// Replaces the state file with `source` and reloads the cache.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::MissingBackup`] when `source` does not exist and
    /// [`StateError::Copy`] when the copy fails.
    pub fn restore(&self, source: &Path) -> Result<(), StateError> {
        if !source.is_file() {
            return Err(StateError::MissingBackup {
                path: source.to_path_buf(),
            });
        }
        let mut cache = self.lock();
        fs::copy(source, &self.path).map_err(|error| StateError::Copy {
            from: source.to_path_buf(),
            to: self.path.clone(),
            source: Arc::new(error),
        })?;
        let items = read_state(&self.path);
        info!(
            target: STATE_TARGET,
            backup = %source.display(),
            items = items.len(),
            "state restored"
        );
        *cache = Some(items);
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Option<BTreeSet<String>>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn read_state(path: &Path) -> BTreeSet<String> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return BTreeSet::new(),
        Err(error) => {
            warn!(
                target: STATE_TARGET,
                path = %path.display(),
                %error,
                "state file unreadable, starting from empty state"
            );
            return BTreeSet::new();
        }
    };
    if text.trim().is_empty() {
        return BTreeSet::new();
    }
    match serde_json::from_str::<BTreeSet<String>>(&text) {
        Ok(items) => items,
        Err(error) => {
            warn!(
                target: STATE_TARGET,
                path = %path.display(),
                %error,
                "state file is corrupt, starting from empty state"
            );
            BTreeSet::new()
        }
    }
}

/// Writes `items` through a temporary sibling file renamed into place.
fn write_state(path: &Path, items: &BTreeSet<String>) -> Result<(), StateError> {
    let body = serde_json::to_string_pretty(items).map_err(|error| StateError::Serialize {
        message: error.to_string(),
    })?;

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|error| StateError::write(path, error))?;

    let mut temp_file =
        tempfile::NamedTempFile::new_in(parent).map_err(|error| StateError::write(path, error))?;
    temp_file
        .write_all(body.as_bytes())
        .and_then(|()| temp_file.write_all(b"\n"))
        .and_then(|()| temp_file.as_file().sync_all())
        .map_err(|error| StateError::write(path, error))?;
    temp_file
        .persist(path)
        .map_err(|error| StateError::write(path, error.error))?;
    Ok(())
}

#[cfg(test)]
mod tests;
