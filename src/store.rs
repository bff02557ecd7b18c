//! Persistent key-value store backing the note workspace.
//!
//! Wraps a directory of JSON files, one file per key, behind typed
//! `read`/`write` operations. Both directions fail soft: a missing or
//! corrupted entry yields the caller-supplied fallback, and a write failure
//! is logged without surfacing an error, so a save failure never crashes an
//! editing session. Written values are cached in memory; an optional file
//! system watcher evicts cache entries when another process modifies them.

use std::{
    collections::HashMap,
    fs,
    io::Write,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use log::{debug, error, info, trace, warn};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::{de::DeserializeOwned, Serialize};
use tempfile::NamedTempFile;

use crate::{PadError, Result};

/// Directory-of-JSON-files key-value store with cache-on-write.
pub struct KeyValueStore {
    /// Directory holding one `<key>.json` file per entry
    dir: PathBuf,

    /// In-memory cache of raw JSON strings, filled on write and on read
    cache: Arc<Mutex<HashMap<String, String>>>,

    /// File system watcher evicting cache entries on external changes
    watcher: Option<RecommendedWatcher>,
}

impl KeyValueStore {
    /// Opens (and creates if necessary) the store directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();

        if !dir.exists() {
            debug!("Store directory does not exist, creating: {}", dir.display());
            fs::create_dir_all(&dir).map_err(|e| {
                error!("Failed to create store directory: {}", e);
                PadError::DirectoryError { path: dir.clone() }
            })?;
        }

        Ok(Self {
            dir,
            cache: Arc::new(Mutex::new(HashMap::new())),
            watcher: None,
        })
    }

    /// Path of the JSON file backing `key`.
    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    /// Reads the value stored under `key`, returning `fallback` when the
    /// entry is missing, unreadable, or fails to parse. Never raises.
    pub fn read<T: DeserializeOwned>(&self, key: &str, fallback: T) -> T {
        if let Ok(cache) = self.cache.lock() {
            if let Some(raw) = cache.get(key) {
                match serde_json::from_str(raw) {
                    Ok(value) => {
                        trace!("Store read (cache hit): {}", key);
                        return value;
                    }
                    Err(e) => {
                        warn!("Cached entry for {} failed to parse: {}", key, e);
                        // Fall through to the file copy
                    }
                }
            }
        }

        let path = self.entry_path(key);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) => {
                debug!("No stored entry for {} ({}), using fallback", key, e);
                return fallback;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                if let Ok(mut cache) = self.cache.lock() {
                    cache.insert(key.to_string(), raw);
                }
                trace!("Store read (disk): {}", key);
                value
            }
            Err(e) => {
                warn!(
                    "Stored entry {} is corrupted ({}), using fallback",
                    path.display(),
                    e
                );
                fallback
            }
        }
    }

    /// Writes `value` under `key`. Serialization or I/O failures are logged
    /// and swallowed; the in-memory cache keeps the value either way, so the
    /// session continues with possible loss of durability, not a crash.
    pub fn write<T: Serialize>(&self, key: &str, value: &T) {
        let raw = match serde_json::to_string_pretty(value) {
            Ok(raw) => raw,
            Err(e) => {
                error!("Failed to serialize entry {}: {}", key, e);
                return;
            }
        };

        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(key.to_string(), raw.clone());
        }

        if let Err(e) = self.persist_entry(key, &raw) {
            error!("Failed to persist entry {}: {}", key, e);
        }
    }

    /// Atomically replaces the file backing `key` via a temp file rename.
    fn persist_entry(&self, key: &str, raw: &str) -> Result<()> {
        let path = self.entry_path(key);
        let dir = path.parent().unwrap_or_else(|| Path::new("."));

        let mut temp_file = NamedTempFile::new_in(dir)?;
        temp_file.write_all(raw.as_bytes())?;
        temp_file.flush()?;
        temp_file.persist(&path).map_err(|e| PadError::Io(e.error))?;

        trace!("Store write: {} -> {}", key, path.display());
        Ok(())
    }

    /// Drops the cached copy of `key` so the next read goes back to disk.
    pub fn invalidate(&self, key: &str) {
        if let Ok(mut cache) = self.cache.lock() {
            if cache.remove(key).is_some() {
                debug!("Evicted cached entry: {}", key);
            }
        }
    }

    /// Starts watching the store directory, evicting cached entries whose
    /// backing file is changed or removed by another process.
    pub fn watch(&mut self) -> Result<()> {
        if self.watcher.is_some() {
            debug!("Store watcher already initialized");
            return Ok(());
        }

        let cache = Arc::clone(&self.cache);
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => handle_fs_event(event, &cache),
                Err(e) => error!("Store watcher error: {}", e),
            }
        })
        .map_err(|e| PadError::ApplicationError {
            message: format!("Failed to create store watcher: {}", e),
        })?;

        watcher
            .watch(self.dir.as_ref(), RecursiveMode::NonRecursive)
            .map_err(|e| PadError::ApplicationError {
                message: format!("Failed to watch store directory: {}", e),
            })?;

        self.watcher = Some(watcher);
        info!("Store watcher initialized for {}", self.dir.display());
        Ok(())
    }

    /// The directory backing this store.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Handles a file system event by evicting the affected cache entries.
fn handle_fs_event(event: notify::Event, cache: &Arc<Mutex<HashMap<String, String>>>) {
    match event.kind {
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => {
            for path in event.paths {
                if path.extension().is_some_and(|ext| ext == "json") {
                    if let Some(file_stem) = path.file_stem() {
                        let key = file_stem.to_string_lossy().to_string();
                        if let Ok(mut cache) = cache.lock() {
                            if cache.remove(&key).is_some() {
                                debug!("Evicted {} after external change", key);
                            }
                        }
                    }
                }
            }
        }
        _ => {
            // Ignore other events
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn read_missing_entry_returns_fallback() {
        let dir = tempdir().unwrap();
        let store = KeyValueStore::open(dir.path()).unwrap();

        let value: Vec<String> = store.read("absent", vec!["fallback".to_string()]);
        assert_eq!(value, vec!["fallback".to_string()]);
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempdir().unwrap();
        let store = KeyValueStore::open(dir.path()).unwrap();

        store.write("numbers", &vec![1, 2, 3]);
        let value: Vec<i32> = store.read("numbers", Vec::new());
        assert_eq!(value, vec![1, 2, 3]);
    }

    #[test]
    fn written_value_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = KeyValueStore::open(dir.path()).unwrap();
            store.write("greeting", &"hello".to_string());
        }

        let store = KeyValueStore::open(dir.path()).unwrap();
        let value: String = store.read("greeting", String::new());
        assert_eq!(value, "hello");
    }

    #[test]
    fn corrupted_entry_returns_fallback_without_raising() {
        let dir = tempdir().unwrap();
        let store = KeyValueStore::open(dir.path()).unwrap();

        fs::write(store.entry_path("broken"), "{not json at all").unwrap();
        let value: i64 = store.read("broken", 42);
        assert_eq!(value, 42);
    }

    #[test]
    fn invalidate_forces_reread_from_disk() {
        let dir = tempdir().unwrap();
        let store = KeyValueStore::open(dir.path()).unwrap();

        store.write("counter", &1);
        // Simulate another process replacing the entry behind our back
        fs::write(store.entry_path("counter"), "2").unwrap();

        // Cache still serves the written value until evicted
        assert_eq!(store.read("counter", 0), 1);
        store.invalidate("counter");
        assert_eq!(store.read("counter", 0), 2);
    }
}
