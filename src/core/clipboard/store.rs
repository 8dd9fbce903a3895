//! Durable storage for the clipboard history
//!
//! The history is stored as one JSON array. Saves rewrite the whole file
//! through a temp file + rename so a crash mid-write never truncates it.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::shared::errors::{EngineError, EngineResult};
use crate::shared::types::Entry;

/// Storage trait for clipboard history persistence
pub trait HistoryStore: Send + Sync {
    /// Absent storage loads as an empty history. Undecodable data is an
    /// `EngineError::CorruptHistory`.
    fn load(&self) -> EngineResult<Vec<Entry>>;
    fn save(&self, entries: &[Entry]) -> EngineResult<()>;
}

/// JSON file storage at a fixed per-user path
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn sibling_path(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(suffix);
        self.path.with_file_name(name)
    }

    fn temp_path(&self) -> PathBuf {
        self.sibling_path(".tmp")
    }

    /// Where an undecodable history file is moved before starting over
    pub fn corrupt_backup_path(&self) -> PathBuf {
        self.sibling_path(".corrupt")
    }
}

impl HistoryStore for JsonFileStore {
    fn load(&self) -> EngineResult<Vec<Entry>> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(EngineError::Io(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        serde_json::from_slice(&data).map_err(|e| {
            // Keep the unreadable file so the next save cannot destroy it
            let backup = self.corrupt_backup_path();
            let kept = match fs::rename(&self.path, &backup) {
                Ok(()) => format!("moved to {}", backup.display()),
                Err(err) => format!("backup failed: {}", err),
            };
            EngineError::CorruptHistory(format!("{}: {} ({})", self.path.display(), e, kept))
        })
    }

    fn save(&self, entries: &[Entry]) -> EngineResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    EngineError::Io(format!("Failed to create data directory: {}", e))
                })?;
            }
        }

        let data = serde_json::to_vec_pretty(entries)?;
        let tmp = self.temp_path();

        let write_tmp = || -> std::io::Result<()> {
            let mut file = File::create(&tmp)?;
            file.write_all(&data)?;
            file.sync_all()
        };
        if let Err(e) = write_tmp() {
            let _ = fs::remove_file(&tmp);
            return Err(EngineError::Io(format!("Failed to write {}: {}", tmp.display(), e)));
        }

        fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            EngineError::Io(format!("Failed to replace {}: {}", self.path.display(), e))
        })?;

        tracing::debug!(path = %self.path.display(), count = entries.len(), "history saved");
        Ok(())
    }
}

/// In-memory storage, used when no durable location is available
#[derive(Default)]
pub struct InMemoryStore {
    entries: Mutex<Vec<Entry>>,
    saves: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with pre-existing entries, as if loaded from disk
    pub fn with_entries(entries: Vec<Entry>) -> Self {
        Self {
            entries: Mutex::new(entries),
            saves: AtomicUsize::new(0),
        }
    }

    /// Number of successful `save` calls so far
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl HistoryStore for InMemoryStore {
    fn load(&self) -> EngineResult<Vec<Entry>> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| EngineError::Io(format!("Mutex poisoned: {}", e)))?;
        Ok(entries.clone())
    }

    fn save(&self, entries: &[Entry]) -> EngineResult<()> {
        let mut stored = self
            .entries
            .lock()
            .map_err(|e| EngineError::Io(format!("Mutex poisoned: {}", e)))?;
        *stored = entries.to_vec();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Entry> {
        vec![
            Entry::with_pin("pinned".to_string(), true),
            Entry::new_text("second".to_string()),
            Entry::new_text("third\nline".to_string()),
        ]
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("history.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("history.json"));
        let entries = sample();

        store.save(&entries).unwrap();
        assert_eq!(store.load().unwrap(), entries);
    }

    #[test]
    fn test_save_overwrites_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".history.json");
        let store = JsonFileStore::new(&path);

        store.save(&sample()).unwrap();
        store.save(&[]).unwrap();

        assert!(store.load().unwrap().is_empty());
        assert!(!dir.path().join(".history.json.tmp").exists());
    }

    #[test]
    fn test_malformed_file_is_corrupt_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, b"{ not json").unwrap();

        let store = JsonFileStore::new(&path);
        assert!(matches!(store.load(), Err(EngineError::CorruptHistory(_))));
        assert!(!path.exists());
        assert_eq!(fs::read(store.corrupt_backup_path()).unwrap(), b"{ not json");
    }

    #[test]
    fn test_epoch_timestamps_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        fs::write(
            &path,
            r#"[
                {"id": "1", "content": "keep me", "createdAt": 1714557600, "pinned": true},
                {"id": "2", "content": "older", "createdAt": 1714550000.25, "pinned": false}
            ]"#,
        )
        .unwrap();

        let entries = JsonFileStore::new(&path).load().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].content, "keep me");
        assert!(entries[0].pinned);
        assert_eq!(entries[0].created_at.timestamp(), 1_714_557_600);
        assert_eq!(entries[1].created_at.timestamp(), 1_714_550_000);
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("a").join("b").join("history.json"));
        store.save(&sample()).unwrap();
        assert_eq!(store.load().unwrap().len(), 3);
    }

    #[test]
    fn test_save_onto_directory_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be makes the rename fail
        let path = dir.path().join("history.json");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), b"x").unwrap();

        let store = JsonFileStore::new(&path);
        assert!(matches!(store.save(&sample()), Err(EngineError::Io(_))));
    }

    #[test]
    fn test_in_memory_store_counts_saves() {
        let store = InMemoryStore::new();
        assert_eq!(store.save_count(), 0);
        store.save(&sample()).unwrap();
        assert_eq!(store.save_count(), 1);
        assert_eq!(store.load().unwrap().len(), 3);
    }
}
