// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use crate::error::{BotError, Result};
use crate::models::WatchPosition;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};

/// On-disk shape: `{ "<user id>": { "movieId": ..., "serverIndex": ..., "episodeIndex": ... } }`
pub type HistoryData = BTreeMap<String, WatchPosition>;

/// Last watched position per user, flushed to a JSON file on every write.
#[derive(Debug)]
pub struct HistoryStore {
    path: PathBuf,
    entries: Mutex<HistoryData>,
}

impl HistoryStore {
    /// Load the history file. A missing or unreadable file starts empty.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match Self::read_file(&path) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(
                    "Ignoring unreadable watch history {}: {:#}",
                    path.display(),
                    e
                );
                HistoryData::new()
            }
        };

        debug!(
            "Loaded {} watch positions from {}",
            entries.len(),
            path.display()
        );

        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    fn read_file(path: &Path) -> anyhow::Result<HistoryData> {
        use anyhow::Context;

        if !path.exists() {
            return Ok(HistoryData::new());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read history file: {}", path.display()))?;

        let data: HistoryData =
            serde_json::from_str(&content).with_context(|| "Failed to parse history JSON")?;

        Ok(data)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Overwrite the user's position and rewrite the whole file.
    ///
    /// When the flush fails the previous position is restored, so memory
    /// never gets ahead of what is on disk.
    pub fn record(&self, user_id: &str, position: WatchPosition) -> Result<()> {
        let mut entries = self.lock();
        let previous = entries.insert(user_id.to_string(), position);

        if let Err(err) = self.flush(&entries) {
            match previous {
                Some(previous) => {
                    entries.insert(user_id.to_string(), previous);
                }
                None => {
                    entries.remove(user_id);
                }
            }
            return Err(err);
        }

        Ok(())
    }

    pub fn resume(&self, user_id: &str) -> Option<WatchPosition> {
        self.lock().get(user_id).cloned()
    }

    pub fn snapshot(&self) -> HistoryData {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HistoryData> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn flush(&self, entries: &HistoryData) -> Result<()> {
        let content = serde_json::to_string_pretty(entries)
            .map_err(|e| BotError::PersistenceFailure(format!("serialize: {}", e)))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    BotError::PersistenceFailure(format!(
                        "create {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        // Write beside the target and rename so a crash keeps the last good file
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, content).map_err(|e| {
            BotError::PersistenceFailure(format!("write {}: {}", tmp_path.display(), e))
        })?;
        fs::rename(&tmp_path, &self.path).map_err(|e| {
            BotError::PersistenceFailure(format!("replace {}: {}", self.path.display(), e))
        })?;

        debug!(
            "Flushed {} watch positions to {}",
            entries.len(),
            self.path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::load(dir.path().join("watch_history.json"));
        assert!(store.is_empty());
        assert!(store.resume("42").is_none());
    }

    #[test]
    fn test_corrupt_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watch_history.json");
        fs::write(&path, "{ not json").unwrap();

        let store = HistoryStore::load(&path);
        assert!(store.is_empty());
    }

    #[test]
    fn test_record_then_resume() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::load(dir.path().join("watch_history.json"));

        store.record("42", WatchPosition::new("M", 0, 3)).unwrap();
        assert_eq!(store.resume("42"), Some(WatchPosition::new("M", 0, 3)));
        assert!(store.resume("43").is_none());
    }

    #[test]
    fn test_record_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::load(dir.path().join("watch_history.json"));

        store.record("42", WatchPosition::new("M", 0, 3)).unwrap();
        store.record("42", WatchPosition::new("N", 1, 7)).unwrap();
        store.record("42", WatchPosition::new("N", 1, 7)).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.resume("42"), Some(WatchPosition::new("N", 1, 7)));
    }

    #[test]
    fn test_persisted_format_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("watch_history.json");
        let store = HistoryStore::load(&path);
        store.record("42", WatchPosition::new("tay-du-ky", 1, 4)).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(
            raw,
            serde_json::json!({
                "42": {"movieId": "tay-du-ky", "serverIndex": 1, "episodeIndex": 4}
            })
        );
        assert!(!path.with_extension("json.tmp").exists());

        let reloaded = HistoryStore::load(&path);
        assert_eq!(
            reloaded.resume("42"),
            Some(WatchPosition::new("tay-du-ky", 1, 4))
        );
    }

    #[test]
    fn test_flush_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be makes the rename fail
        let path = dir.path().join("watch_history.json");
        fs::create_dir_all(path.join("occupied")).unwrap();

        let store = HistoryStore::load(&path);
        let err = store.record("1", WatchPosition::new("M", 0, 0)).unwrap_err();
        assert!(matches!(err, BotError::PersistenceFailure(_)));
        assert!(err.is_durability_concern());
        // nothing was saved, so nothing is remembered
        assert!(store.resume("1").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_flush_failure_keeps_previous_position() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watch_history.json");
        let store = HistoryStore::load(&path);
        store.record("1", WatchPosition::new("M", 0, 1)).unwrap();

        fs::remove_file(&path).unwrap();
        fs::create_dir_all(path.join("occupied")).unwrap();

        let err = store.record("1", WatchPosition::new("M", 0, 5)).unwrap_err();
        assert!(matches!(err, BotError::PersistenceFailure(_)));
        assert_eq!(store.resume("1"), Some(WatchPosition::new("M", 0, 1)));
    }
}
