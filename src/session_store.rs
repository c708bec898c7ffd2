//! Durable session identity.
//!
//! The saved session is three independent string entries in a key/value
//! store. The store never interprets the values; it only refuses to save
//! empty ones and reports "no session" when any entry is missing.

use derive_getters::Getters;
use derive_more::{Display, Error};
use derive_new::new;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Storage key for the player id.
pub const PLAYER_ID_KEY: &str = "mahjong_player_id";
/// Storage key for the room id.
pub const ROOM_ID_KEY: &str = "mahjong_room_id";
/// Storage key for the display name.
pub const PLAYER_NAME_KEY: &str = "mahjong_player_name";

/// Identity needed to rejoin a room after a restart.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize, new)]
pub struct SessionRecord {
    /// Server-assigned or client-generated player id.
    #[new(into)]
    player_id: String,
    /// Room the player joined.
    #[new(into)]
    room_id: String,
    /// Display name chosen at join time.
    #[new(into)]
    player_name: String,
}

/// Storage error with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("Storage error: {} at {}:{}", message, file, line)]
pub struct StorageError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl StorageError {
    /// Creates a new storage error with caller location tracking.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

impl From<std::io::Error> for StorageError {
    #[track_caller]
    fn from(err: std::io::Error) -> Self {
        Self::new(format!("I/O error: {}", err))
    }
}

impl From<serde_json::Error> for StorageError {
    #[track_caller]
    fn from(err: serde_json::Error) -> Self {
        Self::new(format!("Serialization error: {}", err))
    }
}

/// String key/value storage backend.
pub trait KeyValueStorage: Send + Sync {
    /// Reads a value. Unreadable storage is reported as absent.
    fn get(&self, key: &str) -> Option<String>;

    /// Writes a value.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes a value. Removing a missing key succeeds.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-memory storage, lost when dropped.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StorageError::new("Memory storage lock poisoned"))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StorageError::new("Memory storage lock poisoned"))?;
        entries.remove(key);
        Ok(())
    }
}

/// Storage backed by a JSON object in a single file.
///
/// A missing or corrupt file reads as empty. Every write rewrites the file.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    /// Creates a store at `path`. The file is created on first write.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> BTreeMap<String, String> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
            Err(e) => {
                warn!(error = %e, path = %self.path.display(), "Cannot read storage file");
                return BTreeMap::new();
            }
        };
        serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!(error = %e, path = %self.path.display(), "Storage file is corrupt, treating as empty");
            BTreeMap::new()
        })
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    fn update(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, String>),
    ) -> Result<(), StorageError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| StorageError::new("File storage lock poisoned"))?;
        let mut entries = self.read_all();
        f(&mut entries);
        self.write_all(&entries)
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        let _guard = self.lock.lock().ok()?;
        self.read_all().remove(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        if !self.path.exists() {
            return Ok(());
        }
        self.update(|entries| {
            entries.remove(key);
        })
    }
}

/// Saves, loads and clears the session identity.
#[derive(Debug)]
pub struct SessionStore<S> {
    storage: S,
}

impl<S: KeyValueStorage> SessionStore<S> {
    /// Wraps a storage backend.
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Returns the backend.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Persists the record. Empty fields are rejected and nothing is written.
    #[instrument(skip(self, record), fields(player_id = %record.player_id, room_id = %record.room_id))]
    pub fn save(&self, record: &SessionRecord) -> Result<(), StorageError> {
        let entries = [
            (PLAYER_ID_KEY, &record.player_id),
            (ROOM_ID_KEY, &record.room_id),
            (PLAYER_NAME_KEY, &record.player_name),
        ];
        if let Some((key, _)) = entries.iter().find(|(_, value)| value.is_empty()) {
            return Err(StorageError::new(format!("Refusing to save empty {}", key)));
        }
        for (key, value) in entries {
            self.storage.set(key, value)?;
        }
        info!("Session saved");
        Ok(())
    }

    /// Returns the saved record, or `None` if any entry is missing or empty.
    #[instrument(skip(self))]
    pub fn load(&self) -> Option<SessionRecord> {
        let present = |key: &str| self.storage.get(key).filter(|value| !value.is_empty());
        let player_id = present(PLAYER_ID_KEY)?;
        let room_id = present(ROOM_ID_KEY)?;
        let player_name = present(PLAYER_NAME_KEY)?;
        debug!(player_id = %player_id, room_id = %room_id, "Session loaded");
        Some(SessionRecord {
            player_id,
            room_id,
            player_name,
        })
    }

    /// Removes all three entries. Safe to call when nothing is saved.
    #[instrument(skip(self))]
    pub fn clear(&self) -> Result<(), StorageError> {
        for key in [PLAYER_ID_KEY, ROOM_ID_KEY, PLAYER_NAME_KEY] {
            self.storage.remove(key)?;
        }
        info!("Session cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_entries_read_as_none() {
        let store = SessionStore::new(MemoryStorage::new());
        store.storage().set(PLAYER_ID_KEY, "PLAYER_abc").unwrap();
        store.storage().set(ROOM_ID_KEY, "123456").unwrap();
        assert_eq!(store.load(), None);
    }

    #[test]
    fn test_empty_field_rejected_without_writing() {
        let store = SessionStore::new(MemoryStorage::new());
        let record = SessionRecord::new("PLAYER_abc", "", "Ann");
        assert!(store.save(&record).is_err());
        assert_eq!(store.storage().get(PLAYER_ID_KEY), None);
    }
}
