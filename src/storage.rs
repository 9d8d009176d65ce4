// storage.rs - on-device key/value persistence for the collection and saved drawings
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;

pub const IMAGES_KEY: &str = "gemini-image-mixer-images";
pub const DRAWINGS_KEY: &str = "gemini-image-mixer-drawings";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error for '{key}': {source}")]
    Io { key: String, source: std::io::Error },
    #[error("cannot serialize '{key}': {source}")]
    Encode { key: String, source: serde_json::Error },
}

/// String-keyed, string-valued store; the browser's localStorage contract.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

pub type SharedStore = Arc<dyn KeyValueStore>;

// ── Directory-backed store ───────────────────────────────────────────────

/// One `<key>.json` file per entry under a root directory.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn open(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.root.join(format!("{}.json", safe))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io { key: key.into(), source }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        // Readers never see a half-written entry
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)
            .and_then(|_| std::fs::rename(&tmp, &path))
            .map_err(|source| StorageError::Io { key: key.into(), source })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io { key: key.into(), source }),
        }
    }
}

// ── In-memory store ──────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedStore {
        Arc::new(Self::new())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().unwrap_or_else(|p| p.into_inner()).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.lock().unwrap_or_else(|p| p.into_inner()).remove(key);
        Ok(())
    }
}

// ── JSON string lists ────────────────────────────────────────────────────

/// Read a JSON array of strings. Missing, unreadable or malformed entries
/// yield an empty list; the problem is logged, never returned.
pub fn load_string_list(store: &dyn KeyValueStore, key: &str) -> Vec<String> {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            log::warn!("failed to read '{}': {}", key, e);
            return Vec::new();
        }
    };
    match serde_json::from_str::<Vec<String>>(&raw) {
        Ok(list) => list,
        Err(e) => {
            log::warn!("ignoring malformed '{}' entry: {}", key, e);
            Vec::new()
        }
    }
}

pub fn save_string_list(store: &dyn KeyValueStore, key: &str, items: &[String]) -> Result<(), StorageError> {
    let json = serde_json::to_string(items).map_err(|source| StorageError::Encode { key: key.into(), source })?;
    store.set(key, &json)
}

// ── Tests ─────────────────────────────────────────────────────────────────
