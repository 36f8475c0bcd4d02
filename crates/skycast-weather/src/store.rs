//! Key-value persistence for location state.
//!
//! The location manager only needs `load`/`save` of JSON values; this trait
//! keeps it independent of where those values end up.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde_json::Value;
use skycast_core::StorageError;

pub trait KeyValueStore: Send + Sync {
    /// `Ok(None)` when nothing was saved under `key`.
    fn load(&self, key: &str) -> Result<Option<Value>, StorageError>;

    fn save(&self, key: &str, value: &Value) -> Result<(), StorageError>;
}

/// One pretty-printed JSON file per key inside a directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// The directory is created on first save.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{file}.json"))
    }
}

impl KeyValueStore for JsonFileStore {
    fn load(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let path = self.path_for(key);
        let contents = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StorageError::ReadFailed {
                    key: key.to_string(),
                    message: e.to_string(),
                })
            }
        };

        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| StorageError::Malformed {
                key: key.to_string(),
                message: e.to_string(),
            })
    }

    fn save(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        let write_failed = |message: String| StorageError::WriteFailed {
            key: key.to_string(),
            message,
        };

        std::fs::create_dir_all(&self.dir).map_err(|e| write_failed(e.to_string()))?;
        let contents =
            serde_json::to_string_pretty(value).map_err(|e| write_failed(e.to_string()))?;

        // Write-then-rename so a crash never leaves half a file behind.
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, contents).map_err(|e| write_failed(e.to_string()))?;
        std::fs::rename(&tmp, &path).map_err(|e| write_failed(e.to_string()))?;
        Ok(())
    }
}

/// Process-local store for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn save(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        self.values.lock().insert(key.to_string(), value.clone());
        Ok(())
    }
}
