//! Storage adapters for the session token

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

/// Storage keys
pub mod keys {
    pub const TOKEN: &str = "ideascanner:token";
}

/// Key-value storage for the one piece of persisted state: the session token.
///
/// Implement this to plug in platform keychains or preference stores.
pub trait StorageAdapter: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// In-memory storage, the default. Nothing survives a restart; the backend is
/// the source of truth for anything that matters.
#[derive(Default)]
pub struct MemoryStorage {
    map: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageAdapter for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.map.read().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        if let Ok(mut map) = self.map.write() {
            map.insert(key.to_string(), value.to_string());
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut map) = self.map.write() {
            map.remove(key);
        }
    }
}

/// File-based storage.
///
/// Persists a flat JSON map in `ideascanner.json` inside the given directory.
pub struct FileStorage {
    path: std::path::PathBuf,
    cache: RwLock<HashMap<String, String>>,
}

impl FileStorage {
    /// Create a file storage rooted at `dir`, which must already exist.
    ///
    /// Returns `None` if `dir` is not an accessible directory.
    pub fn new(dir: &Path) -> Option<Self> {
        if !dir.is_dir() {
            return None;
        }

        let path = dir.join("ideascanner.json");
        let cache = if path.exists() {
            let contents = std::fs::read_to_string(&path).ok()?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            HashMap::new()
        };

        Some(Self {
            path,
            cache: RwLock::new(cache),
        })
    }

    fn save(&self) {
        if let Ok(cache) = self.cache.read() {
            if let Ok(contents) = serde_json::to_string_pretty(&*cache) {
                let _ = std::fs::write(&self.path, contents);
            }
        }
    }
}

impl StorageAdapter for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.cache.read().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(key.to_string(), value.to_string());
        }
        self.save();
    }

    fn remove(&self, key: &str) {
        if let Ok(mut cache) = self.cache.write() {
            cache.remove(key);
        }
        self.save();
    }
}

impl std::fmt::Debug for FileStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStorage")
            .field("path", &self.path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage_round_trip() {
        let storage = MemoryStorage::new();
        assert!(storage.get(keys::TOKEN).is_none());

        storage.set(keys::TOKEN, "jwt-abc");
        assert_eq!(storage.get(keys::TOKEN).as_deref(), Some("jwt-abc"));

        // last write wins
        storage.set(keys::TOKEN, "jwt-def");
        assert_eq!(storage.get(keys::TOKEN).as_deref(), Some("jwt-def"));

        storage.remove(keys::TOKEN);
        assert!(storage.get(keys::TOKEN).is_none());
    }

    #[test]
    fn test_file_storage_persists_across_instances() {
        let dir = std::env::temp_dir().join(format!("ideascanner-test-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();

        {
            let storage = FileStorage::new(&dir).unwrap();
            storage.set(keys::TOKEN, "persisted");
        }

        let storage = FileStorage::new(&dir).unwrap();
        assert_eq!(storage.get(keys::TOKEN).as_deref(), Some("persisted"));

        storage.remove(keys::TOKEN);
        let storage = FileStorage::new(&dir).unwrap();
        assert!(storage.get(keys::TOKEN).is_none());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_file_storage_requires_existing_dir() {
        let missing = std::env::temp_dir().join(format!("no-such-{}", uuid::Uuid::new_v4()));
        assert!(FileStorage::new(&missing).is_none());
    }
}
