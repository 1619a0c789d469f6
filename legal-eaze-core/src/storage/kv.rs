//! Key-value stores

use crate::utils::safe_filename;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Whole-value string storage addressed by key
pub trait KeyValueStore: Send + Sync {
    /// Read the value under `key`, `None` if it was never written
    fn get(&self, key: &str) -> crate::Result<Option<String>>;

    /// Replace the value under `key`
    fn set(&self, key: &str, value: &str) -> crate::Result<()>;
}

/// One JSON file per key inside an origin directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `dir`; the directory is created on first write
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// File backing `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", safe_filename(key)))
    }

    fn temp_path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!(".{}.json.tmp", safe_filename(key)))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> crate::Result<Option<String>> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> crate::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        // Rename is atomic on the same filesystem, so readers see old or new, never half.
        let tmp = self.temp_path_for(key);
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, self.path_for(key))?;
        Ok(())
    }
}

/// In-process store, mostly for tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> crate::Result<Option<String>> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> crate::Result<()> {
        self.values.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}
