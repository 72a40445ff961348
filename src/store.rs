use crate::app_dirs::AppDirs;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Last ambient playback offset, decimal seconds
pub const AMBIENT_POS_KEY: &str = "ambient_pos";
/// Instant the offset was captured, integer epoch ms
pub const AMBIENT_POS_AT_KEY: &str = "ambient_pos_at";
/// Ambient track volume, decimal in [0,1]
pub const AMBIENT_VOL_KEY: &str = "ambient_vol";
/// UI-feedback volume, decimal in [0,1]
pub const FEEDBACK_VOL_KEY: &str = "feedback_vol";

/// Persistent string-keyed store. Writes may fail; callers that only need
/// best-effort persistence ignore the result.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> io::Result<()>;
}

/// Flat JSON map on disk
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = AppDirs::store_path().unwrap_or_else(|| PathBuf::from("tecla_state.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    fn read_map(&self) -> BTreeMap<String, String> {
        if let Ok(bytes) = fs::read(&self.path) {
            if let Ok(map) = serde_json::from_slice::<BTreeMap<String, String>>(&bytes) {
                return map;
            }
        }
        BTreeMap::new()
    }
}

impl Default for FileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.read_map().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        let mut map = self.read_map();
        map.insert(key.to_string(), value.to_string());
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(&map).unwrap_or_default();
        fs::write(&self.path, data)
    }
}

/// In-memory store for tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    map: RefCell<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.map.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        self.map
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Store whose writes always fail, for exercising the best-effort paths
#[derive(Debug, Default)]
pub struct BrokenStore;

impl KeyValueStore for BrokenStore {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }

    fn set(&self, _key: &str, _value: &str) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::Other, "store unavailable"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(store.get(AMBIENT_POS_KEY), None);
        store.set(AMBIENT_POS_KEY, "12.5").unwrap();
        assert_eq!(store.get(AMBIENT_POS_KEY), Some("12.5".to_string()));
    }

    #[test]
    fn file_store_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        let store = FileStore::with_path(&path);

        store.set(AMBIENT_VOL_KEY, "0.4").unwrap();
        store.set(FEEDBACK_VOL_KEY, "0.9").unwrap();

        let reopened = FileStore::with_path(&path);
        assert_eq!(reopened.get(AMBIENT_VOL_KEY), Some("0.4".to_string()));
        assert_eq!(reopened.get(FEEDBACK_VOL_KEY), Some("0.9".to_string()));
    }

    #[test]
    fn file_store_overwrites_existing_key() {
        let dir = tempdir().unwrap();
        let store = FileStore::with_path(dir.path().join("state.json"));

        store.set(AMBIENT_POS_KEY, "1.0").unwrap();
        store.set(AMBIENT_POS_AT_KEY, "100").unwrap();
        store.set(AMBIENT_POS_KEY, "2.0").unwrap();

        assert_eq!(store.get(AMBIENT_POS_KEY), Some("2.0".to_string()));
        assert_eq!(store.get(AMBIENT_POS_AT_KEY), Some("100".to_string()));
    }

    #[test]
    fn file_store_missing_file_reads_as_absent() {
        let dir = tempdir().unwrap();
        let store = FileStore::with_path(dir.path().join("nope.json"));
        assert_eq!(store.get(AMBIENT_POS_KEY), None);
    }

    #[test]
    fn broken_store_fails_writes() {
        let store = BrokenStore;
        assert!(store.set(AMBIENT_POS_KEY, "1.0").is_err());
        assert_eq!(store.get(AMBIENT_POS_KEY), None);
    }
}
