//! Small durable key-value storage for per-device UI state.
//!
//! Values are opaque strings; callers choose their own encoding.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum KvError {
    #[error("key-value io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("key-value file is not valid JSON: {0}")]
    Format(#[from] serde_json::Error),

    #[error("key-value store lock poisoned")]
    Poisoned,
}

/// Callback handed to [`KeyValueStore::update`].
pub type UpdateFn<'a> = dyn FnMut(Option<&str>) -> Result<Option<String>, KvError> + 'a;

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, KvError>;

    /// Insert or replace the value under `key`.
    fn set(&self, key: &str, value: String) -> Result<(), KvError>;

    /// Read-modify-write of one key, atomic with respect to every other
    /// `set` and `update` on this store.
    ///
    /// `f` sees the current value and returns the replacement, or `None` to
    /// leave the key untouched. Returns whether a value was written.
    fn update(&self, key: &str, f: &mut UpdateFn<'_>) -> Result<bool, KvError>;

    fn contains(&self, key: &str) -> Result<bool, KvError> {
        Ok(self.get(key)?.is_some())
    }
}

impl<S> KeyValueStore for std::sync::Arc<S>
where
    S: KeyValueStore + ?Sized,
{
    fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: String) -> Result<(), KvError> {
        (**self).set(key, value)
    }

    fn update(&self, key: &str, f: &mut UpdateFn<'_>) -> Result<bool, KvError> {
        (**self).update(key, f)
    }

    fn contains(&self, key: &str) -> Result<bool, KvError> {
        (**self).contains(key)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    entries: RwLock<HashMap<String, String>>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let entries = self.entries.read().map_err(|_| KvError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> Result<(), KvError> {
        let mut entries = self.entries.write().map_err(|_| KvError::Poisoned)?;
        entries.insert(key.to_string(), value);
        Ok(())
    }

    fn update(&self, key: &str, f: &mut UpdateFn<'_>) -> Result<bool, KvError> {
        let mut entries = self.entries.write().map_err(|_| KvError::Poisoned)?;
        let Some(value) = f(entries.get(key).map(String::as_str))? else {
            return Ok(false);
        };
        entries.insert(key.to_string(), value);
        Ok(true)
    }
}

/// Key-value store persisted as one JSON object on disk.
///
/// Every write rewrites the whole file through a sibling temp file and a
/// rename, so a crash leaves either the old or the new contents.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, KvError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Callers hold `write_lock`.
    fn store(&self, entries: &BTreeMap<String, String>) -> Result<(), KvError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: String) -> Result<(), KvError> {
        let _guard = self.write_lock.lock().map_err(|_| KvError::Poisoned)?;

        let mut entries = self.load()?;
        entries.insert(key.to_string(), value);
        self.store(&entries)
    }

    fn update(&self, key: &str, f: &mut UpdateFn<'_>) -> Result<bool, KvError> {
        let _guard = self.write_lock.lock().map_err(|_| KvError::Poisoned)?;

        let mut entries = self.load()?;
        let Some(value) = f(entries.get(key).map(String::as_str))? else {
            return Ok(false);
        };
        entries.insert(key.to_string(), value);
        self.store(&entries)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_set_replaces_value() {
        let kv = InMemoryKeyValueStore::new();
        assert!(!kv.contains("k").unwrap());
        kv.set("k", "1".to_string()).unwrap();
        kv.set("k", "2".to_string()).unwrap();
        assert_eq!(kv.get("k").unwrap().as_deref(), Some("2"));
        assert!(kv.contains("k").unwrap());
    }

    #[test]
    fn json_file_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("bodega.json");

        let kv = JsonFileStore::new(&path);
        assert_eq!(kv.get("missing").unwrap(), None);
        kv.set("inventory-read-notifications", "[\"low-1\"]".to_string())
            .unwrap();
        kv.set("other", "x".to_string()).unwrap();

        let reopened = JsonFileStore::new(&path);
        assert_eq!(
            reopened.get("inventory-read-notifications").unwrap().as_deref(),
            Some("[\"low-1\"]")
        );
        assert!(reopened.contains("other").unwrap());
    }

    #[test]
    fn update_can_decline_to_write() {
        let dir = tempfile::tempdir().unwrap();
        let kv = JsonFileStore::new(dir.path().join("bodega.json"));

        assert!(kv.update("n", &mut |_| Ok(Some("1".to_string()))).unwrap());
        let bumped = kv
            .update("n", &mut |current| {
                let n: u32 = current.unwrap_or("0").parse().unwrap();
                Ok(Some((n + 1).to_string()))
            })
            .unwrap();
        assert!(bumped);
        assert!(!kv.update("n", &mut |_| Ok(None)).unwrap());
        assert_eq!(kv.get("n").unwrap().as_deref(), Some("2"));
        assert!(!dir.path().join("bodega.json.tmp").exists());
    }

    #[test]
    fn concurrent_in_memory_updates_are_not_lost() {
        let kv = std::sync::Arc::new(InMemoryKeyValueStore::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let kv = kv.clone();
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        kv.update("n", &mut |current| {
                            let n: u32 = current.unwrap_or("0").parse().unwrap();
                            Ok(Some((n + 1).to_string()))
                        })
                        .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(kv.get("n").unwrap().as_deref(), Some("400"));
    }

    #[test]
    fn garbage_file_is_a_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bodega.json");
        fs::write(&path, "not json").unwrap();

        let kv = JsonFileStore::new(&path);
        assert!(matches!(kv.get("k"), Err(KvError::Format(_))));
    }
}
