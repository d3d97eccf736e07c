//! Key/value areas backing the persisted stores.
//!
//! A [`StorageArea`] plays the role of a Web-Storage-like native API: a flat, string-to-string
//! map shared by every namespace that writes into it, with a byte quota. The persisted stores
//! layer namespacing, size accounting and quota recovery on top.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::CacheError;

/// A flat key/value area with a byte quota.
///
/// Quota usage counts the UTF-8 bytes of keys and values.
pub trait StorageArea: Send + Sync {
    /// A name for logs and errors.
    fn name(&self) -> &'static str;

    fn get_item(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store an item. Fails with [`CacheError::QuotaExceeded`] if the area would exceed its quota.
    fn set_item(&self, key: &str, value: &str) -> Result<(), CacheError>;

    fn remove_item(&self, key: &str) -> Result<(), CacheError>;

    /// All keys in the area, across namespaces.
    fn keys(&self) -> Result<Vec<String>, CacheError>;
}

fn entry_bytes(key: &str, value: &str) -> u64 {
    (key.len() + value.len()) as u64
}

fn fits(items: &BTreeMap<String, String>, key: &str, value: &str, quota: u64) -> bool {
    let current: u64 = items.iter().map(|(k, v)| entry_bytes(k, v)).sum();
    let replaced = items.get(key).map(|v| entry_bytes(key, v)).unwrap_or(0);
    current - replaced + entry_bytes(key, value) <= quota
}

/// Area living in process memory, for the lifetime of the value.
///
/// Share one instance (behind an `Arc`) between stores to emulate a per-session storage area.
pub struct MemoryArea {
    items: Mutex<BTreeMap<String, String>>,
    quota: u64,
}

impl MemoryArea {
    /// Create an empty area holding at most `quota` bytes.
    pub fn new(quota: u64) -> Self {
        MemoryArea {
            items: Mutex::new(BTreeMap::new()),
            quota,
        }
    }
}

impl StorageArea for MemoryArea {
    fn name(&self) -> &'static str {
        "memory-area"
    }

    fn get_item(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.items.lock().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let mut items = self.items.lock();
        if !fits(&items, key, value, self.quota) {
            return Err(CacheError::quota(self.name(), key));
        }
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), CacheError> {
        self.items.lock().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, CacheError> {
        Ok(self.items.lock().keys().cloned().collect())
    }
}

/// Area persisted as a JSON document on disk.
///
/// The whole document is loaded on open and rewritten after every mutation, so data survives
/// process restarts.
pub struct FileArea {
    path: PathBuf,
    items: Mutex<BTreeMap<String, String>>,
    quota: u64,
}

impl FileArea {
    /// Open (or create on first write) the area stored at `path`.
    pub fn open(path: impl AsRef<Path>, quota: u64) -> Result<Self, CacheError> {
        let path = path.as_ref().to_path_buf();
        let items = match fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => BTreeMap::new(),
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
                CacheError::storage(
                    "file-area",
                    "",
                    format!("Corrupt area file {}: {}", path.display(), e),
                )
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(CacheError::storage(
                    "file-area",
                    "",
                    format!("Failed to read {}: {}", path.display(), e),
                ));
            }
        };

        Ok(FileArea {
            path,
            items: Mutex::new(items),
            quota,
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, items: &BTreeMap<String, String>, key: &str) -> Result<(), CacheError> {
        let data = serde_json::to_vec(items)
            .map_err(|e| CacheError::Serialization(format!("Area encoding failed: {}", e)))?;

        let tmp = self.path.with_extension("tmp");
        let write = || -> std::io::Result<()> {
            if let Some(parent) = self.path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&data)?;
            file.sync_all()?;
            fs::rename(&tmp, &self.path)
        };
        write().map_err(|e| {
            CacheError::storage(
                self.name(),
                key,
                format!("Failed to write {}: {}", self.path.display(), e),
            )
        })
    }
}

impl StorageArea for FileArea {
    fn name(&self) -> &'static str {
        "file-area"
    }

    fn get_item(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.items.lock().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let mut items = self.items.lock();
        if !fits(&items, key, value, self.quota) {
            return Err(CacheError::quota(self.name(), key));
        }
        let previous = items.insert(key.to_string(), value.to_string());
        if let Err(e) = self.flush(&items, key) {
            match previous {
                Some(old) => items.insert(key.to_string(), old),
                None => items.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), CacheError> {
        let mut items = self.items.lock();
        if items.remove(key).is_some() {
            self.flush(&items, key)?;
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, CacheError> {
        Ok(self.items.lock().keys().cloned().collect())
    }
}
