use async_trait::async_trait;
use std::sync::Arc;

use crate::error::CacheError;
use crate::store::Store;
use crate::stores::area::{FileArea, MemoryArea, StorageArea};
use crate::utils::{build_cache_key, byte_len, peek_item_times, strip_cache_key};

/// Default namespace prefix of [`LocalStore`].
pub const LOCAL_NAMESPACE: &str = "local_cache";
/// Default namespace prefix of [`SessionStore`].
pub const SESSION_NAMESPACE: &str = "session_cache";

/// Configuration for PersistedStore.
#[derive(Debug, Clone)]
pub struct PersistedStoreConfig {
    /// Prefix of every key this store writes into the shared area.
    ///
    /// Keys are stored as `{namespace}_{key}`.
    pub namespace: String,

    /// Byte cap of this namespace. Quota recovery trims down to 80% of it.
    pub max_bytes: u64,
}

impl PersistedStoreConfig {
    /// Defaults for a store over a durable area.
    pub fn local() -> Self {
        PersistedStoreConfig {
            namespace: LOCAL_NAMESPACE.to_string(),
            max_bytes: 5 * crate::config::MB,
        }
    }

    /// Defaults for a store over a session-lifetime area.
    pub fn session() -> Self {
        PersistedStoreConfig {
            namespace: SESSION_NAMESPACE.to_string(),
            max_bytes: 5 * crate::config::MB,
        }
    }
}

/// Namespaced store over a [`StorageArea`].
///
/// Values are written as-is under `{namespace}_{key}`. Size and key listing scan every entry of
/// the namespace. A write that hits the quota triggers one local cleanup (oldest embedded
/// timestamp first, down to 80% of `max_bytes`) and exactly one retry.
pub struct PersistedStore<A: StorageArea> {
    area: Arc<A>,
    namespace: String,
    max_bytes: u64,
    name: &'static str,
}

/// Persisted store whose data survives restarts.
pub type LocalStore = PersistedStore<FileArea>;

/// Persisted store whose data lives as long as its area.
pub type SessionStore = PersistedStore<MemoryArea>;

impl LocalStore {
    /// Create a store over a durable file area.
    pub fn local(area: Arc<FileArea>, config: PersistedStoreConfig) -> Self {
        PersistedStore::with_name(area, config, "local")
    }
}

impl SessionStore {
    /// Create a store over a session-lifetime area.
    pub fn session(area: Arc<MemoryArea>, config: PersistedStoreConfig) -> Self {
        PersistedStore::with_name(area, config, "session")
    }
}

impl<A: StorageArea> PersistedStore<A> {
    /// Create a store over `area` with a custom name for logs and errors.
    pub fn with_name(area: Arc<A>, config: PersistedStoreConfig, name: &'static str) -> Self {
        PersistedStore {
            area,
            namespace: config.namespace,
            max_bytes: config.max_bytes,
            name,
        }
    }

    /// The namespace prefix of this store.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Every `(full key, value)` pair of this namespace.
    fn entries(&self) -> Result<Vec<(String, String)>, CacheError> {
        let mut entries = Vec::new();
        for full_key in self.area.keys()? {
            if strip_cache_key(&self.namespace, &full_key).is_none() {
                continue;
            }
            if let Some(value) = self.area.get_item(&full_key)? {
                entries.push((full_key, value));
            }
        }
        Ok(entries)
    }

    fn used_bytes(&self) -> Result<u64, CacheError> {
        Ok(self.entries()?.iter().map(|(_, v)| byte_len(v)).sum())
    }

    /// Drop the oldest entries until the namespace uses at most 80% of `max_bytes`.
    ///
    /// Entries without a readable embedded timestamp count as oldest.
    fn cleanup(&self) -> Result<usize, CacheError> {
        let target = self.max_bytes / 10 * 8 + self.max_bytes % 10 * 8 / 10;

        let mut entries: Vec<(String, u64, i64)> = self
            .entries()?
            .into_iter()
            .map(|(k, v)| {
                let timestamp = peek_item_times(&v).map(|(ts, _)| ts).unwrap_or(0);
                (k, byte_len(&v), timestamp)
            })
            .collect();
        entries.sort_by_key(|(_, _, timestamp)| *timestamp);

        let mut used: u64 = entries.iter().map(|(_, bytes, _)| bytes).sum();
        let mut removed = 0;
        for (full_key, bytes, _) in entries {
            if used <= target {
                break;
            }
            self.area.remove_item(&full_key)?;
            used -= bytes;
            removed += 1;
        }

        tracing::debug!(
            "Persisted store cleanup: store={}, namespace={}, removed={}, bytes={}",
            self.name,
            self.namespace,
            removed,
            used
        );
        Ok(removed)
    }

    fn try_write(&self, key: &str, full_key: &str, value: &str) -> Result<(), CacheError> {
        let current = self.used_bytes()?;
        let replaced = self
            .area
            .get_item(full_key)?
            .map(|v| byte_len(&v))
            .unwrap_or(0);
        if current - replaced + byte_len(value) > self.max_bytes {
            return Err(CacheError::quota(self.name, key));
        }
        self.area.set_item(full_key, value)
    }
}

#[async_trait]
impl<A: StorageArea + 'static> Store for PersistedStore<A> {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.area.get_item(&build_cache_key(&self.namespace, key))
    }

    async fn set(&self, key: &str, value: String) -> Result<(), CacheError> {
        let full_key = build_cache_key(&self.namespace, key);

        match self.try_write(key, &full_key, &value) {
            Err(e) if e.is_quota() => {
                tracing::warn!(
                    "Quota exceeded, cleaning up before retry: store={}, key={}",
                    self.name,
                    key
                );
                self.cleanup()?;
                self.try_write(key, &full_key, &value).map_err(|e| {
                    if e.is_quota() {
                        CacheError::quota(self.name, key)
                    } else {
                        e
                    }
                })
            }
            other => other,
        }
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.area.remove_item(&build_cache_key(&self.namespace, key))
    }

    async fn clear(&self) -> Result<(), CacheError> {
        for (full_key, _) in self.entries()? {
            self.area.remove_item(&full_key)?;
        }
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, CacheError> {
        Ok(self
            .area
            .keys()?
            .iter()
            .filter_map(|k| strip_cache_key(&self.namespace, k).map(str::to_string))
            .collect())
    }

    async fn size(&self) -> Result<u64, CacheError> {
        self.used_bytes()
    }
}
