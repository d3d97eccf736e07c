use futures::future::join_all;
use parking_lot::{Mutex, RwLock};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

use crate::config::{CacheConfig, CacheConfigOverride, StorageStrategy};
use crate::entry::CacheItem;
use crate::error::CacheError;
use crate::events::{CacheEvent, CacheEventKind, ListenerId, ListenerRegistry};
use crate::eviction::{EvictionCandidate, needs_eviction, plan_eviction};
use crate::serialization::{Serializer, build_serializer};
use crate::stats::{CacheStats, StatsTracker};
use crate::store::Store;
use crate::stores::area::{FileArea, MemoryArea};
use crate::stores::indexed::{IndexedStore, IndexedStoreConfig};
use crate::stores::memory::{MemoryStore, MemoryStoreConfig};
use crate::stores::persisted::{PersistedStore, PersistedStoreConfig};
use crate::tiered::TieredStore;
use crate::utils::{byte_len, now_ms};

/// Everything that is swapped together by `update_config`.
struct Backend {
    config: CacheConfig,
    store: Arc<dyn Store>,
    serializer: Arc<dyn Serializer>,
}

/// State shared with the background cleanup task.
struct Inner {
    backend: RwLock<Arc<Backend>>,
    stats: StatsTracker,
    listeners: ListenerRegistry,
}

/// Cache orchestrator: one configuration, one store, one serializer chain.
///
/// Values are typed at the call site and stored as JSON-shaped [`CacheItem`]s. Read-path
/// failures (`get`, `has`, `get_by_tag`) are logged and degrade to "absent"; write-path failures
/// are returned to the caller.
///
/// A background task runs [`CacheManager::cleanup`] every `cleanup_interval_ms` while the
/// manager is alive and a tokio runtime is available.
///
/// # Example
/// ```ignore
/// let cache = CacheManager::new(CacheConfig::default()).await?;
/// cache.set("user:1", &user, None).await?;
/// let user: Option<User> = cache.get("user:1").await;
/// ```
pub struct CacheManager {
    inner: Arc<Inner>,
    cleanup_task: Mutex<Option<JoinHandle<()>>>,
}

/// Construct the store selected by `config.strategy`.
///
/// Every call creates a fresh store; nothing is carried over from a previous one.
async fn create_store(config: &CacheConfig) -> Result<Arc<dyn Store>, CacheError> {
    let capacity = config.capacity();
    let persisted_config = || PersistedStoreConfig {
        namespace: config.namespace.clone(),
        max_bytes: capacity,
    };
    let local_store = || -> Result<Arc<dyn Store>, CacheError> {
        let store: Arc<dyn Store> = match &config.storage_path {
            Some(path) => Arc::new(PersistedStore::local(
                Arc::new(FileArea::open(path, capacity)?),
                persisted_config(),
            )),
            None => Arc::new(PersistedStore::with_name(
                Arc::new(MemoryArea::new(capacity)),
                persisted_config(),
                "local",
            )),
        };
        Ok(store)
    };
    let memory_store = || -> Arc<dyn Store> {
        Arc::new(MemoryStore::new(MemoryStoreConfig {
            max_bytes: capacity,
        }))
    };

    let store: Arc<dyn Store> = match config.strategy {
        StorageStrategy::Memory => memory_store(),
        StorageStrategy::Http => {
            tracing::warn!(
                "No http backend available, falling back to memory: namespace={}",
                config.namespace
            );
            memory_store()
        }
        StorageStrategy::LocalPersisted => local_store()?,
        StorageStrategy::SessionPersisted => Arc::new(PersistedStore::session(
            Arc::new(MemoryArea::new(capacity)),
            persisted_config(),
        )),
        StorageStrategy::IndexedRecord => Arc::new(
            IndexedStore::open(IndexedStoreConfig {
                path: config.storage_path.clone(),
                namespace: config.namespace.clone(),
            })
            .await?,
        ),
        StorageStrategy::Hybrid => Arc::new(TieredStore::from_stores(vec![
            memory_store(),
            local_store()?,
        ])),
    };
    Ok(store)
}

fn decode_item(serializer: &dyn Serializer, raw: &str) -> Result<CacheItem<Value>, CacheError> {
    let value = serializer.deserialize(raw)?;
    serde_json::from_value(value)
        .map_err(|e| CacheError::Deserialization(format!("Invalid cache item: {}", e)))
}

fn encode_item(serializer: &dyn Serializer, item: &CacheItem<Value>) -> Result<String, CacheError> {
    let value = serde_json::to_value(item)
        .map_err(|e| CacheError::Serialization(format!("Invalid cache item: {}", e)))?;
    serializer.serialize(&value)
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

impl Inner {
    fn snapshot(&self) -> Arc<Backend> {
        self.backend.read().clone()
    }

    fn emit(&self, kind: CacheEventKind, key: Option<&str>, value: Option<Value>) {
        self.listeners.emit(&CacheEvent::new(kind, key, value));
    }

    /// Remove every expired item, then evict if usage is still above the threshold.
    async fn cleanup(&self) -> Result<usize, CacheError> {
        let backend = self.snapshot();
        let now = now_ms();

        // Indexed expiry is only trustworthy when the backend could read the stored items.
        let indexed = if backend.config.stores_plain_json() {
            backend.store.expired_keys(now).await?
        } else {
            None
        };
        let expired = match indexed {
            Some(keys) => keys,
            None => {
                let mut keys = Vec::new();
                for key in backend.store.keys().await? {
                    let Some(raw) = backend.store.get(&key).await? else {
                        continue;
                    };
                    match decode_item(backend.serializer.as_ref(), &raw) {
                        Ok(item) if item.is_expired(now) => keys.push(key),
                        Ok(_) => {}
                        Err(e) => {
                            tracing::warn!(
                                "Skipping undecodable item during cleanup: key={}, error={}",
                                key,
                                e
                            );
                        }
                    }
                }
                keys
            }
        };

        for key in &expired {
            backend.store.remove(key).await?;
            self.stats.record_evictions(1);
            self.emit(CacheEventKind::Expire, Some(key), None);
        }
        self.stats.record_cleanup(now);

        if !expired.is_empty() {
            tracing::debug!(
                "Cleanup removed expired items: store={}, removed={}",
                backend.store.name(),
                expired.len()
            );
        }

        self.evict_if_needed(&backend).await?;
        Ok(expired.len())
    }

    /// Evict lowest-priority, least-recently-accessed items until usage is at most 80% of
    /// `max_size`. Does nothing while usage is at most 90%.
    async fn evict_if_needed(&self, backend: &Backend) -> Result<usize, CacheError> {
        let usage = backend.store.size().await?;
        if !needs_eviction(usage, backend.config.eviction_threshold()) {
            return Ok(0);
        }
        self.evict_to(backend, usage, backend.config.eviction_target()).await
    }

    /// Free room for a write of `incoming` bytes that the store rejected for quota.
    ///
    /// Usage is brought down to the eviction target minus `incoming`. A write larger than the
    /// eviction target can never fit, so nothing is evicted for it.
    async fn make_room(&self, backend: &Backend, incoming: u64) -> Result<usize, CacheError> {
        let target = backend.config.eviction_target();
        if incoming > target {
            return Ok(0);
        }
        let usage = backend.store.size().await?;
        if usage <= target - incoming {
            return Ok(0);
        }
        self.evict_to(backend, usage, target - incoming).await
    }

    /// Evict by priority, then least recent access, until usage is at most `target`.
    async fn evict_to(
        &self,
        backend: &Backend,
        usage: u64,
        target: u64,
    ) -> Result<usize, CacheError> {
        let mut candidates = Vec::new();
        for key in backend.store.keys().await? {
            let Some(raw) = backend.store.get(&key).await? else {
                continue;
            };
            let bytes = byte_len(&raw);
            match decode_item(backend.serializer.as_ref(), &raw) {
                Ok(item) => candidates.push(EvictionCandidate::from_item(&item, bytes)),
                Err(_) => candidates.push(EvictionCandidate::unreadable(key, bytes)),
            }
        }

        let victims = plan_eviction(candidates, usage, target);
        for key in &victims {
            backend.store.remove(key).await?;
            self.stats.record_evictions(1);
            self.emit(CacheEventKind::Evict, Some(key), None);
        }

        tracing::debug!(
            "Evicted items over size budget: store={}, evicted={}, usage={}, max_size={}",
            backend.store.name(),
            victims.len(),
            usage,
            backend.config.max_size
        );
        Ok(victims.len())
    }
}

impl CacheManager {
    /// Create a manager for `config`.
    ///
    /// Fails if the configuration is invalid or the store cannot be opened.
    pub async fn new(config: CacheConfig) -> Result<Self, CacheError> {
        config.validate()?;
        let store = create_store(&config).await?;
        let serializer = build_serializer(&config);

        let manager = CacheManager {
            inner: Arc::new(Inner {
                backend: RwLock::new(Arc::new(Backend {
                    config,
                    store,
                    serializer,
                })),
                stats: StatsTracker::default(),
                listeners: ListenerRegistry::new(),
            }),
            cleanup_task: Mutex::new(None),
        };
        manager.start_cleanup_task();
        Ok(manager)
    }

    /// Restart the periodic cleanup task with the current interval.
    ///
    /// The previous task is always stopped first.
    fn start_cleanup_task(&self) {
        let mut task = self.cleanup_task.lock();
        if let Some(old) = task.take() {
            old.abort();
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No tokio runtime, periodic cleanup disabled");
            return;
        };

        let period = Duration::from_millis(self.inner.snapshot().config.cleanup_interval_ms);
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        *task = Some(runtime.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                if let Err(e) = inner.cleanup().await {
                    tracing::error!("Periodic cleanup failed: error={}", e);
                }
            }
        }));
    }

    /// Stop the periodic cleanup task. Also happens on drop.
    pub fn shutdown(&self) {
        if let Some(task) = self.cleanup_task.lock().take() {
            task.abort();
        }
    }

    /// Returns `true` while the periodic cleanup task is scheduled.
    pub fn is_cleanup_scheduled(&self) -> bool {
        self.cleanup_task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Return the live value for `key`, or `None`.
    ///
    /// A hit bumps the item's access count and last-access time and writes it back. An expired
    /// item is deleted and counts as a miss. Store or decoding failures are logged and reported
    /// as a miss.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let start = Instant::now();
        let backend = self.inner.snapshot();
        let result = self.read(&backend, key).await;
        self.inner.stats.record_get_latency(elapsed_ms(start));

        let found = match result {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(
                    "Cache read failed: store={}, key={}, error={}",
                    backend.store.name(),
                    key,
                    e
                );
                None
            }
        };

        match found {
            Some((value, raw_value)) => {
                self.inner.stats.record_hit();
                self.inner.emit(CacheEventKind::Hit, Some(key), Some(raw_value.clone()));
                self.inner.emit(CacheEventKind::Get, Some(key), Some(raw_value));
                Some(value)
            }
            None => {
                self.inner.stats.record_miss();
                self.inner.emit(CacheEventKind::Miss, Some(key), None);
                self.inner.emit(CacheEventKind::Get, Some(key), None);
                None
            }
        }
    }

    async fn read<T: DeserializeOwned>(
        &self,
        backend: &Backend,
        key: &str,
    ) -> Result<Option<(T, Value)>, CacheError> {
        let Some(raw) = backend.store.get(key).await? else {
            return Ok(None);
        };
        let mut item = decode_item(backend.serializer.as_ref(), &raw)?;

        let now = now_ms();
        if item.is_expired(now) {
            backend.store.remove(key).await?;
            self.inner.emit(CacheEventKind::Expire, Some(key), None);
            return Ok(None);
        }

        let value: T = serde_json::from_value(item.value.clone())
            .map_err(|e| CacheError::Deserialization(format!("Unexpected value shape: {}", e)))?;

        item.touch(now);
        let persisted = match encode_item(backend.serializer.as_ref(), &item) {
            Ok(raw) => backend.store.set(key, raw).await,
            Err(e) => Err(e),
        };
        if let Err(e) = persisted {
            tracing::warn!("Failed to record access: key={}, error={}", key, e);
        }

        Ok(Some((value, item.value)))
    }

    /// Store `value` under `key`.
    ///
    /// `overrides` are merged onto the manager's config for this call only; they shape the item
    /// (`max_age`, `expiration_strategy`, `priority`, `tags`, `version`). A quota failure triggers
    /// one cleanup pass and a single retry before it is returned. Afterwards, eviction runs if
    /// usage exceeds 90% of `max_size`.
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        overrides: Option<&CacheConfigOverride>,
    ) -> Result<(), CacheError> {
        let start = Instant::now();
        let backend = self.inner.snapshot();
        let merged;
        let config = match overrides {
            Some(overrides) => {
                merged = backend.config.merged(overrides);
                &merged
            }
            None => &backend.config,
        };

        let value = serde_json::to_value(value)
            .map_err(|e| CacheError::Serialization(format!("Unsupported value: {}", e)))?;
        let size = serde_json::to_string(&value)
            .map(|s| byte_len(&s))
            .map_err(|e| CacheError::Serialization(format!("Unsupported value: {}", e)))?;

        let now = now_ms();
        let item = CacheItem {
            key: key.to_string(),
            value,
            timestamp: now,
            expires_at: config.expiration_strategy.expires_at(now, config.max_age),
            access_count: 0,
            last_accessed: now,
            size,
            priority: config.priority,
            tags: config.tags.clone(),
            metadata: HashMap::from([(
                "version".to_string(),
                Value::String(config.version.clone()),
            )]),
        };
        let raw = encode_item(backend.serializer.as_ref(), &item)?;

        match backend.store.set(key, raw.clone()).await {
            Err(e) if e.is_quota() => {
                tracing::warn!(
                    "Quota exceeded, running cleanup before retry: store={}, key={}",
                    backend.store.name(),
                    key
                );
                self.inner.cleanup().await?;
                self.inner.make_room(&backend, byte_len(&raw)).await?;
                backend.store.set(key, raw).await?;
            }
            other => other?,
        }

        self.inner.stats.record_set_latency(elapsed_ms(start));
        self.inner.emit(CacheEventKind::Set, Some(key), Some(item.value));

        if let Err(e) = self.inner.evict_if_needed(&backend).await {
            tracing::warn!("Eviction after write failed: key={}, error={}", key, e);
        }
        Ok(())
    }

    /// Delete `key`. Returns `true` if an entry existed.
    pub async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let backend = self.inner.snapshot();
        if backend.store.get(key).await?.is_none() {
            return Ok(false);
        }
        backend.store.remove(key).await?;
        self.inner.emit(CacheEventKind::Delete, Some(key), None);
        Ok(true)
    }

    /// Empty the store and reset the statistics.
    pub async fn clear(&self) -> Result<(), CacheError> {
        let backend = self.inner.snapshot();
        backend.store.clear().await?;
        self.inner.stats.reset();
        self.inner.emit(CacheEventKind::Clear, None, None);
        Ok(())
    }

    /// Returns `true` if a live entry exists for `key`.
    ///
    /// Expired entries are left in place and statistics are not touched.
    pub async fn has(&self, key: &str) -> bool {
        let backend = self.inner.snapshot();
        let raw = match backend.store.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return false,
            Err(e) => {
                tracing::warn!("Cache lookup failed: key={}, error={}", key, e);
                return false;
            }
        };
        match decode_item(backend.serializer.as_ref(), &raw) {
            Ok(item) => item.is_live(now_ms()),
            Err(e) => {
                tracing::warn!("Cache lookup failed: key={}, error={}", key, e);
                false
            }
        }
    }

    /// Read several keys concurrently. Each key behaves like [`CacheManager::get`].
    pub async fn get_many<T: DeserializeOwned>(&self, keys: &[&str]) -> HashMap<String, Option<T>> {
        let values = join_all(keys.iter().map(|key| self.get::<T>(key))).await;
        keys.iter().map(|k| k.to_string()).zip(values).collect()
    }

    /// Write several entries concurrently.
    ///
    /// Entries are independent: a failing key does not undo the others. The first error is
    /// returned once every write has finished.
    pub async fn set_many<T: Serialize>(
        &self,
        entries: &[(&str, T)],
        overrides: Option<&CacheConfigOverride>,
    ) -> Result<(), CacheError> {
        let results = join_all(
            entries
                .iter()
                .map(|(key, value)| self.set(key, value, overrides)),
        )
        .await;
        results.into_iter().collect()
    }

    /// Delete several keys concurrently. Returns how many existed.
    ///
    /// The first error is returned once every deletion has finished.
    pub async fn delete_many(&self, keys: &[&str]) -> Result<usize, CacheError> {
        let results = join_all(keys.iter().map(|key| self.delete(key))).await;
        let mut deleted = 0;
        let mut first_error = None;
        for result in results {
            match result {
                Ok(true) => deleted += 1,
                Ok(false) => {}
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(deleted),
        }
    }

    /// Scan every item and decode the live ones.
    async fn scan_live(&self, backend: &Backend) -> Result<Vec<CacheItem<Value>>, CacheError> {
        let now = now_ms();
        let mut items = Vec::new();
        for key in backend.store.keys().await? {
            let Some(raw) = backend.store.get(&key).await? else {
                continue;
            };
            match decode_item(backend.serializer.as_ref(), &raw) {
                Ok(item) if item.is_live(now) => items.push(item),
                Ok(_) => {}
                Err(e) => tracing::warn!("Skipping undecodable item: key={}, error={}", key, e),
            }
        }
        Ok(items)
    }

    /// All live values tagged with `tag`, keyed by cache key.
    ///
    /// This scans every stored item. Failures are logged and yield an empty or partial map.
    pub async fn get_by_tag<T: DeserializeOwned>(&self, tag: &str) -> HashMap<String, T> {
        let backend = self.inner.snapshot();
        let items = match self.scan_live(&backend).await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!("Tag query failed: tag={}, error={}", tag, e);
                return HashMap::new();
            }
        };

        items
            .into_iter()
            .filter(|item| item.has_tag(tag))
            .filter_map(|item| match serde_json::from_value(item.value) {
                Ok(value) => Some((item.key, value)),
                Err(e) => {
                    tracing::warn!("Unexpected value shape: key={}, error={}", item.key, e);
                    None
                }
            })
            .collect()
    }

    /// Delete every live item tagged with `tag`. Returns the number of deleted items.
    pub async fn delete_by_tag(&self, tag: &str) -> Result<usize, CacheError> {
        let backend = self.inner.snapshot();
        let mut deleted = 0;
        for item in self.scan_live(&backend).await? {
            if !item.has_tag(tag) {
                continue;
            }
            backend.store.remove(&item.key).await?;
            self.inner.emit(CacheEventKind::Delete, Some(&item.key), None);
            deleted += 1;
        }
        Ok(deleted)
    }

    /// Remove every expired item, then evict if still above the size threshold.
    ///
    /// Returns the number of expired items removed.
    pub async fn cleanup(&self) -> Result<usize, CacheError> {
        self.inner.cleanup().await
    }

    /// Read each key once to warm access statistics. Values are discarded.
    pub async fn preload(&self, keys: &[&str]) {
        join_all(keys.iter().map(|key| self.get::<Value>(key))).await;
    }

    /// Register a listener for events of `kind`.
    pub fn on<F>(&self, kind: CacheEventKind, listener: F) -> ListenerId
    where
        F: Fn(&CacheEvent) + Send + Sync + 'static,
    {
        self.inner.listeners.on(kind, listener)
    }

    /// Unregister a listener. Returns `false` if it was not registered for `kind`.
    pub fn off(&self, kind: CacheEventKind, id: ListenerId) -> bool {
        self.inner.listeners.off(kind, id)
    }

    /// Current statistics. Item count and byte usage are read from the store.
    pub async fn get_stats(&self) -> CacheStats {
        let backend = self.inner.snapshot();
        let total_items = match backend.store.keys().await {
            Ok(keys) => keys.len() as u64,
            Err(e) => {
                tracing::warn!("Failed to count items: error={}", e);
                0
            }
        };
        let total_size = match backend.store.size().await {
            Ok(size) => size,
            Err(e) => {
                tracing::warn!("Failed to measure size: error={}", e);
                0
            }
        };
        self.inner.stats.snapshot(total_items, total_size)
    }

    /// All keys currently stored, expired or not.
    pub async fn keys(&self) -> Result<Vec<String>, CacheError> {
        self.inner.snapshot().store.keys().await
    }

    /// Byte usage of the store.
    pub async fn size(&self) -> Result<u64, CacheError> {
        self.inner.snapshot().store.size().await
    }

    /// A copy of the current configuration.
    pub fn get_config(&self) -> CacheConfig {
        self.inner.snapshot().config.clone()
    }

    /// Apply `overrides` to the configuration.
    ///
    /// When the strategy changes, a new, empty store is created. Data in the previous store is
    /// not migrated and becomes unreachable through this manager. The cleanup task is restarted
    /// with the new interval.
    pub async fn update_config(&self, overrides: &CacheConfigOverride) -> Result<(), CacheError> {
        let current = self.inner.snapshot();
        let config = current.config.merged(overrides);
        config.validate()?;

        let store = if config.strategy != current.config.strategy {
            tracing::debug!(
                "Storage strategy changed, previous store is orphaned: from={}, to={}",
                current.config.strategy.as_str(),
                config.strategy.as_str()
            );
            create_store(&config).await?
        } else {
            current.store.clone()
        };
        let serializer = build_serializer(&config);

        *self.inner.backend.write() = Arc::new(Backend {
            config,
            store,
            serializer,
        });
        self.start_cleanup_task();
        Ok(())
    }
}

impl Drop for CacheManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Priority;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn memory_manager() -> CacheManager {
        CacheManager::new(CacheConfig::default()).await.unwrap()
    }

    #[tokio::test]
    async fn test_get_and_set() {
        let cache = memory_manager().await;

        // Initially empty
        let result: Option<String> = cache.get("key1").await;
        assert!(result.is_none());

        cache.set("key1", "value1", None).await.unwrap();
        let result: Option<String> = cache.get("key1").await;
        assert_eq!(result, Some("value1".to_string()));

        assert!(cache.delete("key1").await.unwrap());
        assert!(!cache.delete("key1").await.unwrap());
        let result: Option<String> = cache.get("key1").await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_hit_updates_access_bookkeeping() {
        let cache = memory_manager().await;
        cache.set("k", &json!({"n": 1}), None).await.unwrap();

        let _: Option<Value> = cache.get("k").await;
        let _: Option<Value> = cache.get("k").await;

        let backend = cache.inner.snapshot();
        let raw = backend.store.get("k").await.unwrap().unwrap();
        let item = decode_item(backend.serializer.as_ref(), &raw).unwrap();
        assert_eq!(item.access_count, 2);
        assert!(item.last_accessed >= item.timestamp);
        assert_eq!(item.metadata["version"], json!("1.0.0"));
    }

    #[tokio::test]
    async fn test_expired_item_is_removed_on_get_but_not_on_has() {
        let cache = memory_manager().await;
        let expired = Arc::new(AtomicUsize::new(0));
        let expired_clone = expired.clone();
        cache.on(CacheEventKind::Expire, move |_| {
            expired_clone.fetch_add(1, Ordering::SeqCst);
        });

        cache
            .set("k", "v", Some(&CacheConfigOverride::default().max_age(20)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;

        assert!(!cache.has("k").await);
        assert_eq!(cache.keys().await.unwrap(), vec!["k".to_string()]);

        let value: Option<String> = cache.get("k").await;
        assert!(value.is_none());
        assert!(cache.keys().await.unwrap().is_empty());
        assert_eq!(expired.load(Ordering::SeqCst), 1);
        assert_eq!(cache.get_stats().await.miss_count, 1);
    }

    #[tokio::test]
    async fn test_wrong_type_degrades_to_none() {
        let cache = memory_manager().await;
        cache.set("k", "text", None).await.unwrap();
        let value: Option<u64> = cache.get("k").await;
        assert!(value.is_none());
        assert_eq!(cache.get_stats().await.miss_count, 1);
    }

    #[tokio::test]
    async fn test_override_does_not_change_config() {
        let cache = memory_manager().await;
        let overrides = CacheConfigOverride::default()
            .priority(Priority::Critical)
            .tags(["pinned"]);
        cache.set("k", &1, Some(&overrides)).await.unwrap();

        assert_eq!(cache.get_config(), CacheConfig::default());
        let pinned: HashMap<String, i32> = cache.get_by_tag("pinned").await;
        assert_eq!(pinned.get("k"), Some(&1));
    }

    #[tokio::test]
    async fn test_strategy_change_orphans_old_data() {
        let cache = memory_manager().await;
        cache.set("k", "v", None).await.unwrap();

        let session = CacheConfigOverride::default().strategy(StorageStrategy::SessionPersisted);
        cache.update_config(&session).await.unwrap();

        assert_eq!(cache.get_config().strategy, StorageStrategy::SessionPersisted);
        let value: Option<String> = cache.get("k").await;
        assert!(value.is_none());

        // Same strategy keeps the store.
        cache.set("k", "v2", None).await.unwrap();
        cache
            .update_config(&CacheConfigOverride::default().max_age(10_000))
            .await
            .unwrap();
        let value: Option<String> = cache.get("k").await;
        assert_eq!(value.as_deref(), Some("v2"));
    }

    #[tokio::test]
    async fn test_update_config_rejects_invalid_values() {
        let cache = memory_manager().await;
        let overrides = CacheConfigOverride {
            max_size: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            cache.update_config(&overrides).await,
            Err(CacheError::InvalidConfig(_))
        ));
        assert_eq!(cache.get_config().max_size, CacheConfig::default().max_size);
    }

    #[tokio::test]
    async fn test_cleanup_task_lifecycle() {
        let cache = memory_manager().await;
        assert!(cache.is_cleanup_scheduled());

        cache
            .update_config(&CacheConfigOverride {
                cleanup_interval_ms: Some(1_000),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(cache.is_cleanup_scheduled());

        cache.shutdown();
        assert!(!cache.is_cleanup_scheduled());
    }

    #[tokio::test]
    async fn test_periodic_cleanup_removes_expired_items() {
        let config = CacheConfig {
            cleanup_interval_ms: 20,
            ..Default::default()
        };
        let cache = CacheManager::new(config).await.unwrap();
        cache
            .set("k", "v", Some(&CacheConfigOverride::default().max_age(5)))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(cache.keys().await.unwrap().is_empty());
        let stats = cache.get_stats().await;
        assert_eq!(stats.eviction_count, 1);
        assert!(stats.last_cleanup > 0);
    }
}
