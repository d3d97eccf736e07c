//! Cache configuration.
//!
//! A [`CacheManager`](crate::CacheManager) keeps one immutable [`CacheConfig`] snapshot. Per-call
//! and runtime changes are expressed as a [`CacheConfigOverride`] merged on top of it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::entry::Priority;
use crate::error::CacheError;

/// One kibibyte.
pub const KB: u64 = 1024;
/// One mebibyte.
pub const MB: u64 = 1024 * KB;

/// One minute in milliseconds.
pub const MINUTE_MS: i64 = 60_000;
/// One hour in milliseconds.
pub const HOUR_MS: i64 = 60 * MINUTE_MS;
/// One day in milliseconds.
pub const DAY_MS: i64 = 24 * HOUR_MS;

/// Backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageStrategy {
    #[default]
    Memory,
    LocalPersisted,
    SessionPersisted,
    IndexedRecord,
    /// Recognised but without a backend; falls back to [`StorageStrategy::Memory`].
    Http,
    /// Memory tier in front of a local-persisted tier.
    Hybrid,
}

impl StorageStrategy {
    /// The wire name of this strategy.
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageStrategy::Memory => "memory",
            StorageStrategy::LocalPersisted => "local-persisted",
            StorageStrategy::SessionPersisted => "session-persisted",
            StorageStrategy::IndexedRecord => "indexed-record",
            StorageStrategy::Http => "http",
            StorageStrategy::Hybrid => "hybrid",
        }
    }
}

/// How `expires_at` is derived when an item is written.
///
/// Every variant except [`ExpirationStrategy::Never`] computes `now + max_age` at write time.
/// `Sliding` is accepted but does not renew the deadline on access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpirationStrategy {
    Absolute,
    #[default]
    Relative,
    Sliding,
    Never,
}

impl ExpirationStrategy {
    /// Compute the expiry deadline of an item written at `now_ms`.
    ///
    /// Returns `0` (never expires) for `Never` or a non-positive `max_age`.
    pub fn expires_at(&self, now_ms: i64, max_age_ms: i64) -> i64 {
        match self {
            ExpirationStrategy::Never => 0,
            _ if max_age_ms <= 0 => 0,
            ExpirationStrategy::Absolute
            | ExpirationStrategy::Relative
            | ExpirationStrategy::Sliding => now_ms.saturating_add(max_age_ms),
        }
    }
}

/// Base encoding applied to cache items before they reach a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SerializerKind {
    #[default]
    Json,
    Binary,
    Base64,
}

/// Configuration of one cache manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheConfig {
    /// Which backend stores the items.
    pub strategy: StorageStrategy,

    /// Byte budget. Eviction starts above 90% and stops at 80% of this value.
    pub max_size: u64,

    /// Default time-to-live in milliseconds.
    pub max_age: i64,

    pub expiration_strategy: ExpirationStrategy,

    /// Priority given to items written without an explicit one.
    pub priority: Priority,

    /// Tags attached to every item written with this config.
    pub tags: BTreeSet<String>,

    /// Durability hint. The backend selected by `strategy` decides actual durability.
    pub persist: bool,

    /// Wrap the serializer with the run-length compressor. Takes precedence over `encrypt`.
    pub compress: bool,

    /// Wrap the serializer with the XOR encryptor. Ignored when `compress` is also set.
    pub encrypt: bool,

    /// Secret used by the encryptor.
    pub encryption_key: String,

    /// Stored on every item as `metadata.version`.
    pub version: String,

    /// Key prefix isolating this cache inside a shared backend.
    pub namespace: String,

    pub serializer: SerializerKind,

    /// Period of the background cleanup task in milliseconds.
    pub cleanup_interval_ms: u64,

    /// File backing the local-persisted area or the indexed-record database.
    ///
    /// `None` keeps the data in process memory.
    pub storage_path: Option<PathBuf>,

    /// Hard capacity of the backing storage in bytes: the memory store's cap and the
    /// persisted area's quota. The effective capacity is never below `max_size`.
    pub quota_bytes: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            strategy: StorageStrategy::Memory,
            max_size: 50 * MB,
            max_age: HOUR_MS,
            expiration_strategy: ExpirationStrategy::Relative,
            priority: Priority::Normal,
            tags: BTreeSet::new(),
            persist: false,
            compress: false,
            encrypt: false,
            encryption_key: "multistore-cache".to_string(),
            version: "1.0.0".to_string(),
            namespace: "cache".to_string(),
            serializer: SerializerKind::Json,
            cleanup_interval_ms: 5 * MINUTE_MS as u64,
            storage_path: None,
            quota_bytes: 5 * MB,
        }
    }
}

impl CacheConfig {
    /// Reject configurations the cache cannot operate with.
    pub fn validate(&self) -> Result<(), CacheError> {
        if self.max_size == 0 {
            return Err(CacheError::InvalidConfig(
                "maxSize must be greater than zero".to_string(),
            ));
        }
        if self.max_age < 0 {
            return Err(CacheError::InvalidConfig(
                "maxAge must not be negative".to_string(),
            ));
        }
        if self.namespace.is_empty() {
            return Err(CacheError::InvalidConfig(
                "namespace must not be empty".to_string(),
            ));
        }
        if self.cleanup_interval_ms == 0 {
            return Err(CacheError::InvalidConfig(
                "cleanupIntervalMs must be greater than zero".to_string(),
            ));
        }
        if self.encrypt && self.encryption_key.is_empty() {
            return Err(CacheError::InvalidConfig(
                "encryptionKey is required when encrypt is enabled".to_string(),
            ));
        }
        Ok(())
    }

    /// Return a copy of this config with `overrides` applied.
    ///
    /// `self` is left untouched.
    pub fn merged(&self, overrides: &CacheConfigOverride) -> CacheConfig {
        let mut config = self.clone();
        overrides.apply_to(&mut config);
        config
    }

    /// Returns `true` if stored items are plain JSON text, readable by backends that index
    /// item fields.
    pub fn stores_plain_json(&self) -> bool {
        self.serializer == SerializerKind::Json && !self.compress && !self.encrypt
    }

    /// Hard capacity of the backing storage: `quota_bytes`, but never below `max_size`.
    pub fn capacity(&self) -> u64 {
        self.quota_bytes.max(self.max_size)
    }

    /// Byte usage above which eviction runs.
    pub fn eviction_threshold(&self) -> u64 {
        self.max_size / 10 * 9 + self.max_size % 10 * 9 / 10
    }

    /// Byte usage eviction reduces to.
    pub fn eviction_target(&self) -> u64 {
        self.max_size / 10 * 8 + self.max_size % 10 * 8 / 10
    }
}

/// Partial configuration. `None` fields keep the base value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheConfigOverride {
    pub strategy: Option<StorageStrategy>,
    pub max_size: Option<u64>,
    pub max_age: Option<i64>,
    pub expiration_strategy: Option<ExpirationStrategy>,
    pub priority: Option<Priority>,
    pub tags: Option<BTreeSet<String>>,
    pub persist: Option<bool>,
    pub compress: Option<bool>,
    pub encrypt: Option<bool>,
    pub encryption_key: Option<String>,
    pub version: Option<String>,
    pub namespace: Option<String>,
    pub serializer: Option<SerializerKind>,
    pub cleanup_interval_ms: Option<u64>,
    pub storage_path: Option<PathBuf>,
    pub quota_bytes: Option<u64>,
}

impl CacheConfigOverride {
    /// Override the time-to-live.
    pub fn max_age(mut self, max_age_ms: i64) -> Self {
        self.max_age = Some(max_age_ms);
        self
    }

    /// Override the item priority.
    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Override the tag set.
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    /// Override the expiration strategy.
    pub fn expiration_strategy(mut self, strategy: ExpirationStrategy) -> Self {
        self.expiration_strategy = Some(strategy);
        self
    }

    /// Override the backend selector.
    pub fn strategy(mut self, strategy: StorageStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    fn apply_to(&self, config: &mut CacheConfig) {
        if let Some(v) = self.strategy {
            config.strategy = v;
        }
        if let Some(v) = self.max_size {
            config.max_size = v;
        }
        if let Some(v) = self.max_age {
            config.max_age = v;
        }
        if let Some(v) = self.expiration_strategy {
            config.expiration_strategy = v;
        }
        if let Some(v) = self.priority {
            config.priority = v;
        }
        if let Some(v) = &self.tags {
            config.tags = v.clone();
        }
        if let Some(v) = self.persist {
            config.persist = v;
        }
        if let Some(v) = self.compress {
            config.compress = v;
        }
        if let Some(v) = self.encrypt {
            config.encrypt = v;
        }
        if let Some(v) = &self.encryption_key {
            config.encryption_key = v.clone();
        }
        if let Some(v) = &self.version {
            config.version = v.clone();
        }
        if let Some(v) = &self.namespace {
            config.namespace = v.clone();
        }
        if let Some(v) = self.serializer {
            config.serializer = v;
        }
        if let Some(v) = self.cleanup_interval_ms {
            config.cleanup_interval_ms = v;
        }
        if let Some(v) = &self.storage_path {
            config.storage_path = Some(v.clone());
        }
        if let Some(v) = self.quota_bytes {
            config.quota_bytes = v;
        }
    }
}
