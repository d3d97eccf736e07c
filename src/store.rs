use async_trait::async_trait;

use crate::error::CacheError;

/// A store is a common interface for storing, reading and deleting string values.
///
/// Stores are opaque to the cache item layout: they only see the strings produced by the
/// serializer chain. Each store owns its namespace and is the only component that knows the raw
/// byte usage of its entries.
///
/// Implementations may be synchronous underneath; the manager always awaits them.
#[async_trait]
pub trait Store: Send + Sync {
    /// A name for logs and errors.
    ///
    /// # Example
    /// - "memory"
    /// - "local"
    /// - "indexed"
    fn name(&self) -> &'static str;

    /// Return the stored string.
    ///
    /// The response must be `None` for absent keys.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: String) -> Result<(), CacheError>;

    /// Remove the key. Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> Result<(), CacheError>;

    /// Remove every key owned by this store.
    async fn clear(&self) -> Result<(), CacheError>;

    /// List all keys owned by this store, without namespace prefix.
    async fn keys(&self) -> Result<Vec<String>, CacheError>;

    /// Total UTF-8 byte length of the stored values.
    async fn size(&self) -> Result<u64, CacheError>;

    /// Keys whose embedded expiry has passed at `now_ms`, if the store can find them without a
    /// full scan.
    ///
    /// Default implementation returns `None`, telling callers to scan.
    async fn expired_keys(&self, _now_ms: i64) -> Result<Option<Vec<String>>, CacheError> {
        Ok(None)
    }
}
