use async_trait::async_trait;
use rusqlite::{OptionalExtension, params};
use std::path::PathBuf;
use tokio_rusqlite::Connection;

use crate::error::CacheError;
use crate::store::Store;
use crate::utils::{byte_len, now_ms, peek_item_times};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS cache_records (
    namespace TEXT NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    timestamp INTEGER NOT NULL,
    expires_at INTEGER NOT NULL DEFAULT 0,
    size INTEGER NOT NULL,
    PRIMARY KEY (namespace, key)
) WITHOUT ROWID;
CREATE INDEX IF NOT EXISTS idx_cache_records_timestamp ON cache_records(namespace, timestamp);
CREATE INDEX IF NOT EXISTS idx_cache_records_expires_at ON cache_records(namespace, expires_at);
"#;

/// Configuration for IndexedStore.
#[derive(Debug, Clone)]
pub struct IndexedStoreConfig {
    /// Database file. `None` opens a private in-memory database.
    pub path: Option<PathBuf>,

    /// Records are isolated per namespace inside the database.
    pub namespace: String,
}

impl Default for IndexedStoreConfig {
    fn default() -> Self {
        IndexedStoreConfig {
            path: None,
            namespace: "indexed_cache".to_string(),
        }
    }
}

/// Indexed-record store backed by SQLite.
///
/// Each value is kept as a `{key, value, timestamp, expires_at, size}` record keyed by
/// `(namespace, key)`, with secondary indexes on `timestamp` and `expires_at`. `timestamp` and
/// `expires_at` are read from the stored JSON item when it is plain JSON; otherwise the write time
/// and "never" are recorded.
///
/// This is the only store that finds expired keys without a full scan.
pub struct IndexedStore {
    conn: Connection,
    namespace: String,
}

fn db_error(key: &str, e: tokio_rusqlite::Error) -> CacheError {
    CacheError::storage("indexed", key, e.to_string())
}

impl IndexedStore {
    /// Open the database and create the schema if needed.
    ///
    /// # Example
    /// ```ignore
    /// let store = IndexedStore::open(IndexedStoreConfig::default()).await?;
    /// ```
    pub async fn open(config: IndexedStoreConfig) -> Result<Self, CacheError> {
        let conn = match &config.path {
            Some(path) => Connection::open(path).await,
            None => Connection::open_in_memory().await,
        }
        .map_err(|e| db_error("", e))?;

        conn.call(|conn| conn.execute_batch(SCHEMA).map_err(|e| e.into()))
            .await
            .map_err(|e| db_error("", e))?;

        tracing::debug!(
            "Indexed store opened: namespace={}, path={:?}",
            config.namespace,
            config.path
        );

        Ok(IndexedStore {
            conn,
            namespace: config.namespace,
        })
    }

    /// Keys whose `expires_at` lies before `now_ms`, oldest deadline first.
    pub async fn get_expired_keys(&self, now_ms: i64) -> Result<Vec<String>, CacheError> {
        let namespace = self.namespace.clone();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare_cached(
                    "SELECT key FROM cache_records \
                     WHERE namespace = ?1 AND expires_at > 0 AND expires_at < ?2 \
                     ORDER BY expires_at",
                )?;
                let keys = stmt
                    .query_map(params![namespace, now_ms], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(|e| db_error("", e))
    }

    /// Delete every expired record. Returns the number of deleted records.
    pub async fn cleanup_expired(&self) -> Result<usize, CacheError> {
        let namespace = self.namespace.clone();
        let now = now_ms();
        let deleted = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "DELETE FROM cache_records \
                     WHERE namespace = ?1 AND expires_at > 0 AND expires_at < ?2",
                    params![namespace, now],
                )
                .map_err(|e| e.into())
            })
            .await
            .map_err(|e| db_error("", e))?;

        tracing::debug!(
            "Indexed store removed expired records: namespace={}, deleted={}",
            self.namespace,
            deleted
        );
        Ok(deleted)
    }
}

#[async_trait]
impl Store for IndexedStore {
    fn name(&self) -> &'static str {
        "indexed"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let namespace = self.namespace.clone();
        let k = key.to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare_cached(
                    "SELECT value FROM cache_records WHERE namespace = ?1 AND key = ?2",
                )?;
                let value = stmt
                    .query_row(params![namespace, k], |row| row.get::<_, String>(0))
                    .optional()?;
                Ok(value)
            })
            .await
            .map_err(|e| db_error(key, e))
    }

    async fn set(&self, key: &str, value: String) -> Result<(), CacheError> {
        let namespace = self.namespace.clone();
        let k = key.to_string();
        let (timestamp, expires_at) = peek_item_times(&value).unwrap_or((now_ms(), 0));
        let size = byte_len(&value) as i64;

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT OR REPLACE INTO cache_records \
                     (namespace, key, value, timestamp, expires_at, size) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![namespace, k, value, timestamp, expires_at, size],
                )
                .map_err(|e| e.into())
            })
            .await
            .map_err(|e| db_error(key, e))?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        let namespace = self.namespace.clone();
        let k = key.to_string();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "DELETE FROM cache_records WHERE namespace = ?1 AND key = ?2",
                    params![namespace, k],
                )
                .map_err(|e| e.into())
            })
            .await
            .map_err(|e| db_error(key, e))?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        let namespace = self.namespace.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "DELETE FROM cache_records WHERE namespace = ?1",
                    params![namespace],
                )
                .map_err(|e| e.into())
            })
            .await
            .map_err(|e| db_error("", e))?;
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, CacheError> {
        let namespace = self.namespace.clone();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare_cached(
                    "SELECT key FROM cache_records WHERE namespace = ?1 ORDER BY timestamp",
                )?;
                let keys = stmt
                    .query_map(params![namespace], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(|e| db_error("", e))
    }

    async fn size(&self) -> Result<u64, CacheError> {
        let namespace = self.namespace.clone();
        let total = self
            .conn
            .call(move |conn| {
                conn.query_row(
                    "SELECT COALESCE(SUM(size), 0) FROM cache_records WHERE namespace = ?1",
                    params![namespace],
                    |row| row.get::<_, i64>(0),
                )
                .map_err(|e| e.into())
            })
            .await
            .map_err(|e| db_error("", e))?;
        Ok(total.max(0) as u64)
    }

    async fn expired_keys(&self, now_ms: i64) -> Result<Option<Vec<String>>, CacheError> {
        self.get_expired_keys(now_ms).await.map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item_json(key: &str, timestamp: i64, expires_at: i64) -> String {
        serde_json::json!({
            "key": key,
            "value": 1,
            "timestamp": timestamp,
            "expiresAt": expires_at,
            "lastAccessed": timestamp,
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_get_set_remove() {
        let store = IndexedStore::open(IndexedStoreConfig::default()).await.unwrap();

        assert!(store.get("key1").await.unwrap().is_none());

        store.set("key1", "value1".to_string()).await.unwrap();
        assert_eq!(store.get("key1").await.unwrap().as_deref(), Some("value1"));
        assert_eq!(store.size().await.unwrap(), 6);

        store.set("key1", "v".to_string()).await.unwrap();
        assert_eq!(store.size().await.unwrap(), 1);

        store.remove("key1").await.unwrap();
        assert!(store.get("key1").await.unwrap().is_none());
        assert_eq!(store.size().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_expired_keys_use_index() {
        let store = IndexedStore::open(IndexedStoreConfig::default()).await.unwrap();
        let now = now_ms();

        store
            .set("gone", item_json("gone", now - 2_000, now - 1_000))
            .await
            .unwrap();
        store
            .set("alive", item_json("alive", now, now + 60_000))
            .await
            .unwrap();
        store
            .set("forever", item_json("forever", now, 0))
            .await
            .unwrap();

        let expired = store.get_expired_keys(now).await.unwrap();
        assert_eq!(expired, vec!["gone".to_string()]);
        assert_eq!(
            store.expired_keys(now).await.unwrap(),
            Some(vec!["gone".to_string()])
        );

        assert_eq!(store.cleanup_expired().await.unwrap(), 1);
        let mut keys = store.keys().await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["alive".to_string(), "forever".to_string()]);
    }

    #[tokio::test]
    async fn test_namespaces_are_isolated_in_one_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.db");

        let a = IndexedStore::open(IndexedStoreConfig {
            path: Some(path.clone()),
            namespace: "a".to_string(),
        })
        .await
        .unwrap();
        let b = IndexedStore::open(IndexedStoreConfig {
            path: Some(path),
            namespace: "b".to_string(),
        })
        .await
        .unwrap();

        a.set("k", "from-a".to_string()).await.unwrap();
        b.set("k", "from-b".to_string()).await.unwrap();
        a.clear().await.unwrap();

        assert!(a.get("k").await.unwrap().is_none());
        assert_eq!(b.get("k").await.unwrap().as_deref(), Some("from-b"));
    }
}
