use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use tokio::sync::RwLock;

use crate::error::CacheError;
use crate::store::Store;
use crate::utils::byte_len;

/// Configuration for MemoryStore.
#[derive(Debug, Clone)]
pub struct MemoryStoreConfig {
    /// Byte cap of the store itself.
    ///
    /// When a write pushes the running total above this value, the oldest inserted entries are
    /// dropped until it fits again. This is a safety valve independent of the manager's
    /// priority-aware eviction.
    pub max_bytes: u64,
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        MemoryStoreConfig {
            max_bytes: 50 * crate::config::MB,
        }
    }
}

#[derive(Default)]
struct State {
    entries: HashMap<String, String>,
    /// Insertion order. Overwriting a key keeps its original position.
    order: VecDeque<String>,
    bytes: u64,
}

impl State {
    fn remove(&mut self, key: &str) -> bool {
        let Some(old) = self.entries.remove(key) else {
            return false;
        };
        self.bytes -= byte_len(&old);
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        true
    }
}

/// In-memory store using a HashMap with a running byte counter.
///
/// Data lives only as long as the store instance.
pub struct MemoryStore {
    state: RwLock<State>,
    max_bytes: u64,
}

impl MemoryStore {
    /// Create a new MemoryStore with the given configuration.
    pub fn new(config: MemoryStoreConfig) -> Self {
        MemoryStore {
            state: RwLock::new(State::default()),
            max_bytes: config.max_bytes,
        }
    }

    /// Drop oldest entries until the byte total fits, never touching `keep`.
    fn sweep(state: &mut State, max_bytes: u64, keep: &str) -> usize {
        let mut removed = 0;
        while state.bytes > max_bytes {
            let Some(victim) = state.order.iter().find(|k| k.as_str() != keep).cloned() else {
                break;
            };
            state.remove(&victim);
            removed += 1;
        }
        removed
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let state = self.state.read().await;
        Ok(state.entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), CacheError> {
        let mut state = self.state.write().await;

        let added = byte_len(&value);
        match state.entries.insert(key.to_string(), value) {
            Some(old) => state.bytes -= byte_len(&old),
            None => state.order.push_back(key.to_string()),
        }
        state.bytes += added;

        if state.bytes > self.max_bytes {
            let removed = Self::sweep(&mut state, self.max_bytes, key);
            tracing::debug!(
                "Memory store over its cap: removed={}, bytes={}, max_bytes={}",
                removed,
                state.bytes,
                self.max_bytes
            );
        }

        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        let mut state = self.state.write().await;
        state.remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        let mut state = self.state.write().await;
        *state = State::default();
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, CacheError> {
        let state = self.state.read().await;
        Ok(state.order.iter().cloned().collect())
    }

    async fn size(&self) -> Result<u64, CacheError> {
        Ok(self.state.read().await.bytes)
    }
}
