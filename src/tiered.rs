use async_trait::async_trait;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;

use crate::error::CacheError;
use crate::store::Store;

/// TieredStore is a store that checks multiple stores in order.
///
/// Stores are checked in the order they are provided.
/// The first store to return a value will be used to populate all previous stores.
/// Population runs in the background and skips tiers that already hold the key, so a write made
/// after the read (such as recording the access) is not overwritten by the older value.
/// Writes, removals and clears go to every tier.
pub struct TieredStore {
    tiers: Vec<Arc<dyn Store>>,
}

impl TieredStore {
    /// Create a new tiered store.
    ///
    /// `stores` can accept `None` as members to allow you to construct the tiers dynamically.
    ///
    /// # Example
    /// ```ignore
    /// TieredStore::new(vec![
    ///     Some(Arc::new(memory_store)),
    ///     if persist { Some(Arc::new(local_store)) } else { None },
    /// ])
    /// ```
    pub fn new(stores: Vec<Option<Arc<dyn Store>>>) -> Self {
        let tiers = stores.into_iter().flatten().collect();
        TieredStore { tiers }
    }

    /// Create a tiered store from a vec of stores (no optional filtering).
    pub fn from_stores(stores: Vec<Arc<dyn Store>>) -> Self {
        TieredStore { tiers: stores }
    }

    async fn on_all<'a, F, Fut>(&'a self, op: F) -> Result<(), CacheError>
    where
        F: Fn(&'a Arc<dyn Store>) -> Fut,
        Fut: std::future::Future<Output = Result<(), CacheError>> + 'a,
    {
        let results = join_all(self.tiers.iter().map(op)).await;

        // Return first error if any
        for result in results {
            result?;
        }

        Ok(())
    }
}

#[async_trait]
impl Store for TieredStore {
    fn name(&self) -> &'static str {
        "tiered"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        for (i, tier) in self.tiers.iter().enumerate() {
            let Some(value) = tier.get(key).await? else {
                continue;
            };

            // Fill all lower (earlier) tiers with this value in the background
            if i > 0 {
                let lower_tiers: Vec<_> = self.tiers[..i].to_vec();
                let value_clone = value.clone();
                let key_clone = key.to_string();

                tokio::spawn(async move {
                    for tier in lower_tiers {
                        match tier.get(&key_clone).await {
                            Ok(Some(_)) => continue,
                            Ok(None) => {}
                            Err(e) => {
                                tracing::warn!(
                                    "Failed to check lower tier: tier={}, key={}, error={}",
                                    tier.name(),
                                    key_clone,
                                    e
                                );
                                continue;
                            }
                        }
                        match tier.set(&key_clone, value_clone.clone()).await {
                            Ok(_) => {
                                tracing::debug!(
                                    "Successfully populated lower tier: tier={}, key={}",
                                    tier.name(),
                                    key_clone
                                );
                            }
                            Err(e) => {
                                tracing::warn!(
                                    "Failed to populate lower tier: tier={}, key={}, error={}",
                                    tier.name(),
                                    key_clone,
                                    e
                                );
                            }
                        }
                    }
                });
            }

            return Ok(Some(value));
        }

        Ok(None)
    }

    async fn set(&self, key: &str, value: String) -> Result<(), CacheError> {
        self.on_all(|tier| tier.set(key, value.clone())).await
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.on_all(|tier| tier.remove(key)).await
    }

    async fn clear(&self) -> Result<(), CacheError> {
        self.on_all(|tier| tier.clear()).await
    }

    async fn keys(&self) -> Result<Vec<String>, CacheError> {
        let mut seen = HashSet::new();
        let mut keys = Vec::new();
        for tier in &self.tiers {
            for key in tier.keys().await? {
                if seen.insert(key.clone()) {
                    keys.push(key);
                }
            }
        }
        Ok(keys)
    }

    /// The usage of the fullest tier.
    async fn size(&self) -> Result<u64, CacheError> {
        let mut max = 0;
        for tier in &self.tiers {
            max = max.max(tier.size().await?);
        }
        Ok(max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::memory::{MemoryStore, MemoryStoreConfig};

    #[tokio::test]
    async fn test_tiered_get_populates_lower_tiers() {
        let l1: Arc<dyn Store> = Arc::new(MemoryStore::new(MemoryStoreConfig::default()));
        let l2: Arc<dyn Store> = Arc::new(MemoryStore::new(MemoryStoreConfig::default()));

        // Set value only in L2
        l2.set("key1", "value1".to_string()).await.unwrap();

        // L1 should be empty
        assert!(l1.get("key1").await.unwrap().is_none());

        let tiered = TieredStore::from_stores(vec![l1.clone(), l2.clone()]);

        // Get from tiered - should find in L2
        let result = tiered.get("key1").await.unwrap();
        assert_eq!(result.as_deref(), Some("value1"));

        // Wait for background population
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        // L1 should now have the value
        assert_eq!(l1.get("key1").await.unwrap().as_deref(), Some("value1"));
    }

    #[tokio::test]
    async fn test_population_keeps_newer_lower_tier_value() {
        let l1: Arc<dyn Store> = Arc::new(MemoryStore::new(MemoryStoreConfig::default()));
        let l2: Arc<dyn Store> = Arc::new(MemoryStore::new(MemoryStoreConfig::default()));
        l2.set("key1", "old".to_string()).await.unwrap();

        let tiered = TieredStore::from_stores(vec![l1.clone(), l2.clone()]);
        assert_eq!(tiered.get("key1").await.unwrap().as_deref(), Some("old"));

        // Written before the background population gets to run
        tiered.set("key1", "new".to_string()).await.unwrap();
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        assert_eq!(l1.get("key1").await.unwrap().as_deref(), Some("new"));
        assert_eq!(l2.get("key1").await.unwrap().as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_tiered_writes_to_all_tiers() {
        let l1: Arc<dyn Store> = Arc::new(MemoryStore::new(MemoryStoreConfig::default()));
        let l2: Arc<dyn Store> = Arc::new(MemoryStore::new(MemoryStoreConfig::default()));
        let tiered = TieredStore::new(vec![Some(l1.clone()), None, Some(l2.clone())]);

        tiered.set("a", "1".to_string()).await.unwrap();
        tiered.set("b", "22".to_string()).await.unwrap();
        assert_eq!(l1.keys().await.unwrap().len(), 2);
        assert_eq!(l2.keys().await.unwrap().len(), 2);
        assert_eq!(tiered.keys().await.unwrap().len(), 2);
        assert_eq!(tiered.size().await.unwrap(), 3);

        tiered.remove("a").await.unwrap();
        assert!(l2.get("a").await.unwrap().is_none());

        tiered.clear().await.unwrap();
        assert!(tiered.keys().await.unwrap().is_empty());
    }
}
