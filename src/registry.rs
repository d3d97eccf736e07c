//! Named cache managers.
//!
//! A [`CacheRegistry`] is an ordinary value: create one, share it by reference (or in an `Arc`),
//! and register managers under names. Separate registries never see each other's managers.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::CacheConfig;
use crate::error::CacheError;
use crate::manager::CacheManager;
use crate::presets::Preset;

/// Registry of cache managers keyed by name.
///
/// # Example
///
/// ```ignore
/// use multistore_cache::{CacheConfig, CacheRegistry, Preset};
///
/// let registry = CacheRegistry::new();
/// let users = registry.create_manager("users", CacheConfig::default()).await?;
/// let sessions = registry.create_preset("sessions", Preset::Session).await?;
///
/// // Later, anywhere the registry is reachable
/// let users = registry.get_manager("users").unwrap();
/// registry.remove_manager("sessions");
/// ```
#[derive(Default)]
pub struct CacheRegistry {
    managers: RwLock<HashMap<String, Arc<CacheManager>>>,
}

impl CacheRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the manager registered as `name`, creating it from `config` if there is none.
    ///
    /// When a manager already exists, `config` is ignored.
    pub async fn create_manager(
        &self,
        name: &str,
        config: CacheConfig,
    ) -> Result<Arc<CacheManager>, CacheError> {
        if let Some(existing) = self.get_manager(name) {
            tracing::debug!("Cache manager already registered: name={}", name);
            return Ok(existing);
        }

        let manager = Arc::new(CacheManager::new(config).await?);

        // Another caller may have registered the same name while the store was opening.
        let mut managers = self.managers.write();
        let registered = managers
            .entry(name.to_string())
            .or_insert_with(|| manager.clone())
            .clone();
        if !Arc::ptr_eq(&registered, &manager) {
            manager.shutdown();
        }
        Ok(registered)
    }

    /// Same as [`CacheRegistry::create_manager`] with the configuration of `preset`.
    pub async fn create_preset(
        &self,
        name: &str,
        preset: Preset,
    ) -> Result<Arc<CacheManager>, CacheError> {
        self.create_manager(name, preset.config()).await
    }

    /// Get a manager by name.
    ///
    /// Returns `None` if no manager is registered under `name`.
    pub fn get_manager(&self, name: &str) -> Option<Arc<CacheManager>> {
        self.managers.read().get(name).cloned()
    }

    /// Unregister `name` and stop its cleanup task.
    ///
    /// Returns `false` if nothing was registered. Clones of the manager held elsewhere keep
    /// working, but no longer clean up periodically.
    pub fn remove_manager(&self, name: &str) -> bool {
        let Some(manager) = self.managers.write().remove(name) else {
            return false;
        };
        manager.shutdown();
        true
    }

    /// Names of all registered managers, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.managers.read().keys().cloned().collect();
        names.sort();
        names
    }
}
