use crate::config::{CacheConfig, DAY_MS, HOUR_MS, MB, MINUTE_MS, StorageStrategy};
use crate::entry::Priority;
use crate::error::CacheError;
use crate::manager::CacheManager;

/// Ready-made configurations for common cache roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Preset {
    /// In-memory, 50 MiB, 1 hour.
    Memory,
    /// Local-persisted, 10 MiB, 24 hours.
    Persisted,
    /// Session-persisted, 5 MiB, 1 hour.
    Session,
    /// Indexed-record, 100 MiB, 7 days.
    Indexed,
    /// In-memory, 100 MiB, 30 minutes, high priority.
    HighPerformance,
    /// Local-persisted, 10 MiB, 30 days.
    Persistent,
    /// In-memory, 10 MiB, 5 minutes, low priority.
    Temporary,
}

impl Preset {
    pub const ALL: [Preset; 7] = [
        Preset::Memory,
        Preset::Persisted,
        Preset::Session,
        Preset::Indexed,
        Preset::HighPerformance,
        Preset::Persistent,
        Preset::Temporary,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Preset::Memory => "memory",
            Preset::Persisted => "persisted",
            Preset::Session => "session",
            Preset::Indexed => "indexed",
            Preset::HighPerformance => "high-performance",
            Preset::Persistent => "persistent",
            Preset::Temporary => "temporary",
        }
    }

    /// The configuration this preset stands for. Unlisted fields keep their defaults.
    pub fn config(&self) -> CacheConfig {
        let (strategy, max_size, max_age) = match self {
            Preset::Memory => (StorageStrategy::Memory, 50 * MB, HOUR_MS),
            Preset::Persisted => (StorageStrategy::LocalPersisted, 10 * MB, DAY_MS),
            Preset::Session => (StorageStrategy::SessionPersisted, 5 * MB, HOUR_MS),
            Preset::Indexed => (StorageStrategy::IndexedRecord, 100 * MB, 7 * DAY_MS),
            Preset::HighPerformance => (StorageStrategy::Memory, 100 * MB, 30 * MINUTE_MS),
            Preset::Persistent => (StorageStrategy::LocalPersisted, 10 * MB, 30 * DAY_MS),
            Preset::Temporary => (StorageStrategy::Memory, 10 * MB, 5 * MINUTE_MS),
        };
        let priority = match self {
            Preset::HighPerformance => Priority::High,
            Preset::Temporary => Priority::Low,
            _ => Priority::Normal,
        };

        CacheConfig {
            strategy,
            max_size,
            max_age,
            priority,
            persist: matches!(
                strategy,
                StorageStrategy::LocalPersisted | StorageStrategy::IndexedRecord
            ),
            ..Default::default()
        }
    }

    /// Build a manager with this preset's configuration.
    pub async fn build(&self) -> Result<CacheManager, CacheError> {
        CacheManager::new(self.config()).await
    }
}
