//! multistore-cache - A multi-backend cache engine for Rust
//!
//! This library provides a client-side cache with:
//! - Pluggable storage backends (memory, file-persisted, session, SQLite-indexed, hybrid)
//! - Per-item time-to-live, priorities and tags
//! - Size-budgeted eviction (lowest priority, least recently accessed first)
//! - A serializer chain with optional compression or encryption
//! - Hit/miss statistics and synchronous event listeners
//!
//! # Example
//!
//! ```ignore
//! use multistore_cache::{CacheConfigOverride, CacheEventKind, CacheRegistry, Preset};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), multistore_cache::CacheError> {
//!     let registry = CacheRegistry::new();
//!     let users = registry.create_preset("users", Preset::Memory).await?;
//!
//!     users.on(CacheEventKind::Evict, |event| println!("evicted {:?}", event.key));
//!
//!     users
//!         .set("user:123", "Ada", Some(&CacheConfigOverride::default().tags(["users"])))
//!         .await?;
//!     let name: Option<String> = users.get("user:123").await;
//!     assert_eq!(name.as_deref(), Some("Ada"));
//!
//!     users.delete_by_tag("users").await?;
//!     Ok(())
//! }
//! ```

mod config;
mod entry;
mod error;
mod events;
mod eviction;
mod manager;
mod presets;
mod registry;
pub mod serialization;
mod stats;
mod store;
pub mod stores;
mod tiered;
mod utils;

// Re-export public API
pub use config::{
    CacheConfig, CacheConfigOverride, DAY_MS, ExpirationStrategy, HOUR_MS, KB, MB, MINUTE_MS,
    SerializerKind, StorageStrategy,
};
pub use entry::{CacheItem, Priority};
pub use error::CacheError;
pub use events::{CacheEvent, CacheEventKind, Listener, ListenerId, ListenerRegistry};
pub use eviction::{EvictionCandidate, expired_keys, needs_eviction, plan_eviction};
pub use manager::CacheManager;
pub use presets::Preset;
pub use registry::CacheRegistry;
pub use serialization::{Serializer, build_serializer};
pub use stats::CacheStats;
pub use store::Store;
pub use stores::{IndexedStore, IndexedStoreConfig, MemoryStore, MemoryStoreConfig};
pub use stores::{LocalStore, PersistedStore, PersistedStoreConfig, SessionStore};
pub use tiered::TieredStore;
pub use utils::build_cache_key;
