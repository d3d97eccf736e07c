//! Store implementations for the cache library.

pub mod area;
pub mod indexed;
pub mod memory;
pub mod persisted;

pub use area::{FileArea, MemoryArea, StorageArea};
pub use indexed::{IndexedStore, IndexedStoreConfig};
pub use memory::{MemoryStore, MemoryStoreConfig};
pub use persisted::{LocalStore, PersistedStore, PersistedStoreConfig, SessionStore};
