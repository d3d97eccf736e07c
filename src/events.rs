//! Cache events and the listener registry.
//!
//! Every manager operation emits one or more [`CacheEvent`]s synchronously to the listeners
//! registered for that kind.
//!
//! # Example
//!
//! ```ignore
//! use multistore_cache::{CacheEventKind, CacheManager};
//!
//! let id = manager.on(CacheEventKind::Miss, |event| {
//!     println!("miss for {:?}", event.key);
//! });
//! manager.off(CacheEventKind::Miss, id);
//! ```

use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::utils::now_ms;

/// Kind of a cache event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CacheEventKind {
    /// An item was written.
    Set,
    /// A read completed, whatever its outcome.
    Get,
    /// An existing item was deleted.
    Delete,
    /// The cache was emptied.
    Clear,
    /// An item was found past its deadline and removed.
    Expire,
    /// A live item was removed to free space.
    Evict,
    /// A read found a live item.
    Hit,
    /// A read found nothing usable.
    Miss,
}

/// A single cache event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheEvent {
    pub kind: CacheEventKind,
    /// The affected key. `None` for [`CacheEventKind::Clear`].
    pub key: Option<String>,
    /// The value written or read, when there is one.
    pub value: Option<serde_json::Value>,
    /// Emission time, unix milliseconds.
    pub timestamp: i64,
}

impl CacheEvent {
    /// Create an event stamped with the current time.
    pub fn new(kind: CacheEventKind, key: Option<&str>, value: Option<serde_json::Value>) -> Self {
        CacheEvent {
            kind,
            key: key.map(str::to_string),
            value,
            timestamp: now_ms(),
        }
    }
}

/// Handle returned by [`ListenerRegistry::on`], used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// A registered event callback.
pub type Listener = Arc<dyn Fn(&CacheEvent) + Send + Sync>;

/// Synchronous observer registry.
///
/// A panicking listener is caught and logged; it interrupts neither the emitting operation nor
/// the remaining listeners.
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: RwLock<HashMap<CacheEventKind, Vec<(ListenerId, Listener)>>>,
    next_id: AtomicU64,
}

impl ListenerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` for events of `kind`.
    pub fn on<F>(&self, kind: CacheEventKind, listener: F) -> ListenerId
    where
        F: Fn(&CacheEvent) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .entry(kind)
            .or_default()
            .push((id, Arc::new(listener)));
        id
    }

    /// Unregister a listener. Returns `false` if it was not registered for `kind`.
    pub fn off(&self, kind: CacheEventKind, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let Some(registered) = listeners.get_mut(&kind) else {
            return false;
        };
        let before = registered.len();
        registered.retain(|(registered_id, _)| *registered_id != id);
        before != registered.len()
    }

    /// Number of listeners registered for `kind`.
    pub fn count(&self, kind: CacheEventKind) -> usize {
        self.listeners.read().get(&kind).map_or(0, Vec::len)
    }

    /// Deliver `event` to every listener registered for its kind.
    pub fn emit(&self, event: &CacheEvent) {
        // Listeners run without the lock held so they may register or unregister.
        let targets: Vec<Listener> = match self.listeners.read().get(&event.kind) {
            Some(registered) => registered.iter().map(|(_, l)| l.clone()).collect(),
            None => return,
        };

        for listener in targets {
            if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                tracing::error!(
                    "Cache event listener panicked: kind={:?}, key={:?}",
                    event.kind,
                    event.key
                );
            }
        }
    }
}
