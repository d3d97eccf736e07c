use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Eviction priority of a cache item.
///
/// Serialized as its numeric weight (`low = 1` … `critical = 4`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Priority {
    Low = 1,
    #[default]
    Normal = 2,
    High = 3,
    Critical = 4,
}

impl From<Priority> for u8 {
    fn from(priority: Priority) -> Self {
        priority as u8
    }
}

impl TryFrom<u8> for Priority {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Priority::Low),
            2 => Ok(Priority::Normal),
            3 => Ok(Priority::High),
            4 => Ok(Priority::Critical),
            other => Err(format!("unknown priority {}", other)),
        }
    }
}

/// A cached value together with its bookkeeping.
///
/// This is the exact shape written to the backends (field names in camelCase).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheItem<V> {
    /// The cache key (without namespace prefix).
    pub key: String,

    /// The cached value.
    pub value: V,

    /// Creation time, unix milliseconds.
    pub timestamp: i64,

    /// Unix milliseconds after which the item is expired. `0` means never.
    #[serde(default)]
    pub expires_at: i64,

    /// Number of successful reads. Never decreases while the item is alive.
    #[serde(default)]
    pub access_count: u64,

    /// Time of the most recent read (or creation), unix milliseconds.
    pub last_accessed: i64,

    /// Estimated serialized byte length of `value`.
    #[serde(default)]
    pub size: u64,

    #[serde(default)]
    pub priority: Priority,

    /// Labels for bulk queries. Only membership matters.
    #[serde(default)]
    pub tags: BTreeSet<String>,

    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl<V> CacheItem<V> {
    /// Check if the item is still live at `now_ms`.
    ///
    /// An item is live iff it never expires or `now_ms <= expires_at`.
    pub fn is_live(&self, now_ms: i64) -> bool {
        self.expires_at == 0 || now_ms <= self.expires_at
    }

    /// Check if the item has expired and should not be served.
    pub fn is_expired(&self, now_ms: i64) -> bool {
        !self.is_live(now_ms)
    }

    /// Check tag membership.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Record a successful read.
    pub fn touch(&mut self, now_ms: i64) {
        self.access_count = self.access_count.saturating_add(1);
        self.last_accessed = now_ms;
    }
}
