//! Eviction and expiration planning.
//!
//! These functions only decide *which* keys to remove from a snapshot of items; the manager
//! applies the decision against its store.

use crate::entry::{CacheItem, Priority};

/// What the planner needs to know about one stored item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvictionCandidate {
    pub key: String,
    /// Bytes the stored representation occupies in the backend.
    pub bytes: u64,
    pub priority: Priority,
    pub last_accessed: i64,
}

impl EvictionCandidate {
    /// Build a candidate from a decoded item and its stored byte length.
    pub fn from_item<V>(item: &CacheItem<V>, bytes: u64) -> Self {
        EvictionCandidate {
            key: item.key.clone(),
            bytes,
            priority: item.priority,
            last_accessed: item.last_accessed,
        }
    }

    /// Candidate for an entry that could not be decoded. It sorts before every valid item.
    pub fn unreadable(key: impl Into<String>, bytes: u64) -> Self {
        EvictionCandidate {
            key: key.into(),
            bytes,
            priority: Priority::Low,
            last_accessed: i64::MIN,
        }
    }
}

/// Returns `true` when `usage` is above the eviction threshold.
pub fn needs_eviction(usage: u64, threshold: u64) -> bool {
    usage > threshold
}

/// Choose the keys to evict so that `usage` drops to at most `target`.
///
/// Items are ordered by priority (lowest first), then by last access (oldest first); ties keep
/// the input order. Keys are taken from the front of that ordering in a single greedy pass and
/// nothing is chosen once the target is reached.
pub fn plan_eviction(
    mut candidates: Vec<EvictionCandidate>,
    usage: u64,
    target: u64,
) -> Vec<String> {
    candidates.sort_by_key(|c| (c.priority, c.last_accessed));

    let mut remaining = usage;
    let mut victims = Vec::new();
    for candidate in candidates {
        if remaining <= target {
            break;
        }
        remaining = remaining.saturating_sub(candidate.bytes);
        victims.push(candidate.key);
    }
    victims
}

/// Keys of the items that are expired at `now_ms`.
pub fn expired_keys<'a, V: 'a>(
    items: impl IntoIterator<Item = &'a CacheItem<V>>,
    now_ms: i64,
) -> Vec<String> {
    items
        .into_iter()
        .filter(|item| item.is_expired(now_ms))
        .map(|item| item.key.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeSet, HashMap};

    fn candidate(
        key: &str,
        bytes: u64,
        priority: Priority,
        last_accessed: i64,
    ) -> EvictionCandidate {
        EvictionCandidate {
            key: key.to_string(),
            bytes,
            priority,
            last_accessed,
        }
    }

    #[test]
    fn test_lowest_priority_then_oldest_access_goes_first() {
        let candidates = vec![
            candidate("critical-old", 100, Priority::Critical, 1),
            candidate("normal-new", 100, Priority::Normal, 50),
            candidate("low-new", 100, Priority::Low, 40),
            candidate("normal-old", 100, Priority::Normal, 10),
            candidate("low-old", 100, Priority::Low, 5),
        ];

        let victims = plan_eviction(candidates, 500, 250);
        assert_eq!(victims, vec!["low-old", "low-new", "normal-old"]);
    }

    #[test]
    fn test_stops_at_target() {
        let candidates = vec![
            candidate("a", 300, Priority::Normal, 1),
            candidate("b", 300, Priority::Normal, 2),
            candidate("c", 300, Priority::Normal, 3),
        ];
        assert_eq!(plan_eviction(candidates.clone(), 900, 600), vec!["a"]);
        assert!(plan_eviction(candidates, 600, 600).is_empty());
    }

    #[test]
    fn test_ties_keep_input_order() {
        let candidates = vec![
            candidate("first", 10, Priority::Normal, 7),
            candidate("second", 10, Priority::Normal, 7),
        ];
        assert_eq!(plan_eviction(candidates, 20, 10), vec!["first"]);
    }

    #[test]
    fn test_unreadable_entries_go_first() {
        let candidates = vec![
            candidate("low", 10, Priority::Low, 0),
            EvictionCandidate::unreadable("garbage", 10),
        ];
        assert_eq!(plan_eviction(candidates, 20, 10), vec!["garbage"]);
    }

    #[test]
    fn test_expired_keys() {
        let item = |key: &str, expires_at: i64| CacheItem {
            key: key.to_string(),
            value: (),
            timestamp: 0,
            expires_at,
            access_count: 0,
            last_accessed: 0,
            size: 0,
            priority: Priority::Normal,
            tags: BTreeSet::new(),
            metadata: HashMap::new(),
        };
        let items = [item("never", 0), item("past", 99), item("future", 200)];
        assert_eq!(expired_keys(&items, 100), vec!["past".to_string()]);
        assert!(needs_eviction(922, 921));
        assert!(!needs_eviction(921, 921));
    }
}
