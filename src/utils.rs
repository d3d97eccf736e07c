//! Shared utilities for the cache library.

use std::fmt::Display;
use std::time::{SystemTime, UNIX_EPOCH};

/// Build a namespaced storage key.
///
/// Format: `{namespace}_{key}`
pub fn build_cache_key<N: Display + ?Sized>(namespace: &N, key: &str) -> String {
    format!("{}_{}", namespace, key)
}

/// Strip the namespace prefix added by [`build_cache_key`].
///
/// Returns `None` if `cache_key` does not belong to `namespace`.
pub fn strip_cache_key<'a>(namespace: &str, cache_key: &'a str) -> Option<&'a str> {
    cache_key
        .strip_prefix(namespace)
        .and_then(|rest| rest.strip_prefix('_'))
}

/// Get the current time in milliseconds since UNIX epoch.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

/// UTF-8 byte length of a stored string.
pub fn byte_len(value: &str) -> u64 {
    value.len() as u64
}

/// Read the embedded creation timestamp and expiry from a stored JSON cache item.
///
/// Values that are not plain JSON (compressed, encrypted or binary encodings) yield `None`.
pub fn peek_item_times(raw: &str) -> Option<(i64, i64)> {
    let value: serde_json::Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;
    let timestamp = object.get("timestamp").and_then(|v| v.as_i64())?;
    let expires_at = object.get("expiresAt").and_then(|v| v.as_i64()).unwrap_or(0);
    Some((timestamp, expires_at))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_cache_key() {
        let key = build_cache_key("users", "user:123");
        assert_eq!(key, "users_user:123");
    }

    #[test]
    fn test_strip_cache_key() {
        assert_eq!(strip_cache_key("users", "users_user:1"), Some("user:1"));
        assert_eq!(strip_cache_key("users", "usersx_user:1"), None);
        assert_eq!(strip_cache_key("users", "other_user:1"), None);
    }

    #[test]
    fn test_now_ms_is_positive() {
        let now = now_ms();
        assert!(now > 0);
    }

    #[test]
    fn test_byte_len_counts_utf8_bytes() {
        assert_eq!(byte_len("abc"), 3);
        assert_eq!(byte_len("é"), 2);
    }

    #[test]
    fn test_peek_item_times() {
        let raw = r#"{"key":"a","timestamp":10,"expiresAt":20}"#;
        assert_eq!(peek_item_times(raw), Some((10, 20)));
        assert_eq!(peek_item_times(r#"{"timestamp":5}"#), Some((5, 0)));
        assert_eq!(peek_item_times("~4~a"), None);
    }
}
