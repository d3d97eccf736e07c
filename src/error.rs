/// Error type for cache operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    /// The key is absent or its item has expired.
    ///
    /// The manager's read path reports absence as `None` and never returns this variant. It is
    /// available to callers that turn a miss into an error, see [`CacheError::not_found`].
    #[error("key '{key}' not found")]
    NotFound { key: String },
    /// Turning a value into its stored representation failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Turning a stored representation back into a value failed.
    #[error("Deserialization error: {0}")]
    Deserialization(String),
    /// A write is still over capacity after one cleanup-and-retry.
    #[error("[{store}] quota exceeded while writing key '{key}'")]
    QuotaExceeded { store: String, key: String },
    /// A backend operation failed.
    #[error("[{store}] storage error for key '{key}': {message}")]
    Storage {
        store: String,
        key: String,
        message: String,
    },
    /// The configuration was rejected by validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CacheError {
    /// Create a new storage error.
    pub fn storage(
        store: impl Into<String>,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        CacheError::Storage {
            store: store.into(),
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a new not-found error.
    pub fn not_found(key: impl Into<String>) -> Self {
        CacheError::NotFound { key: key.into() }
    }

    /// Create a new quota error.
    pub fn quota(store: impl Into<String>, key: impl Into<String>) -> Self {
        CacheError::QuotaExceeded {
            store: store.into(),
            key: key.into(),
        }
    }

    /// Returns `true` if the error signals an exhausted storage quota.
    pub fn is_quota(&self) -> bool {
        matches!(self, CacheError::QuotaExceeded { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_store_and_key() {
        let err = CacheError::storage("indexed", "user:1", "disk I/O error");
        assert_eq!(
            err.to_string(),
            "[indexed] storage error for key 'user:1': disk I/O error"
        );
        assert!(!err.is_quota());
        assert!(CacheError::quota("local", "k").is_quota());
    }

    #[test]
    fn test_not_found_for_missing_value() {
        let cached: Option<String> = None;
        let err = cached.ok_or_else(|| CacheError::not_found("user:1")).unwrap_err();
        assert_eq!(err, CacheError::NotFound {
            key: "user:1".to_string()
        });
        assert_eq!(err.to_string(), "key 'user:1' not found");
        assert!(!err.is_quota());
    }
}
