//! Serialization pipeline.
//!
//! A base [`Serializer`] turns a cache item (as a JSON value) into the string a backend stores.
//! It can be wrapped by at most one decorator: the [`CompressedSerializer`] or the
//! [`EncryptedSerializer`].
//!
//! # Example
//!
//! ```ignore
//! let serializer = build_serializer(&CacheConfig { compress: true, ..Default::default() });
//! let raw = serializer.serialize(&serde_json::json!({"a": 1}))?;
//! let back = serializer.deserialize(&raw)?;
//! ```

mod base;
mod compress;
mod encrypt;

pub use base::{Base64Serializer, BinarySerializer, JsonSerializer};
pub use compress::{CompressedSerializer, rle_compress, rle_decompress};
pub use encrypt::EncryptedSerializer;

use serde_json::Value;
use std::sync::Arc;

use crate::config::{CacheConfig, SerializerKind};
use crate::error::CacheError;

/// Converts values to and from their stored string form.
pub trait Serializer: Send + Sync {
    /// A name for logs.
    fn name(&self) -> &'static str;

    fn serialize(&self, value: &Value) -> Result<String, CacheError>;

    fn deserialize(&self, data: &str) -> Result<Value, CacheError>;
}

/// Build the serializer chain described by `config`.
///
/// Compression and encryption are mutually exclusive: when both flags are set, only the
/// compressor is applied.
pub fn build_serializer(config: &CacheConfig) -> Arc<dyn Serializer> {
    let base: Box<dyn Serializer> = match config.serializer {
        SerializerKind::Json => Box::new(JsonSerializer),
        SerializerKind::Binary => Box::new(BinarySerializer),
        SerializerKind::Base64 => Box::new(Base64Serializer),
    };

    if config.compress {
        if config.encrypt {
            tracing::debug!(
                "Both compress and encrypt are set, encryption skipped: namespace={}",
                config.namespace
            );
        }
        return Arc::new(CompressedSerializer::new(base));
    }

    if config.encrypt {
        return Arc::new(EncryptedSerializer::new(base, config.encryption_key.as_bytes()));
    }

    Arc::from(base)
}
