use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;

use super::Serializer;
use crate::error::CacheError;

/// Decorator obfuscating the output of another serializer with a repeating-key XOR stream.
///
/// The result is base64 encoded. This hides payloads from casual inspection only; it is not
/// cryptographically secure.
pub struct EncryptedSerializer {
    inner: Box<dyn Serializer>,
    key: Vec<u8>,
}

impl EncryptedSerializer {
    /// Wrap `inner`, keyed by `key`.
    ///
    /// An empty key leaves the bytes unchanged.
    pub fn new(inner: Box<dyn Serializer>, key: &[u8]) -> Self {
        EncryptedSerializer {
            inner,
            key: key.to_vec(),
        }
    }

    fn xor(&self, bytes: &mut [u8]) {
        if self.key.is_empty() {
            return;
        }
        for (byte, k) in bytes.iter_mut().zip(self.key.iter().cycle()) {
            *byte ^= k;
        }
    }
}

impl Serializer for EncryptedSerializer {
    fn name(&self) -> &'static str {
        "encrypted"
    }

    fn serialize(&self, value: &Value) -> Result<String, CacheError> {
        let mut bytes = self.inner.serialize(value)?.into_bytes();
        self.xor(&mut bytes);
        Ok(STANDARD.encode(bytes))
    }

    fn deserialize(&self, data: &str) -> Result<Value, CacheError> {
        let mut bytes = STANDARD
            .decode(data)
            .map_err(|e| CacheError::Deserialization(format!("Invalid ciphertext: {}", e)))?;
        self.xor(&mut bytes);
        let plain = String::from_utf8(bytes).map_err(|_| {
            CacheError::Deserialization("Decryption produced invalid UTF-8".to_string())
        })?;
        self.inner.deserialize(&plain)
    }
}
