use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;

use super::Serializer;
use crate::error::CacheError;

/// Plain JSON text.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn name(&self) -> &'static str {
        "json"
    }

    fn serialize(&self, value: &Value) -> Result<String, CacheError> {
        serde_json::to_string(value)
            .map_err(|e| CacheError::Serialization(format!("JSON encoding failed: {}", e)))
    }

    fn deserialize(&self, data: &str) -> Result<Value, CacheError> {
        serde_json::from_str(data)
            .map_err(|e| CacheError::Deserialization(format!("JSON decoding failed: {}", e)))
    }
}

/// MessagePack bytes, stored as lowercase hex.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinarySerializer;

impl Serializer for BinarySerializer {
    fn name(&self) -> &'static str {
        "binary"
    }

    fn serialize(&self, value: &Value) -> Result<String, CacheError> {
        let bytes = rmp_serde::to_vec(value)
            .map_err(|e| CacheError::Serialization(format!("Binary encoding failed: {}", e)))?;
        Ok(hex::encode(bytes))
    }

    fn deserialize(&self, data: &str) -> Result<Value, CacheError> {
        let bytes = hex::decode(data)
            .map_err(|e| CacheError::Deserialization(format!("Invalid hex payload: {}", e)))?;
        rmp_serde::from_slice(&bytes)
            .map_err(|e| CacheError::Deserialization(format!("Binary decoding failed: {}", e)))
    }
}

/// JSON text wrapped in standard base64.
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64Serializer;

impl Serializer for Base64Serializer {
    fn name(&self) -> &'static str {
        "base64"
    }

    fn serialize(&self, value: &Value) -> Result<String, CacheError> {
        let json = JsonSerializer.serialize(value)?;
        Ok(STANDARD.encode(json))
    }

    fn deserialize(&self, data: &str) -> Result<Value, CacheError> {
        let bytes = STANDARD
            .decode(data)
            .map_err(|e| CacheError::Deserialization(format!("Invalid base64 payload: {}", e)))?;
        let json = String::from_utf8(bytes)
            .map_err(|e| CacheError::Deserialization(format!("Invalid UTF-8: {}", e)))?;
        JsonSerializer.deserialize(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_base64_output_is_plain_base64() {
        let raw = Base64Serializer.serialize(&json!({"a": 1})).unwrap();
        assert_eq!(raw, "eyJhIjoxfQ==");
        assert_eq!(Base64Serializer.deserialize(&raw).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_binary_keeps_numbers_and_nesting() {
        let value = json!({"id": 7, "ratio": 0.25, "items": [true, null, "x"]});
        let raw = BinarySerializer.serialize(&value).unwrap();
        assert!(raw.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(BinarySerializer.deserialize(&raw).unwrap(), value);
    }

    #[test]
    fn test_malformed_input_is_a_deserialization_error() {
        assert!(matches!(
            JsonSerializer.deserialize("{not json"),
            Err(CacheError::Deserialization(_))
        ));
        assert!(matches!(
            BinarySerializer.deserialize("zz"),
            Err(CacheError::Deserialization(_))
        ));
        assert!(matches!(
            Base64Serializer.deserialize("***"),
            Err(CacheError::Deserialization(_))
        ));
    }
}
