use serde_json::Value;

use super::Serializer;
use crate::error::CacheError;

const MARKER: char = '~';

/// Shortest run worth encoding.
const MIN_RUN: usize = 4;

/// Run-length encode `input`.
///
/// A run of at least four equal characters, or any run of the marker `~`, is written as
/// `~{count}~{char}`. Everything else is copied verbatim. This is a lightweight scheme for
/// repetitive payloads, not a general-purpose compressor.
pub fn rle_compress(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        let mut run = 1;
        while chars.peek() == Some(&c) {
            chars.next();
            run += 1;
        }

        if run >= MIN_RUN || c == MARKER {
            out.push(MARKER);
            out.push_str(&run.to_string());
            out.push(MARKER);
            out.push(c);
        } else {
            out.extend(std::iter::repeat_n(c, run));
        }
    }

    out
}

/// Reverse [`rle_compress`].
pub fn rle_decompress(input: &str) -> Result<String, CacheError> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        if c != MARKER {
            out.push(c);
            continue;
        }

        let mut digits = String::new();
        loop {
            match chars.next() {
                Some(MARKER) => break,
                Some(d) if d.is_ascii_digit() => digits.push(d),
                _ => {
                    return Err(CacheError::Deserialization(
                        "Malformed run-length header".to_string(),
                    ));
                }
            }
        }

        let run: usize = digits.parse().map_err(|_| {
            CacheError::Deserialization("Missing run-length count".to_string())
        })?;
        let Some(repeated) = chars.next() else {
            return Err(CacheError::Deserialization(
                "Truncated run-length payload".to_string(),
            ));
        };
        out.extend(std::iter::repeat_n(repeated, run));
    }

    Ok(out)
}

/// Decorator compressing the output of another serializer.
pub struct CompressedSerializer {
    inner: Box<dyn Serializer>,
}

impl CompressedSerializer {
    /// Wrap `inner`.
    pub fn new(inner: Box<dyn Serializer>) -> Self {
        CompressedSerializer { inner }
    }
}

impl Serializer for CompressedSerializer {
    fn name(&self) -> &'static str {
        "compressed"
    }

    fn serialize(&self, value: &Value) -> Result<String, CacheError> {
        let raw = self.inner.serialize(value)?;
        Ok(rle_compress(&raw))
    }

    fn deserialize(&self, data: &str) -> Result<Value, CacheError> {
        let raw = rle_decompress(data)?;
        self.inner.deserialize(&raw)
    }
}
