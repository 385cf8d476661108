//! Pluggable leaf value decoding
//!
//! A [`Decoder`] turns the raw text of a leaf into any JSON-representable value.
//! It is invoked once per leaf while a key tree is converted into a document.
//! Without a decoder leaves stay JSON strings.

use serde_json::Value;

use crate::Result;

/// Leaf value transformation hook supplied by the embedding application
pub trait Decoder: Send + Sync {
    /// Decode one raw leaf payload
    fn decode(&self, raw: &str) -> Result<Value>;
}

impl<F> Decoder for F
where
    F: Fn(&str) -> Result<Value> + Send + Sync,
{
    fn decode(&self, raw: &str) -> Result<Value> {
        self(raw)
    }
}

/// Splits comma-joined values into a list of strings.
///
/// Values without a comma are kept as plain strings, so `"redis,postgres"`
/// becomes `["redis","postgres"]` while `"redis"` stays `"redis"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommaListDecoder;

impl Decoder for CommaListDecoder {
    fn decode(&self, raw: &str) -> Result<Value> {
        if raw.contains(',') {
            Ok(Value::Array(
                raw.split(',').map(|s| Value::String(s.to_string())).collect(),
            ))
        } else {
            Ok(Value::String(raw.to_string()))
        }
    }
}

/// Parses every leaf as a JSON document
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

impl Decoder for JsonDecoder {
    fn decode(&self, raw: &str) -> Result<Value> {
        Ok(serde_json::from_str(raw)?)
    }
}
