//! Encoding of typed values into the flat text stored at a leaf

use serde::{Deserialize, Serialize};
use std::fmt;

/// Value that can be written to a single store key.
///
/// Lists are stored comma-joined, which is the shape
/// [`CommaListDecoder`](crate::decoder::CommaListDecoder) reads back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EncodableValue {
    Text(String),
    TextList(Vec<String>),
    IntList(Vec<i64>),
}

impl EncodableValue {
    /// Encode the value as leaf text
    pub fn encode(&self) -> String {
        match self {
            EncodableValue::Text(text) => text.clone(),
            EncodableValue::TextList(items) => items.join(","),
            EncodableValue::IntList(items) => items
                .iter()
                .map(i64::to_string)
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

impl fmt::Display for EncodableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl From<&str> for EncodableValue {
    fn from(value: &str) -> Self {
        EncodableValue::Text(value.to_string())
    }
}

impl From<String> for EncodableValue {
    fn from(value: String) -> Self {
        EncodableValue::Text(value)
    }
}

impl From<Vec<String>> for EncodableValue {
    fn from(value: Vec<String>) -> Self {
        EncodableValue::TextList(value)
    }
}

impl From<Vec<&str>> for EncodableValue {
    fn from(value: Vec<&str>) -> Self {
        EncodableValue::TextList(value.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<i64>> for EncodableValue {
    fn from(value: Vec<i64>) -> Self {
        EncodableValue::IntList(value)
    }
}
