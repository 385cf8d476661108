//! Key tree to document conversion
//!
//! The walker turns a [`TreeNode`] into a nested [`DocumentValue`]: every
//! directory becomes a map keyed by its children's last path segment and every
//! leaf becomes a terminal value. When the store hands back a node that sits
//! deeper than the path being walked (a flattened intermediate level, or a
//! single changed key from a watch notification), the missing levels are
//! rebuilt one segment at a time as single-entry maps.
//!
//! Maps are ordered, so converting the same tree always yields the same bytes.

use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::{
    Error, Result,
    decoder::Decoder,
    tree::{TreeNode, join_path, next_segment, normalize_path},
};

/// Map of key segments to document values
pub type Document = BTreeMap<String, DocumentValue>;

/// A node of the converted configuration document
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DocumentValue {
    /// Terminal value: the raw string, or whatever the decoder produced
    Leaf(Value),
    /// Nested map
    Object(Document),
}

impl DocumentValue {
    pub fn as_object(&self) -> Option<&Document> {
        match self {
            DocumentValue::Object(map) => Some(map),
            DocumentValue::Leaf(_) => None,
        }
    }

    /// Follow a slash path through nested objects
    pub fn lookup(&self, path: &str) -> Option<&DocumentValue> {
        path.split('/')
            .filter(|s| !s.is_empty())
            .try_fold(self, |value, segment| value.as_object()?.get(segment))
    }
}

/// Convert `node` into a document value, treating `current_path` as the path
/// the caller expects `node` to live at.
pub fn walk(
    node: &TreeNode,
    current_path: &str,
    decoder: Option<&dyn Decoder>,
) -> Result<DocumentValue> {
    let key = node.path();

    if key != current_path {
        let segment = next_segment(key, current_path).ok_or_else(|| {
            Error::Walk(format!("key '{}' is not below '{}'", key, current_path))
        })?;
        let extended = join_path(current_path, segment);
        let inner = walk(node, &extended, decoder)?;
        return Ok(DocumentValue::Object(BTreeMap::from([(
            segment.to_string(),
            inner,
        )])));
    }

    if !node.dir {
        return match decoder {
            Some(decoder) => decoder
                .decode(&node.value)
                .map(DocumentValue::Leaf)
                .map_err(|e| Error::Decode {
                    key: key.to_string(),
                    message: e.to_string(),
                }),
            None => Ok(DocumentValue::Leaf(Value::String(node.value.clone()))),
        };
    }

    let mut map = Document::new();
    for child in &node.nodes {
        let name = next_segment(child.path(), key).ok_or_else(|| {
            Error::Walk(format!(
                "child '{}' of '{}' is not below its parent",
                child.path(),
                key
            ))
        })?;
        map.insert(
            name.to_string(),
            walk(child, &join_path(key, name), decoder)?,
        );
    }
    Ok(DocumentValue::Object(map))
}

/// Walk `node` from `root_path` and require the result to be an object.
///
/// A root node with neither value nor children converts to an empty document.
pub fn to_document(
    node: &TreeNode,
    root_path: &str,
    decoder: Option<&dyn Decoder>,
) -> Result<Document> {
    let root_path = normalize_path(root_path);
    if node.path() == root_path && node.is_empty() {
        return Ok(Document::new());
    }
    match walk(node, &root_path, decoder)? {
        DocumentValue::Object(map) => Ok(map),
        DocumentValue::Leaf(_) => Err(Error::Walk(format!(
            "'{}' is a value, not a directory",
            root_path
        ))),
    }
}

/// Walk `node` from `root_path` and encode the document as a JSON object
pub fn render(node: &TreeNode, root_path: &str, decoder: Option<&dyn Decoder>) -> Result<Bytes> {
    let document = to_document(node, root_path, decoder)?;
    Ok(Bytes::from(serde_json::to_vec(&document)?))
}
