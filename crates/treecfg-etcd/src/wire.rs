//! etcd v2 keys API payloads

use serde::Deserialize;

use treecfg_core::{Error, TreeNode, tree::normalize_path};

/// `errorCode` for a missing key
pub const ERROR_KEY_NOT_FOUND: u64 = 100;

/// `errorCode` when the requested watch index has been compacted away
pub const ERROR_EVENT_INDEX_CLEARED: u64 = 401;

/// Successful response to a read, write or watch
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeysResponse {
    pub action: String,
    pub node: KeysNode,
    #[serde(default)]
    pub prev_node: Option<KeysNode>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeysNode {
    /// Absent for the store root
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub dir: bool,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub nodes: Vec<KeysNode>,
    #[serde(default)]
    pub created_index: u64,
    #[serde(default)]
    pub modified_index: u64,
}

impl From<KeysNode> for TreeNode {
    fn from(node: KeysNode) -> Self {
        TreeNode {
            key: normalize_path(&node.key),
            dir: node.dir,
            value: node.value.unwrap_or_default(),
            nodes: node.nodes.into_iter().map(TreeNode::from).collect(),
        }
    }
}

/// Error body returned with non-2xx statuses
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeysError {
    pub error_code: u64,
    pub message: String,
    #[serde(default)]
    pub cause: Option<String>,
    /// Current etcd index when the error was produced
    #[serde(default)]
    pub index: u64,
}

impl KeysError {
    pub fn into_error(self, path: &str) -> Error {
        match self.error_code {
            ERROR_KEY_NOT_FOUND => {
                Error::KeyNotFound(self.cause.unwrap_or_else(|| path.to_string()))
            }
            code => Error::Store {
                code,
                message: self.message,
                cause: self.cause,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_recursive_get() {
        let response: KeysResponse = serde_json::from_str(
            r#"{
                "action": "get",
                "node": {
                    "key": "/testconfig",
                    "dir": true,
                    "nodes": [
                        {
                            "key": "/testconfig/access",
                            "dir": true,
                            "nodes": [
                                {"key": "/testconfig/access/token", "value": "t1", "modifiedIndex": 7, "createdIndex": 7}
                            ],
                            "modifiedIndex": 6,
                            "createdIndex": 6
                        }
                    ],
                    "modifiedIndex": 5,
                    "createdIndex": 5
                }
            }"#,
        )
        .unwrap();

        assert_eq!(response.action, "get");
        let tree: TreeNode = response.node.into();
        assert!(tree.dir);
        assert_eq!(
            tree.nodes[0].nodes[0],
            TreeNode::leaf("/testconfig/access/token", "t1")
        );
    }

    #[test]
    fn test_root_node_without_key() {
        let node: KeysNode = serde_json::from_str(r#"{"dir": true}"#).unwrap();
        let tree: TreeNode = node.into();
        assert_eq!(tree.key, "/");
        assert!(tree.is_empty());
    }

    #[test]
    fn test_parse_watch_event() {
        let response: KeysResponse = serde_json::from_str(
            r#"{
                "action": "set",
                "node": {"key": "/testconfig/access/token", "value": "newtoken", "modifiedIndex": 12, "createdIndex": 12},
                "prevNode": {"key": "/testconfig/access/token", "value": "t1", "modifiedIndex": 7, "createdIndex": 7}
            }"#,
        )
        .unwrap();

        assert_eq!(response.node.modified_index, 12);
        assert_eq!(response.prev_node.unwrap().value.as_deref(), Some("t1"));
    }

    #[test]
    fn test_error_mapping() {
        let not_found: KeysError = serde_json::from_str(
            r#"{"errorCode":100,"message":"Key not found","cause":"/testconfig","index":3}"#,
        )
        .unwrap();
        assert!(matches!(
            not_found.into_error("/testconfig"),
            Error::KeyNotFound(ref key) if key == "/testconfig"
        ));

        let cleared: KeysError = serde_json::from_str(
            r#"{"errorCode":401,"message":"The event in requested index is outdated and cleared","index":42}"#,
        )
        .unwrap();
        assert_eq!(cleared.index, 42);
        assert!(matches!(
            cleared.into_error("/testconfig"),
            Error::Store { code: 401, .. }
        ));
    }
}
