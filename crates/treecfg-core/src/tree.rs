//! Key tree nodes as returned by the store, plus slash-path helpers

use serde::{Deserialize, Serialize};

/// Path separator used by the store's key space
pub const SEPARATOR: char = '/';

/// A single key of the store: either a leaf holding a value or a directory
/// holding children.
///
/// Produced by the store client for a read or a watch notification and consumed
/// immediately by [`crate::document::walk`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    /// Full slash-delimited path of the node (empty means the store root)
    pub key: String,

    /// Whether the node is a directory
    #[serde(default)]
    pub dir: bool,

    /// Raw value, meaningful only for leaves
    #[serde(default)]
    pub value: String,

    /// Children, meaningful only for directories
    #[serde(default)]
    pub nodes: Vec<TreeNode>,
}

impl TreeNode {
    pub fn leaf(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            dir: false,
            value: value.into(),
            nodes: Vec::new(),
        }
    }

    pub fn directory(key: impl Into<String>, nodes: Vec<TreeNode>) -> Self {
        Self {
            key: key.into(),
            dir: true,
            value: String::new(),
            nodes,
        }
    }

    /// Build a directory tree rooted at `root` from slash-path/value pairs.
    ///
    /// Paths are relative to `root`; empty segments are ignored. A later entry
    /// replaces an earlier one at the same path, and a path that descends
    /// through an existing leaf turns that leaf into a directory.
    ///
    /// ```
    /// # use treecfg_core::tree::TreeNode;
    /// let tree = TreeNode::from_flat("/app", [("db/addr", "a1"), ("db/user", "u1")]);
    /// assert_eq!(tree.nodes.len(), 1);
    /// assert_eq!(tree.nodes[0].key, "/app/db");
    /// ```
    pub fn from_flat<I, K, V>(root: &str, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut tree = TreeNode::directory(normalize_path(root), Vec::new());
        for (path, value) in entries {
            let segments: Vec<&str> = path
                .as_ref()
                .split(SEPARATOR)
                .filter(|s| !s.is_empty())
                .collect();
            if !segments.is_empty() {
                tree.insert(&segments, value.into());
            }
        }
        tree
    }

    fn insert(&mut self, segments: &[&str], value: String) {
        let Some((first, rest)) = segments.split_first() else {
            return;
        };
        let key = join_path(self.path(), first);
        let existing = self.nodes.iter().position(|n| n.key == key);

        if rest.is_empty() {
            let leaf = TreeNode::leaf(key, value);
            match existing {
                Some(i) => self.nodes[i] = leaf,
                None => self.nodes.push(leaf),
            }
            return;
        }

        let index = match existing {
            Some(i) if self.nodes[i].dir => i,
            Some(i) => {
                self.nodes[i] = TreeNode::directory(key, Vec::new());
                i
            }
            None => {
                self.nodes.push(TreeNode::directory(key, Vec::new()));
                self.nodes.len() - 1
            }
        };
        self.nodes[index].insert(rest, value);
    }

    /// The node's path, with the store root reported as `/`
    pub fn path(&self) -> &str {
        if self.key.is_empty() {
            "/"
        } else {
            self.key.as_str()
        }
    }

    /// Last segment of the node's path
    pub fn name(&self) -> &str {
        last_segment(self.path())
    }

    /// Whether the node carries neither a value nor children
    pub fn is_empty(&self) -> bool {
        self.value.is_empty() && self.nodes.is_empty()
    }
}

/// Normalize a slash path: leading separator, no trailing or doubled separators.
pub fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path
        .trim()
        .split(SEPARATOR)
        .filter(|s| !s.is_empty())
        .collect();
    format!("/{}", segments.join("/"))
}

/// Append one segment to a normalized parent path
pub fn join_path(parent: &str, segment: &str) -> String {
    if parent == "/" {
        format!("/{}", segment)
    } else {
        format!("{}/{}", parent, segment)
    }
}

/// Last segment of a slash path
pub fn last_segment(key: &str) -> &str {
    key.rsplit_once(SEPARATOR).map_or(key, |(_, last)| last)
}

/// First segment of `key` below `current`, or `None` when `key` is not strictly
/// below `current`.
pub fn next_segment<'a>(key: &'a str, current: &str) -> Option<&'a str> {
    let rest = if current == "/" {
        key.strip_prefix(SEPARATOR)?
    } else {
        key.strip_prefix(current)?.strip_prefix(SEPARATOR)?
    };
    rest.split(SEPARATOR).next().filter(|s| !s.is_empty())
}
