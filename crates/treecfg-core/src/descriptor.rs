//! Remote provider descriptor

use serde::{Deserialize, Deserializer, Serialize};

use crate::tree::normalize_path;

/// Identifies which remote source to read.
///
/// Supplied by the embedding configuration layer for every configured source and
/// treated as read-only here. The root path is normalized on construction, so
/// `"testconfig/"` and `"/testconfig"` describe the same tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteProviderDescriptor {
    provider: String,
    endpoint: String,
    #[serde(deserialize_with = "deserialize_path")]
    path: String,
    #[serde(default)]
    secret_keyring: String,
}

impl RemoteProviderDescriptor {
    /// Create a descriptor without a secret keyring
    pub fn new(
        provider: impl Into<String>,
        endpoint: impl Into<String>,
        path: impl AsRef<str>,
    ) -> Self {
        Self {
            provider: provider.into(),
            endpoint: endpoint.into(),
            path: normalize_path(path.as_ref()),
            secret_keyring: String::new(),
        }
    }

    /// Attach a legacy secret keyring reference
    pub fn with_secret_keyring(mut self, keyring: impl Into<String>) -> Self {
        self.secret_keyring = keyring.into();
        self
    }

    /// Provider kind, e.g. `"etcd"`
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Network address of the store
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Normalized root path of the key tree
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn secret_keyring(&self) -> &str {
        &self.secret_keyring
    }
}

fn deserialize_path<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(normalize_path(&raw))
}
