//! etcd client configuration

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, error};

use treecfg_core::{Error, Result};

/// HTTP client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpClientConfig {
    /// Timeout in seconds for reads and writes.
    /// Watch requests are long polls and never time out.
    pub timeout_secs: u64,

    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,

    /// Maximum number of idle connections per host
    pub pool_max_idle_per_host: usize,

    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            connect_timeout_secs: 10,
            pool_max_idle_per_host: 8,
            user_agent: format!("treecfg/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Connection parameters shared by every client the connector builds
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EtcdConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(default)]
    pub client: HttpClientConfig,
}

impl EtcdConfig {
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Load from a YAML or TOML file, chosen by extension
    ///
    /// # Errors
    /// - `Error::Io` if the file can't be read
    /// - `Error::Config` if the file isn't valid YAML/TOML
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            error!("Failed to read etcd config file {:?}: {}", path, e);
            Error::Io(e)
        })?;

        let config = if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml::from_str(&contents)
                .map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))?
        } else {
            // Default to YAML
            serde_yaml::from_str(&contents)
                .map_err(|e| Error::Config(format!("Invalid YAML: {}", e)))?
        };

        debug!("Loaded etcd config from {:?}", path);
        Ok(config)
    }

    /// Merge environment variables into config (env vars take precedence)
    pub fn merge_env(&mut self) {
        if let Ok(val) = std::env::var("ETCD_USERNAME") {
            self.username = Some(val);
        }

        if let Ok(val) = std::env::var("ETCD_PASSWORD") {
            self.password = Some(val);
        }

        if let Ok(val) = std::env::var("ETCD_TIMEOUT_SECS")
            && let Ok(secs) = val.parse::<u64>()
        {
            self.client.timeout_secs = secs;
        }
    }

    /// Username/password pair, if a username is configured
    pub(crate) fn credentials(&self) -> Option<(String, Option<String>)> {
        self.username
            .clone()
            .map(|username| (username, self.password.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::NamedTempFile;

    fn temp_config(suffix: &str, contents: &str) -> NamedTempFile {
        let file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        std::fs::write(file.path(), contents).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = EtcdConfig::default();
        assert!(config.username.is_none());
        assert_eq!(config.client.timeout_secs, 30);
        assert_eq!(config.client.connect_timeout_secs, 10);
        assert!(config.client.user_agent.starts_with("treecfg/"));
        assert!(config.credentials().is_none());
    }

    #[test]
    fn test_from_yaml_file() {
        let file = temp_config(
            ".yaml",
            "username: root\npassword: secret\nclient:\n  timeout_secs: 5\n",
        );

        let config = EtcdConfig::from_file(file.path()).unwrap();
        assert_eq!(config.username.as_deref(), Some("root"));
        assert_eq!(config.client.timeout_secs, 5);
        // Unspecified client settings keep their defaults
        assert_eq!(config.client.connect_timeout_secs, 10);
    }

    #[test]
    fn test_from_toml_file() {
        let file = temp_config(
            ".toml",
            "username = \"root\"\n\n[client]\npool_max_idle_per_host = 2\n",
        );

        let config = EtcdConfig::from_file(file.path()).unwrap();
        assert_eq!(
            config.credentials(),
            Some(("root".to_string(), None))
        );
        assert_eq!(config.client.pool_max_idle_per_host, 2);
    }

    #[test]
    fn test_invalid_file() {
        let file = temp_config(".yaml", "username: [unclosed");
        assert!(matches!(
            EtcdConfig::from_file(file.path()),
            Err(Error::Config(_))
        ));

        assert!(matches!(
            EtcdConfig::from_file("/nonexistent/etcd.yaml"),
            Err(Error::Io(_))
        ));
    }

    #[test]
    #[serial]
    fn test_merge_env() {
        // SAFETY: serialized with the other env-mutating tests
        unsafe {
            std::env::set_var("ETCD_USERNAME", "env-user");
            std::env::set_var("ETCD_PASSWORD", "env-pass");
            std::env::set_var("ETCD_TIMEOUT_SECS", "not-a-number");
        }

        let mut config = EtcdConfig::default().with_credentials("file-user", "file-pass");
        config.merge_env();

        unsafe {
            std::env::remove_var("ETCD_USERNAME");
            std::env::remove_var("ETCD_PASSWORD");
            std::env::remove_var("ETCD_TIMEOUT_SECS");
        }

        assert_eq!(config.username.as_deref(), Some("env-user"));
        assert_eq!(config.password.as_deref(), Some("env-pass"));
        assert_eq!(config.client.timeout_secs, 30);
    }
}
