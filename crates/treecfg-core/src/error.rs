//! Error types for treecfg

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Configuration errors (fatal, raised before any I/O)
    #[error("Unsupported remote provider: expected '{expected}', got '{found}'")]
    UnsupportedProvider { expected: String, found: String },

    #[error("Secret keyring is not supported; configure a decoder to handle secret values")]
    SecretKeyringUnsupported,

    #[error("No remote provider registered for '{0}'")]
    ProviderNotRegistered(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // Store errors
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Request timeout: {0}")]
    Timeout(String),

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Store error {code}: {message}{}", cause.as_ref().map(|c| format!(" ({})", c)).unwrap_or_default())]
    Store {
        code: u64,
        message: String,
        cause: Option<String>,
    },

    // Conversion errors
    #[error("Failed to decode value at '{key}': {message}")]
    Decode { key: String, message: String },

    #[error("Malformed key tree: {0}")]
    Walk(String),

    #[error("Watch cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error is a fatal configuration problem that retrying cannot fix
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedProvider { .. }
                | Error::SecretKeyringUnsupported
                | Error::ProviderNotRegistered(_)
                | Error::Config(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
