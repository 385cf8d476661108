//! Remote configuration provider contract and its store-backed implementation

use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::{
    Error, Result,
    decoder::Decoder,
    descriptor::RemoteProviderDescriptor,
    snapshot,
    store::{KeyStore, StoreConnector},
    watch::{WatchChannel, spawn_watch},
};

/// Contract consumed by a configuration-management layer
///
/// # Example
/// ```no_run
/// # use treecfg_core::{RemoteConfigProvider, RemoteProviderDescriptor};
/// # async fn example(provider: &dyn RemoteConfigProvider) -> treecfg_core::Result<()> {
/// let rp = RemoteProviderDescriptor::new("etcd", "http://127.0.0.1:2379", "/app");
///
/// // One-shot read
/// let json = provider.get(&rp).await?;
///
/// // Live updates until the stop handle is used
/// let (mut events, done) = provider.watch_channel(&rp).await?;
/// if let Some(event) = events.recv().await {
///     let fragment = event?;
/// }
/// let _ = done.send(false);
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait RemoteConfigProvider: Send + Sync {
    /// Read the whole tree as a JSON object
    async fn get(&self, rp: &RemoteProviderDescriptor) -> Result<Bytes>;

    /// Same as [`get`](Self::get); kept for configuration layers that poll
    async fn watch(&self, rp: &RemoteProviderDescriptor) -> Result<Bytes>;

    /// Subscribe to changes under the descriptor's path
    ///
    /// # Errors
    /// Configuration and connection-setup errors are returned directly; errors
    /// while waiting for changes arrive as events.
    async fn watch_channel(&self, rp: &RemoteProviderDescriptor) -> Result<WatchChannel>;
}

/// Provider backed by a [`StoreConnector`], with an optional [`Decoder`].
///
/// Every call validates the descriptor first and then opens its own store
/// client; nothing is shared between calls except the connector and decoder.
#[derive(Clone)]
pub struct RemoteProvider {
    kind: String,
    connector: Arc<dyn StoreConnector>,
    decoder: Option<Arc<dyn Decoder>>,
}

impl RemoteProvider {
    /// Create a provider answering descriptors of the given kind
    pub fn new(kind: impl Into<String>, connector: Arc<dyn StoreConnector>) -> Self {
        Self {
            kind: kind.into(),
            connector,
            decoder: None,
        }
    }

    /// Decode every leaf with `decoder`
    pub fn with_decoder(mut self, decoder: Arc<dyn Decoder>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn has_decoder(&self) -> bool {
        self.decoder.is_some()
    }

    /// Check a descriptor before any I/O
    ///
    /// # Errors
    /// - `Error::UnsupportedProvider` if the kind does not match
    /// - `Error::SecretKeyringUnsupported` if a keyring is set and no decoder is configured
    /// - `Error::Config` if the endpoint is empty
    pub fn validate(&self, rp: &RemoteProviderDescriptor) -> Result<()> {
        if rp.provider() != self.kind {
            return Err(Error::UnsupportedProvider {
                expected: self.kind.clone(),
                found: rp.provider().to_string(),
            });
        }

        if !rp.secret_keyring().is_empty() {
            if self.decoder.is_none() {
                return Err(Error::SecretKeyringUnsupported);
            }
            warn!(
                path = rp.path(),
                "Ignoring secret keyring; leaf values go through the configured decoder"
            );
        }

        if rp.endpoint().trim().is_empty() {
            return Err(Error::Config(format!(
                "No endpoint configured for remote path '{}'",
                rp.path()
            )));
        }

        Ok(())
    }

    fn connect(&self, rp: &RemoteProviderDescriptor) -> Result<Arc<dyn KeyStore>> {
        self.validate(rp)?;
        debug!(endpoint = rp.endpoint(), kind = %self.kind, "Connecting to store");
        self.connector.connect(rp.endpoint())
    }

    async fn read(&self, rp: &RemoteProviderDescriptor) -> Result<Bytes> {
        let store = self.connect(rp)?;
        snapshot::fetch(store.as_ref(), rp.path(), self.decoder.as_deref()).await
    }
}

impl fmt::Debug for RemoteProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteProvider")
            .field("kind", &self.kind)
            .field("decoder", &self.decoder.is_some())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl RemoteConfigProvider for RemoteProvider {
    async fn get(&self, rp: &RemoteProviderDescriptor) -> Result<Bytes> {
        self.read(rp).await
    }

    async fn watch(&self, rp: &RemoteProviderDescriptor) -> Result<Bytes> {
        self.read(rp).await
    }

    async fn watch_channel(&self, rp: &RemoteProviderDescriptor) -> Result<WatchChannel> {
        let store = self.connect(rp)?;
        Ok(spawn_watch(store, rp.path(), self.decoder.clone()))
    }
}

#[cfg(test)]
mod tests;
