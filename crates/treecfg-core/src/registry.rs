//! Explicit registration of remote providers
//!
//! The embedding application builds a [`ProviderRegistry`] at startup and
//! registers each backend it wants to use. The registry itself implements
//! [`RemoteConfigProvider`] and routes every call by the descriptor's kind.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::{
    Error, Result,
    descriptor::RemoteProviderDescriptor,
    provider::RemoteConfigProvider,
    watch::WatchChannel,
};

#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn RemoteConfigProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `provider` for descriptors of `kind`, returning the provider it replaced
    pub fn register(
        &mut self,
        kind: impl Into<String>,
        provider: Arc<dyn RemoteConfigProvider>,
    ) -> Option<Arc<dyn RemoteConfigProvider>> {
        let kind = kind.into();
        info!(kind = %kind, "Registered remote config provider");
        self.providers.insert(kind, provider)
    }

    pub fn provider(&self, kind: &str) -> Option<Arc<dyn RemoteConfigProvider>> {
        self.providers.get(kind).cloned()
    }

    /// Registered kinds, sorted
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    fn resolve(&self, rp: &RemoteProviderDescriptor) -> Result<&Arc<dyn RemoteConfigProvider>> {
        self.providers
            .get(rp.provider())
            .ok_or_else(|| Error::ProviderNotRegistered(rp.provider().to_string()))
    }
}

#[async_trait]
impl RemoteConfigProvider for ProviderRegistry {
    async fn get(&self, rp: &RemoteProviderDescriptor) -> Result<Bytes> {
        self.resolve(rp)?.get(rp).await
    }

    async fn watch(&self, rp: &RemoteProviderDescriptor) -> Result<Bytes> {
        self.resolve(rp)?.watch(rp).await
    }

    async fn watch_channel(&self, rp: &RemoteProviderDescriptor) -> Result<WatchChannel> {
        self.resolve(rp)?.watch_channel(rp).await
    }
}
