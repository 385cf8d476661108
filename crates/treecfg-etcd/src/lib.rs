//! etcd backend for treecfg
//!
//! This crate implements the store traits from `treecfg-core` against the etcd
//! v2 keys API over HTTP, and wires them into a [`RemoteProvider`] answering
//! descriptors of kind `"etcd"`.
//!
//! # Features
//! - Recursive reads of a key tree
//! - Long-poll recursive watches that resume from the last seen index
//! - Optional HTTP basic auth
//! - YAML/TOML configuration with environment overrides
//!
//! # Example
//! ```no_run
//! # use std::sync::Arc;
//! # use treecfg_core::{CommaListDecoder, ProviderRegistry, RemoteConfigProvider, RemoteProviderDescriptor};
//! # use treecfg_etcd::EtcdConfig;
//! # async fn example() -> treecfg_core::Result<()> {
//! let mut registry = ProviderRegistry::new();
//! treecfg_etcd::register(&mut registry, EtcdConfig::default(), Some(Arc::new(CommaListDecoder)));
//!
//! let rp = RemoteProviderDescriptor::new("etcd", "http://127.0.0.1:2379", "/testconfig");
//! let json = registry.get(&rp).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod connector;
pub mod wire;

use std::sync::Arc;

use treecfg_core::{Decoder, ProviderRegistry, RemoteProvider};

pub use client::{EtcdKeysClient, EtcdWatcher};
pub use config::{EtcdConfig, HttpClientConfig};
pub use connector::EtcdConnector;

/// Descriptor kind served by this crate
pub const PROVIDER_KIND: &str = "etcd";

/// Build the etcd provider
pub fn provider(config: EtcdConfig, decoder: Option<Arc<dyn Decoder>>) -> RemoteProvider {
    let provider = RemoteProvider::new(PROVIDER_KIND, Arc::new(EtcdConnector::new(config)));
    match decoder {
        Some(decoder) => provider.with_decoder(decoder),
        None => provider,
    }
}

/// Register the etcd provider with `registry`
pub fn register(
    registry: &mut ProviderRegistry,
    config: EtcdConfig,
    decoder: Option<Arc<dyn Decoder>>,
) {
    registry.register(PROVIDER_KIND, Arc::new(provider(config, decoder)));
}
