//! treecfg core types and traits
//!
//! This crate turns a hierarchical key/value tree from a remote store into a
//! nested JSON configuration document and keeps it in sync:
//! - Key tree nodes and the tree-to-document walker
//! - One-shot snapshots and live watch streams
//! - Store client, connector and decoder abstractions
//! - The remote provider contract and explicit provider registration

pub mod decoder;
pub mod descriptor;
pub mod document;
pub mod encode;
pub mod error;
pub mod provider;
pub mod registry;
pub mod snapshot;
pub mod store;
pub mod tree;
pub mod watch;

#[cfg(test)]
mod testing;

pub use decoder::{CommaListDecoder, Decoder, JsonDecoder};
pub use descriptor::RemoteProviderDescriptor;
pub use document::{Document, DocumentValue};
pub use encode::EncodableValue;
pub use error::{Error, Result};
pub use provider::{RemoteConfigProvider, RemoteProvider};
pub use registry::ProviderRegistry;
pub use store::{KeyStore, KeyWatcher, StoreConnector, WatchContext};
pub use tree::TreeNode;
pub use watch::{RemoteResponse, WatchChannel, response_stream};
