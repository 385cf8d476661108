//! Store client abstraction
//!
//! The provider never talks to a concrete store directly. It asks a
//! [`StoreConnector`] for a [`KeyStore`] per call, reads trees through it and
//! subscribes to changes through a [`KeyWatcher`].

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;

use crate::{Result, tree::TreeNode};

/// Cancellation context handed to blocking watch waits.
///
/// Cloning shares the same underlying signal.
#[derive(Debug, Clone)]
pub struct WatchContext {
    rx: watch::Receiver<bool>,
}

/// Sending half of a [`WatchContext`]
#[derive(Debug)]
pub struct WatchCanceller {
    tx: watch::Sender<bool>,
}

/// Create a linked canceller/context pair
pub fn watch_context() -> (WatchCanceller, WatchContext) {
    let (tx, rx) = watch::channel(false);
    (WatchCanceller { tx }, WatchContext { rx })
}

impl WatchCanceller {
    /// Terminate the context; every pending and future wait on it returns.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl WatchContext {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once the context is cancelled.
    ///
    /// A context whose canceller is gone can never be cancelled explicitly and
    /// counts as cancelled.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// Client for a hierarchical key-value store
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Recursively read the subtree rooted at `path`
    async fn get(&self, path: &str) -> Result<TreeNode>;

    /// Create a recursive watcher for changes under `path`
    fn watcher(&self, path: &str) -> Box<dyn KeyWatcher>;

    /// Unconditionally set `key` to `value`, creating intermediate directories
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Recursively delete `path`
    async fn delete(&self, path: &str) -> Result<()>;
}

/// Long-lived subscription to changes under a path
#[async_trait]
pub trait KeyWatcher: Send {
    /// Wait for the next change and return the changed node.
    ///
    /// # Errors
    /// - `Error::Cancelled` once `ctx` is cancelled
    /// - any store or connectivity error for this wait; the watcher stays usable
    async fn next(&mut self, ctx: &WatchContext) -> Result<TreeNode>;
}

/// Builds store clients from an endpoint address.
///
/// Connection parameters other than the endpoint (credentials, HTTP settings)
/// belong to the connector and are fixed when it is constructed.
#[cfg_attr(test, mockall::automock)]
pub trait StoreConnector: Send + Sync {
    fn connect(&self, endpoint: &str) -> Result<Arc<dyn KeyStore>>;
}
