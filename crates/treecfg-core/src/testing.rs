//! Scripted in-memory store for unit tests

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use crate::{
    Error, Result,
    store::{KeyStore, KeyWatcher, WatchContext},
    tree::TreeNode,
};

/// Serves one fixed tree and replays scripted watch results in order
pub(crate) struct ScriptedStore {
    tree: TreeNode,
    pub(crate) gets: AtomicUsize,
    events: Mutex<Option<mpsc::UnboundedReceiver<Result<TreeNode>>>>,
}

impl ScriptedStore {
    pub(crate) fn new(tree: TreeNode) -> (Arc<Self>, mpsc::UnboundedSender<Result<TreeNode>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let store = Arc::new(Self {
            tree,
            gets: AtomicUsize::new(0),
            events: Mutex::new(Some(rx)),
        });
        (store, tx)
    }
}

#[async_trait]
impl KeyStore for ScriptedStore {
    async fn get(&self, path: &str) -> Result<TreeNode> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if path != self.tree.path() {
            return Err(Error::KeyNotFound(path.to_string()));
        }
        Ok(self.tree.clone())
    }

    fn watcher(&self, _path: &str) -> Box<dyn KeyWatcher> {
        let rx = self
            .events
            .lock()
            .unwrap()
            .take()
            .expect("scripted store supports a single watcher");
        Box::new(ScriptedWatcher { rx })
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<()> {
        Ok(())
    }

    async fn delete(&self, _path: &str) -> Result<()> {
        Ok(())
    }
}

struct ScriptedWatcher {
    rx: mpsc::UnboundedReceiver<Result<TreeNode>>,
}

#[async_trait]
impl KeyWatcher for ScriptedWatcher {
    async fn next(&mut self, ctx: &WatchContext) -> Result<TreeNode> {
        tokio::select! {
            biased;
            _ = ctx.cancelled() => Err(Error::Cancelled),
            item = self.rx.recv() => match item {
                Some(result) => result,
                None => {
                    ctx.cancelled().await;
                    Err(Error::Cancelled)
                }
            },
        }
    }
}
