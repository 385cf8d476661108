//! Live watch of a key tree
//!
//! [`spawn_watch`] runs two tasks per subscription:
//! - a listener that turns the caller's stop request into cancellation of the
//!   watch context;
//! - the watch loop, which waits for the next change, converts the changed
//!   node into a JSON fragment and sends it to the caller.
//!
//! The event channel holds a single event, so a slow consumer holds the loop
//! back. Errors from a single wait are delivered as events and the loop keeps
//! going; only cancellation or the caller dropping the receiver ends it, even
//! while a wait is still pending.

use bytes::Bytes;
use futures::stream::{self, BoxStream};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::{
    Error, Result,
    decoder::Decoder,
    document::render,
    store::{KeyStore, KeyWatcher, WatchCanceller, WatchContext, watch_context},
};

/// One watch event: a serialized document fragment or the error of one wait
pub type RemoteResponse = Result<Bytes>;

/// Stream of watch events
pub type RemoteResponseStream = BoxStream<'static, RemoteResponse>;

/// Event receiver plus the stop handle.
///
/// Sending on the stop handle (any value) ends the subscription; dropping it
/// does too.
pub type WatchChannel = (mpsc::Receiver<RemoteResponse>, oneshot::Sender<bool>);

/// Start watching `root_path` on `store`.
///
/// Must be called within a tokio runtime.
pub fn spawn_watch(
    store: Arc<dyn KeyStore>,
    root_path: impl Into<String>,
    decoder: Option<Arc<dyn Decoder>>,
) -> WatchChannel {
    let root_path = root_path.into();
    let (events_tx, events_rx) = mpsc::channel(1);
    let (done_tx, done_rx) = oneshot::channel::<bool>();
    let (canceller, ctx) = watch_context();
    let canceller = Arc::new(canceller);

    let watcher = store.watcher(&root_path);

    let listener_canceller = canceller.clone();
    let listener_ctx = ctx.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = done_rx => {
                debug!("Watch stop requested");
                listener_canceller.cancel();
            }
            _ = listener_ctx.cancelled() => {}
        }
    });

    tokio::spawn(watch_loop(
        watcher, root_path, decoder, events_tx, ctx, canceller,
    ));

    (events_rx, done_tx)
}

async fn watch_loop(
    mut watcher: Box<dyn KeyWatcher>,
    root_path: String,
    decoder: Option<Arc<dyn Decoder>>,
    events: mpsc::Sender<RemoteResponse>,
    ctx: WatchContext,
    canceller: Arc<WatchCanceller>,
) {
    info!(root_path = %root_path, "Watching key tree for changes");

    loop {
        let next = tokio::select! {
            _ = events.closed() => {
                debug!("Watch receiver dropped");
                break;
            }
            next = watcher.next(&ctx) => next,
        };

        let response = match next {
            Err(Error::Cancelled) => break,
            Err(e) => {
                warn!(root_path = %root_path, error = %e, "Watch wait failed");
                Err(e)
            }
            Ok(node) => render(&node, &root_path, decoder.as_deref()).inspect_err(|e| {
                error!(key = %node.path(), error = %e, "Failed to convert changed node");
            }),
        };

        tokio::select! {
            biased;
            _ = ctx.cancelled() => break,
            sent = events.send(response) => {
                if sent.is_err() {
                    debug!("Watch receiver dropped");
                    break;
                }
            }
        }
    }

    // Releases the listener task when the loop ends on its own
    canceller.cancel();
    info!(root_path = %root_path, "Stopped watching key tree");
}

/// Adapt a watch event receiver into a stream
pub fn response_stream(events: mpsc::Receiver<RemoteResponse>) -> RemoteResponseStream {
    Box::pin(stream::unfold(events, |mut rx| async move {
        rx.recv().await.map(|item| (item, rx))
    }))
}
