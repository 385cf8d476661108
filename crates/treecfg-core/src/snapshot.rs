//! One-shot snapshot of a key tree

use bytes::Bytes;
use tracing::{debug, error};

use crate::{Result, decoder::Decoder, document::render, store::KeyStore};

/// Recursively read `root_path` and encode it as a JSON object.
///
/// Either the whole document is returned or an error; nothing is cached.
pub async fn fetch(
    store: &dyn KeyStore,
    root_path: &str,
    decoder: Option<&dyn Decoder>,
) -> Result<Bytes> {
    debug!(root_path, "Fetching key tree");

    let node = store.get(root_path).await?;
    let bytes = render(&node, root_path, decoder).inspect_err(|e| {
        error!(root_path, error = %e, "Failed to convert key tree");
    })?;

    debug!(root_path, bytes = bytes.len(), "Fetched key tree");
    Ok(bytes)
}
