//! etcd v2 keys API client

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, Method, RequestBuilder, Url, header::CONTENT_TYPE};
use std::time::Duration;
use tracing::{debug, info, warn};

use treecfg_core::{
    Error, KeyStore, KeyWatcher, Result, TreeNode, WatchContext,
    tree::{SEPARATOR, normalize_path},
};

use crate::{
    config::{EtcdConfig, HttpClientConfig},
    wire::{ERROR_EVENT_INDEX_CLEARED, KeysError, KeysResponse},
};

/// Create an HTTP client for the keys API.
///
/// No client-wide timeout is set because watches are long polls; reads and
/// writes apply `timeout_secs` per request instead.
pub fn create_client(config: &HttpClientConfig) -> Result<Client> {
    ClientBuilder::new()
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        // Expire idle connections before the server drops them
        .pool_idle_timeout(Duration::from_secs(90))
        .user_agent(&config.user_agent)
        .tcp_keepalive(Duration::from_secs(60))
        .build()
        .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Parse a store endpoint, defaulting to plain HTTP when no scheme is given
pub fn parse_endpoint(endpoint: &str) -> Result<Url> {
    let endpoint = endpoint.trim();
    let with_scheme = if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("http://{}", endpoint)
    };

    let url = Url::parse(&with_scheme)
        .map_err(|e| Error::Config(format!("Invalid etcd endpoint '{}': {}", endpoint, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(Error::Config(format!(
            "Unsupported etcd endpoint scheme '{}'",
            other
        ))),
    }
}

fn transport_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Connection(e.to_string())
    }
}

/// Outcome of one keys API call
enum Reply {
    Keys(KeysResponse),
    /// 2xx with an empty body; etcd ends idle long polls this way
    Empty,
    Failed(KeysError),
}

/// Client for one etcd endpoint
#[derive(Debug, Clone)]
pub struct EtcdKeysClient {
    http: Client,
    endpoint: Url,
    credentials: Option<(String, Option<String>)>,
    request_timeout: Duration,
}

impl EtcdKeysClient {
    /// Build a client for `endpoint` using `config`'s credentials and HTTP settings
    ///
    /// # Errors
    /// - `Error::Config` if the endpoint can't be parsed or the HTTP client can't be built
    pub fn new(endpoint: &str, config: &EtcdConfig) -> Result<Self> {
        let endpoint = parse_endpoint(endpoint)?;
        let http = create_client(&config.client)?;

        debug!(endpoint = %endpoint, "Created etcd keys client");

        Ok(Self {
            http,
            endpoint,
            credentials: config.credentials(),
            request_timeout: Duration::from_secs(config.client.timeout_secs),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Keys API URL for `path`; each key segment is percent-encoded
    fn keys_url(&self, path: &str, query: &[(&str, &str)]) -> Result<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| {
                Error::Config(format!(
                    "etcd endpoint '{}' cannot carry a key path",
                    self.endpoint
                ))
            })?
            .pop_if_empty()
            .extend(["v2", "keys"])
            .extend(path.split(SEPARATOR).filter(|s| !s.is_empty()));
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match &self.credentials {
            Some((username, password)) => builder.basic_auth(username, password.as_deref()),
            None => builder,
        }
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Reply> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(transport_error)?;

        if status.is_success() {
            if body.iter().all(u8::is_ascii_whitespace) {
                return Ok(Reply::Empty);
            }
            return Ok(Reply::Keys(serde_json::from_slice(&body)?));
        }

        match serde_json::from_slice::<KeysError>(&body) {
            Ok(failure) => Ok(Reply::Failed(failure)),
            Err(_) => Err(Error::Store {
                code: u64::from(status.as_u16()),
                message: status
                    .canonical_reason()
                    .unwrap_or("unexpected status")
                    .to_string(),
                cause: Some(String::from_utf8_lossy(&body).trim().to_string())
                    .filter(|s| !s.is_empty()),
            }),
        }
    }

    /// Execute a read or write and require a keys response
    async fn execute_keys(&self, request: RequestBuilder, path: &str) -> Result<KeysResponse> {
        match self.execute(request.timeout(self.request_timeout)).await? {
            Reply::Keys(response) => Ok(response),
            Reply::Failed(failure) => Err(failure.into_error(path)),
            Reply::Empty => Err(Error::Store {
                code: 0,
                message: "empty response".to_string(),
                cause: Some(path.to_string()),
            }),
        }
    }
}

#[async_trait]
impl KeyStore for EtcdKeysClient {
    async fn get(&self, path: &str) -> Result<TreeNode> {
        let url = self.keys_url(path, &[("recursive", "true"), ("sorted", "true")])?;
        let response = self
            .execute_keys(self.request(Method::GET, url), path)
            .await?;
        Ok(response.node.into())
    }

    fn watcher(&self, path: &str) -> Box<dyn KeyWatcher> {
        Box::new(EtcdWatcher::new(self.clone(), path))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let url = self.keys_url(key, &[])?;
        let body = serde_urlencoded::to_string([("value", value)])
            .map_err(|e| Error::Internal(format!("Failed to encode value: {}", e)))?;
        let request = self
            .request(Method::PUT, url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body);

        let response = self.execute_keys(request, key).await?;
        debug!(key, action = %response.action, "Set key");
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let url = self.keys_url(path, &[("recursive", "true")])?;
        let response = self
            .execute_keys(self.request(Method::DELETE, url), path)
            .await?;
        debug!(path, action = %response.action, "Deleted key");
        Ok(())
    }
}

/// Recursive long-poll watcher.
///
/// Each wait resumes after the last delivered modification, so no change is
/// skipped between two calls to [`next`](KeyWatcher::next).
#[derive(Debug)]
pub struct EtcdWatcher {
    client: EtcdKeysClient,
    path: String,
    wait_index: Option<u64>,
}

impl EtcdWatcher {
    pub fn new(client: EtcdKeysClient, path: &str) -> Self {
        info!(endpoint = %client.endpoint(), path, "Created etcd watcher");
        Self {
            client,
            path: normalize_path(path),
            wait_index: None,
        }
    }

    /// Index the next wait resumes from, if any change has been seen
    pub fn wait_index(&self) -> Option<u64> {
        self.wait_index
    }

    async fn wait_once(&self) -> Result<Reply> {
        let wait_index = self.wait_index.map(|index| index.to_string());
        let mut query = vec![("wait", "true"), ("recursive", "true")];
        if let Some(index) = wait_index.as_deref() {
            query.push(("waitIndex", index));
        }

        let url = self.client.keys_url(&self.path, &query)?;
        self.client
            .execute(self.client.request(Method::GET, url))
            .await
    }
}

#[async_trait]
impl KeyWatcher for EtcdWatcher {
    async fn next(&mut self, ctx: &WatchContext) -> Result<TreeNode> {
        loop {
            let reply = tokio::select! {
                biased;
                _ = ctx.cancelled() => return Err(Error::Cancelled),
                reply = self.wait_once() => reply?,
            };

            match reply {
                Reply::Keys(response) => {
                    self.wait_index = Some(response.node.modified_index + 1);
                    debug!(
                        key = %response.node.key,
                        action = %response.action,
                        index = response.node.modified_index,
                        "Received etcd change"
                    );
                    return Ok(response.node.into());
                }
                Reply::Empty => {
                    debug!(path = %self.path, "Watch poll ended without a change, re-issuing");
                }
                Reply::Failed(failure) if failure.error_code == ERROR_EVENT_INDEX_CLEARED => {
                    // Changes between the old and new index are lost; resume from now
                    warn!(
                        path = %self.path,
                        index = failure.index,
                        "Watch index was cleared, resuming from current index"
                    );
                    self.wait_index = Some(failure.index + 1);
                    return Err(failure.into_error(&self.path));
                }
                Reply::Failed(failure) => return Err(failure.into_error(&self.path)),
            }
        }
    }
}
