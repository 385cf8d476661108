//! Tests for the store-backed provider

use super::*;
use crate::{
    decoder::CommaListDecoder, store::MockStoreConnector, testing::ScriptedStore, tree::TreeNode,
};
use std::time::Duration;

const ENDPOINT: &str = "http://127.0.0.1:2379";

fn descriptor(kind: &str) -> RemoteProviderDescriptor {
    RemoteProviderDescriptor::new(kind, ENDPOINT, "/testconfig")
}

fn sample_tree() -> TreeNode {
    TreeNode::from_flat(
        "/testconfig",
        [
            ("access/token", "testing_token"),
            ("database/addr", "http://localhost:5432"),
            ("providers", "redis,postgres"),
        ],
    )
}

fn connector_for(store: Arc<ScriptedStore>, calls: usize) -> Arc<MockStoreConnector> {
    let mut connector = MockStoreConnector::new();
    connector
        .expect_connect()
        .withf(|endpoint| endpoint == ENDPOINT)
        .times(calls)
        .returning(move |_| Ok(store.clone() as Arc<dyn KeyStore>));
    Arc::new(connector)
}

#[tokio::test]
async fn test_wrong_kind_fails_before_connecting() {
    let mut connector = MockStoreConnector::new();
    connector.expect_connect().never();
    let provider = RemoteProvider::new("etcd", Arc::new(connector));

    let err = provider.get(&descriptor("consul")).await.unwrap_err();
    assert!(err.is_config());
    assert!(matches!(err, Error::UnsupportedProvider { .. }));

    assert!(provider.watch(&descriptor("consul")).await.is_err());
    assert!(provider.watch_channel(&descriptor("consul")).await.is_err());
}

#[tokio::test]
async fn test_secret_keyring_without_decoder_is_rejected() {
    let mut connector = MockStoreConnector::new();
    connector.expect_connect().never();
    let provider = RemoteProvider::new("etcd", Arc::new(connector));

    let rp = descriptor("etcd").with_secret_keyring("/keyring.gpg");
    let err = provider.get(&rp).await.unwrap_err();
    assert!(matches!(err, Error::SecretKeyringUnsupported));
    assert!(err.is_config());
}

#[tokio::test]
async fn test_secret_keyring_with_decoder_is_accepted() {
    let (store, _events) = ScriptedStore::new(sample_tree());
    let provider = RemoteProvider::new("etcd", connector_for(store, 1))
        .with_decoder(Arc::new(CommaListDecoder));

    let rp = descriptor("etcd").with_secret_keyring("/keyring.gpg");
    let bytes = provider.get(&rp).await.unwrap();
    assert!(!bytes.is_empty());
}

#[tokio::test]
async fn test_empty_endpoint_is_rejected() {
    let mut connector = MockStoreConnector::new();
    connector.expect_connect().never();
    let provider = RemoteProvider::new("etcd", Arc::new(connector));

    let rp = RemoteProviderDescriptor::new("etcd", "", "/testconfig");
    assert!(matches!(provider.get(&rp).await, Err(Error::Config(_))));
}

#[tokio::test]
async fn test_get_and_watch_read_the_tree() {
    let (store, _events) = ScriptedStore::new(sample_tree());
    let provider = RemoteProvider::new("etcd", connector_for(store, 2));

    let from_get = provider.get(&descriptor("etcd")).await.unwrap();
    let from_watch = provider.watch(&descriptor("etcd")).await.unwrap();

    assert_eq!(from_get, from_watch);
    assert_eq!(
        serde_json::from_slice::<serde_json::Value>(&from_get).unwrap(),
        serde_json::json!({
            "access": {"token": "testing_token"},
            "database": {"addr": "http://localhost:5432"},
            "providers": "redis,postgres"
        })
    );
}

#[tokio::test]
async fn test_decoder_is_applied() {
    let (store, _events) = ScriptedStore::new(sample_tree());
    let provider = RemoteProvider::new("etcd", connector_for(store, 1))
        .with_decoder(Arc::new(CommaListDecoder));

    let bytes = provider.get(&descriptor("etcd")).await.unwrap();
    let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(value["providers"], serde_json::json!(["redis", "postgres"]));
}

#[tokio::test]
async fn test_connector_failure_is_returned() {
    let mut connector = MockStoreConnector::new();
    connector
        .expect_connect()
        .times(1)
        .returning(|_| Err(Error::Connection("dns error".to_string())));
    let provider = RemoteProvider::new("etcd", Arc::new(connector));

    assert!(matches!(
        provider.get(&descriptor("etcd")).await,
        Err(Error::Connection(_))
    ));
}

#[tokio::test]
async fn test_watch_channel_delivers_changes() {
    let (store, script) = ScriptedStore::new(sample_tree());
    let provider = RemoteProvider::new("etcd", connector_for(store, 1));

    let (mut events, done) = provider.watch_channel(&descriptor("etcd")).await.unwrap();
    script
        .send(Ok(TreeNode::leaf("/testconfig/access/token", "newtoken")))
        .unwrap();

    let event = tokio::time::timeout(Duration::from_secs(1), events.recv())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(&event[..], br#"{"access":{"token":"newtoken"}}"#);

    done.send(false).unwrap();
}

#[test]
fn test_provider_debug_hides_internals() {
    let provider = RemoteProvider::new("etcd", Arc::new(MockStoreConnector::new()))
        .with_decoder(Arc::new(CommaListDecoder));
    let debug = format!("{:?}", provider);
    assert!(debug.contains("etcd"));
    assert!(provider.has_decoder());
    assert_eq!(provider.kind(), "etcd");
}
