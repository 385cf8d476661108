//! StoreConnector implementation for etcd

use std::sync::Arc;

use treecfg_core::{KeyStore, Result, StoreConnector};

use crate::{client::EtcdKeysClient, config::EtcdConfig};

/// Opens a fresh [`EtcdKeysClient`] per call with fixed connection parameters
#[derive(Debug, Clone, Default)]
pub struct EtcdConnector {
    config: EtcdConfig,
}

impl EtcdConnector {
    pub fn new(config: EtcdConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EtcdConfig {
        &self.config
    }
}

impl StoreConnector for EtcdConnector {
    fn connect(&self, endpoint: &str) -> Result<Arc<dyn KeyStore>> {
        Ok(Arc::new(EtcdKeysClient::new(endpoint, &self.config)?))
    }
}
