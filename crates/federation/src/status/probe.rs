//! Health probes.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::client::ClientFactory;
use crate::model::{MetaStore, MetaStoreStatus};

/// Checks whether a metastore is reachable.
#[async_trait]
pub trait StatusProbe: Send + Sync {
    /// Probes the metastore. Never fails: errors mean unavailable.
    async fn probe(&self, metastore: &MetaStore) -> MetaStoreStatus;
}

/// Probes by creating a client and pinging the backend.
pub struct ClientStatusProbe {
    factory: Arc<dyn ClientFactory>,
}

impl ClientStatusProbe {
    /// Creates a probe using `factory` for connections.
    pub fn new(factory: Arc<dyn ClientFactory>) -> Self {
        Self { factory }
    }
}

#[async_trait]
impl StatusProbe for ClientStatusProbe {
    async fn probe(&self, metastore: &MetaStore) -> MetaStoreStatus {
        let result = match self.factory.create(metastore) {
            Ok(client) => client.ping().await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => MetaStoreStatus::Available,
            Err(e) => {
                debug!(metastore = %metastore.name, error = %e, "Status probe failed");
                MetaStoreStatus::Unavailable
            }
        }
    }
}
