//! Administrative operations on the set of federated metastores.

mod notifying;
mod populate;
mod storage;

pub use notifying::NotifyingFederationService;
pub use populate::PopulateStatusFederationService;
pub use storage::{InMemoryMetaStoreStorage, MetaStoreStorage, YamlMetaStoreStorage};

use async_trait::async_trait;

use crate::error::FederationResult;
use crate::model::{MetaStore, MetaStoreView};

/// Register, update, unregister and inspect metastores.
#[async_trait]
pub trait FederationService: Send + Sync {
    /// Adds a metastore. Registering an identical definition again is a no-op.
    async fn register(&self, metastore: MetaStore) -> FederationResult<()>;

    /// Replaces the definition registered as `old`.
    async fn update(&self, old: &MetaStore, metastore: MetaStore) -> FederationResult<()>;

    /// Removes a federated metastore.
    async fn unregister(&self, name: &str) -> FederationResult<()>;

    /// One definition with its status.
    async fn get(&self, name: &str) -> FederationResult<MetaStoreView>;

    /// Every definition with its status.
    async fn get_all(&self) -> Vec<MetaStoreView>;
}
