//! Federation service that refreshes statuses on read.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{FederationResult, RegistrationError};
use crate::model::{MetaStore, MetaStoreView};
use crate::status::StatusPoller;

use super::FederationService;
use super::storage::MetaStoreStorage;

/// Populates statuses before returning definitions.
///
/// `get` probes synchronously and is exact. `get_all` runs the bounded bulk
/// refresh and returns a snapshot taken when the deadline passes or every
/// probe reports, whichever comes first.
pub struct PopulateStatusFederationService<S> {
    inner: S,
    storage: Arc<dyn MetaStoreStorage>,
    poller: Arc<StatusPoller>,
}

impl<S: FederationService> PopulateStatusFederationService<S> {
    /// Wraps `inner`; `storage` must be the storage `inner` writes to.
    pub fn new(inner: S, storage: Arc<dyn MetaStoreStorage>, poller: Arc<StatusPoller>) -> Self {
        Self {
            inner,
            storage,
            poller,
        }
    }

    /// The wrapped service.
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: FederationService> FederationService for PopulateStatusFederationService<S> {
    async fn register(&self, metastore: MetaStore) -> FederationResult<()> {
        self.inner.register(metastore).await
    }

    async fn update(&self, old: &MetaStore, metastore: MetaStore) -> FederationResult<()> {
        self.inner.update(old, metastore).await
    }

    async fn unregister(&self, name: &str) -> FederationResult<()> {
        self.inner.unregister(name).await
    }

    async fn get(&self, name: &str) -> FederationResult<MetaStoreView> {
        let entry = self
            .storage
            .get(name)
            .ok_or_else(|| RegistrationError::NotRegistered {
                name: name.to_string(),
            })?;
        self.poller.refresh_one(&entry).await;
        Ok(entry.view())
    }

    async fn get_all(&self) -> Vec<MetaStoreView> {
        let entries = self.storage.all();
        self.poller.refresh_all(&entries).await;
        entries.iter().map(|entry| entry.view()).collect()
    }
}
