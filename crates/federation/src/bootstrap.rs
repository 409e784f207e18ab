//! Assembly of the federation core from settings and storage.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::info;

use crate::catalog::FederatedCatalog;
use crate::client::ClientFactory;
use crate::config::FederationSettings;
use crate::error::{ConfigError, FederationResult};
use crate::routing::{MappingEventListener, RoutingTable, UsageMonitor, build_routing_table};
use crate::service::{
    MetaStoreStorage, NotifyingFederationService, PopulateStatusFederationService,
};
use crate::status::{ClientStatusProbe, StatusPoller, StatusProbe};

/// Administrative service type exposed by [`Federation`].
pub type AdminService = PopulateStatusFederationService<NotifyingFederationService>;

/// A running federation: routing, catalog, admin service and status poller.
pub struct Federation {
    catalog: FederatedCatalog,
    admin: AdminService,
    poller: Arc<StatusPoller>,
    storage: Arc<dyn MetaStoreStorage>,
    monitor: Arc<UsageMonitor>,
    poll_handle: Option<JoinHandle<()>>,
}

impl Federation {
    /// Builds the federation with the default client-based status probe.
    pub fn new(
        settings: &FederationSettings,
        storage: Arc<dyn MetaStoreStorage>,
        factory: Arc<dyn ClientFactory>,
    ) -> FederationResult<Self> {
        let probe = Arc::new(ClientStatusProbe::new(Arc::clone(&factory)));
        Self::with_probe(settings, storage, factory, probe)
    }

    /// Builds the federation, registering every stored metastore.
    pub fn with_probe(
        settings: &FederationSettings,
        storage: Arc<dyn MetaStoreStorage>,
        factory: Arc<dyn ClientFactory>,
        probe: Arc<dyn StatusProbe>,
    ) -> FederationResult<Self> {
        settings
            .validate()
            .map_err(|problems| ConfigError::Invalid { problems })?;

        let monitor = Arc::new(UsageMonitor::new());
        let routing = build_routing_table(settings, factory, Arc::clone(&monitor));
        let listener: Arc<dyn MappingEventListener> = routing.clone();

        let notifying = NotifyingFederationService::new(
            Arc::clone(&storage),
            settings.database_resolution,
        )
        .with_listener(listener);
        notifying.replay()?;

        let poller = Arc::new(StatusPoller::new(probe, settings.status_deadline));
        let admin =
            PopulateStatusFederationService::new(notifying, Arc::clone(&storage), Arc::clone(&poller));

        info!(
            metastores = storage.all().len(),
            resolution = ?settings.database_resolution,
            "Federation initialized"
        );

        Ok(Self {
            catalog: FederatedCatalog::new(routing),
            admin,
            poller,
            storage,
            monitor,
            poll_handle: None,
        })
    }

    /// Starts the background status refresh.
    pub fn start_polling(&mut self, settings: &FederationSettings) {
        if self.poll_handle.is_none() {
            self.poll_handle = Some(
                self.poller
                    .start(settings.status_polling_interval, Arc::clone(&self.storage)),
            );
        }
    }

    /// The catalog surface.
    pub fn catalog(&self) -> &FederatedCatalog {
        &self.catalog
    }

    /// The routing pipeline.
    pub fn routing(&self) -> &Arc<dyn RoutingTable> {
        self.catalog.routing()
    }

    /// The administrative service.
    pub fn admin(&self) -> &AdminService {
        &self.admin
    }

    /// The status poller.
    pub fn poller(&self) -> &Arc<StatusPoller> {
        &self.poller
    }

    /// Usage counters.
    pub fn monitor(&self) -> &Arc<UsageMonitor> {
        &self.monitor
    }

    /// Stops polling and persists the definitions.
    pub async fn shutdown(mut self) -> FederationResult<()> {
        self.poller.stop().await;
        if let Some(handle) = self.poll_handle.take() {
            let _ = handle.await;
        }
        self.storage.save()?;
        info!("Federation shut down");
        Ok(())
    }
}

impl std::fmt::Debug for Federation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Federation")
            .field("catalog", &self.catalog)
            .field("poller", &self.poller)
            .finish()
    }
}
