//! Fixtures for building federations over mock clients.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use apiary_federation::client::ClientFactory;
use apiary_federation::model::{MetaStore, MetaStoreEntry, MetaStoreStatus};
use apiary_federation::routing::{RoutingTable, UsageMonitor, build_routing_table};
use apiary_federation::service::{InMemoryMetaStoreStorage, MetaStoreStorage};
use apiary_federation::status::StatusProbe;
use apiary_federation::{Federation, FederationSettings};

use super::mock_client::{MockCatalogClient, MockClientFactory};

/// Primary metastore named `primary`.
pub fn primary() -> MetaStore {
    MetaStore::primary("primary", "thrift://primary:9083")
}

/// Read-only federated metastore named `name`, prefixed `name_`.
pub fn federated(name: &str) -> MetaStore {
    MetaStore::federated(name, format!("thrift://{}:9083", name))
}

/// Settings with short timeouts.
pub fn settings() -> FederationSettings {
    FederationSettings::for_testing()
}

/// Builds a bare routing pipeline with every metastore registered.
pub fn routing_table(
    settings: &FederationSettings,
    factory: Arc<MockClientFactory>,
    metastores: Vec<MetaStore>,
) -> (Arc<dyn RoutingTable>, Arc<UsageMonitor>) {
    let monitor = Arc::new(UsageMonitor::new());
    let routing = build_routing_table(settings, factory, Arc::clone(&monitor));
    for metastore in metastores {
        routing
            .on_register(Arc::new(MetaStoreEntry::new(metastore)))
            .expect("registration should succeed");
    }
    (routing, monitor)
}

/// A federation over mock clients and in-memory storage.
pub struct Harness {
    pub factory: Arc<MockClientFactory>,
    pub storage: Arc<InMemoryMetaStoreStorage>,
    pub federation: Federation,
}

impl Harness {
    /// Builds a federation holding `metastores`, backed by `clients`.
    pub fn new(metastores: Vec<MetaStore>, clients: Vec<MockCatalogClient>) -> Self {
        Self::with_settings(&settings(), metastores, clients)
    }

    /// Same as [`Harness::new`] with explicit settings.
    pub fn with_settings(
        settings: &FederationSettings,
        metastores: Vec<MetaStore>,
        clients: Vec<MockCatalogClient>,
    ) -> Self {
        let factory = Arc::new(MockClientFactory::new());
        for client in clients {
            factory.add(client);
        }
        let storage = Arc::new(InMemoryMetaStoreStorage::new(metastores));
        let federation = Federation::new(
            settings,
            Arc::clone(&storage) as Arc<dyn MetaStoreStorage>,
            Arc::clone(&factory) as Arc<dyn ClientFactory>,
        )
        .expect("federation should build");

        Self {
            factory,
            storage,
            federation,
        }
    }

    /// Mock client serving metastore `name`.
    pub fn client(&self, name: &str) -> Arc<MockCatalogClient> {
        self.factory.client(name)
    }
}

/// What a scripted probe reports for one metastore.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Up,
    Down,
    Hang,
}

/// Probe answering from a script, `Up` for unscripted metastores.
#[derive(Debug, Default)]
pub struct ScriptedProbe {
    outcomes: Mutex<HashMap<String, ProbeOutcome>>,
    probes: AtomicUsize,
}

impl ScriptedProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the outcome for `name`.
    pub fn set(&self, name: &str, outcome: ProbeOutcome) {
        self.outcomes.lock().insert(name.to_string(), outcome);
    }

    /// Number of probes started.
    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatusProbe for ScriptedProbe {
    async fn probe(&self, metastore: &MetaStore) -> MetaStoreStatus {
        self.probes.fetch_add(1, Ordering::SeqCst);
        let outcome = self
            .outcomes
            .lock()
            .get(&metastore.name)
            .copied()
            .unwrap_or(ProbeOutcome::Up);
        match outcome {
            ProbeOutcome::Up => MetaStoreStatus::Available,
            ProbeOutcome::Down => MetaStoreStatus::Unavailable,
            ProbeOutcome::Hang => std::future::pending().await,
        }
    }
}
