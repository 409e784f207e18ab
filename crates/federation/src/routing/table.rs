//! Base routing table over the mapping registry.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::client::RequestKind;
use crate::config::DatabaseResolution;
use crate::error::{AccessError, FederationResult, RoutingError};
use crate::fanout::{DatabaseFilter, FanOutExecutor, PanopticHandler, PatternScope};
use crate::mapping::Mapping;
use crate::model::{MetaStore, MetaStoreEntry};

use super::registry::MappingRegistry;
use super::{MappingEventListener, RoutingTable};

/// Resolves names against the current registry snapshot.
///
/// Prefixed resolution picks the longest matching prefix; manual resolution
/// looks the name up in the federated metastores' mapped databases. Both fall
/// back to the primary. Only visibility is enforced here.
#[derive(Debug)]
pub struct MappingRoutingTable {
    registry: MappingRegistry,
    executor: FanOutExecutor,
}

impl MappingRoutingTable {
    /// Creates a table; fan-out calls get `request_timeout` plus latency.
    pub fn new(registry: MappingRegistry, request_timeout: Duration) -> Self {
        Self {
            registry,
            executor: FanOutExecutor::new(request_timeout),
        }
    }

    /// The underlying registry.
    pub fn registry(&self) -> &MappingRegistry {
        &self.registry
    }

    fn database_filter() -> DatabaseFilter {
        Arc::new(|database: &str, mapping: &Mapping| mapping.is_database_mapped(database))
    }
}

impl MappingEventListener for MappingRoutingTable {
    fn on_register(&self, entry: Arc<MetaStoreEntry>) -> FederationResult<()> {
        self.registry.register(entry)
    }

    fn on_update(&self, old: &MetaStore, entry: Arc<MetaStoreEntry>) -> FederationResult<()> {
        self.registry.update(old, entry)
    }

    fn on_unregister(&self, name: &str) -> FederationResult<()> {
        self.registry.unregister(name)
    }
}

impl RoutingTable for MappingRoutingTable {
    fn resolve_primary(&self) -> FederationResult<Arc<Mapping>> {
        self.registry
            .snapshot()
            .primary()
            .cloned()
            .ok_or_else(|| RoutingError::PrimaryNotConfigured.into())
    }

    fn resolve(&self, database: &str) -> FederationResult<Arc<Mapping>> {
        let snapshot = self.registry.snapshot();
        let owner = match self.registry.resolution() {
            DatabaseResolution::Prefixed => snapshot.by_prefix(database),
            DatabaseResolution::Manual => snapshot.by_database(database),
        };

        match owner.or(snapshot.primary()) {
            Some(mapping) => {
                debug!(database = %database, metastore = %mapping.name(), "Resolved database");
                Ok(Arc::clone(mapping))
            }
            None => Err(RoutingError::NoPrimary {
                database: database.to_string(),
            }
            .into()),
        }
    }

    fn check_allowed(
        &self,
        database: &str,
        table: Option<&str>,
        mapping: &Mapping,
        _kind: RequestKind,
    ) -> FederationResult<()> {
        let local = mapping.transform_inbound(database);
        if !mapping.is_database_mapped(&local) {
            return Err(AccessError::DatabaseNotMapped {
                metastore: mapping.name().to_string(),
                database: local,
            }
            .into());
        }

        if let Some(table) = table
            && !mapping.is_table_mapped(&local, table)
        {
            return Err(AccessError::TableNotMapped {
                metastore: mapping.name().to_string(),
                database: local,
                table: table.to_string(),
            }
            .into());
        }

        Ok(())
    }

    fn filter(&self, database: &str, tables: Vec<String>, mapping: &Mapping) -> Vec<String> {
        let local = mapping.transform_inbound(database);
        tables
            .into_iter()
            .filter(|table| mapping.is_table_mapped(&local, table))
            .collect()
    }

    fn available_mappings(&self) -> Vec<Arc<Mapping>> {
        self.registry
            .snapshot()
            .mappings()
            .iter()
            .filter(|m| m.is_available())
            .cloned()
            .collect()
    }

    fn all_mappings(&self) -> Vec<Arc<Mapping>> {
        self.registry.snapshot().mappings().to_vec()
    }

    fn panoptic_handler(&self) -> PanopticHandler {
        let scope = match self.registry.resolution() {
            DatabaseResolution::Prefixed => PatternScope::Decompose,
            DatabaseResolution::Manual => PatternScope::Forward,
        };
        PanopticHandler::new(
            self.available_mappings(),
            self.executor.clone(),
            Self::database_filter(),
            scope,
        )
    }
}
