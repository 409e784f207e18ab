//! Cross-cutting wrappers around a [`RoutingTable`].

use std::sync::Arc;

use crate::client::RequestKind;
use crate::error::{AccessError, FederationResult};
use crate::fanout::PanopticHandler;
use crate::mapping::Mapping;
use crate::model::{AccessControlType, MetaStore, MetaStoreEntry};
use crate::pattern::remove_catalog_name;

use super::monitor::UsageMonitor;
use super::{MappingEventListener, RoutingTable};

macro_rules! forward_events {
    ($wrapper:ident) => {
        impl<T: RoutingTable> MappingEventListener for $wrapper<T> {
            fn on_register(&self, entry: Arc<MetaStoreEntry>) -> FederationResult<()> {
                self.inner.on_register(entry)
            }

            fn on_update(
                &self,
                old: &MetaStore,
                entry: Arc<MetaStoreEntry>,
            ) -> FederationResult<()> {
                self.inner.on_update(old, entry)
            }

            fn on_unregister(&self, name: &str) -> FederationResult<()> {
                self.inner.on_unregister(name)
            }
        }
    };
}

// ============================================================================
// Monitoring
// ============================================================================

/// Records which metastore served each resolution.
#[derive(Debug)]
pub struct MonitoredRoutingTable<T> {
    inner: T,
    monitor: Arc<UsageMonitor>,
}

impl<T: RoutingTable> MonitoredRoutingTable<T> {
    /// Wraps `inner`.
    pub fn new(inner: T, monitor: Arc<UsageMonitor>) -> Self {
        Self { inner, monitor }
    }

    /// The usage counters.
    pub fn monitor(&self) -> &Arc<UsageMonitor> {
        &self.monitor
    }
}

forward_events!(MonitoredRoutingTable);

impl<T: RoutingTable> RoutingTable for MonitoredRoutingTable<T> {
    fn resolve_primary(&self) -> FederationResult<Arc<Mapping>> {
        let mapping = self.inner.resolve_primary()?;
        self.monitor.record(mapping.name());
        Ok(mapping)
    }

    fn resolve(&self, database: &str) -> FederationResult<Arc<Mapping>> {
        let mapping = self.inner.resolve(database)?;
        self.monitor.record(mapping.name());
        Ok(mapping)
    }

    fn check_allowed(
        &self,
        database: &str,
        table: Option<&str>,
        mapping: &Mapping,
        kind: RequestKind,
    ) -> FederationResult<()> {
        self.inner.check_allowed(database, table, mapping, kind)
    }

    fn filter(&self, database: &str, tables: Vec<String>, mapping: &Mapping) -> Vec<String> {
        self.inner.filter(database, tables, mapping)
    }

    fn available_mappings(&self) -> Vec<Arc<Mapping>> {
        self.inner.available_mappings()
    }

    fn all_mappings(&self) -> Vec<Arc<Mapping>> {
        self.inner.all_mappings()
    }

    fn panoptic_handler(&self) -> PanopticHandler {
        let handler = self.inner.panoptic_handler();
        self.monitor.record_all();
        handler
    }
}

// ============================================================================
// Catalog qualifiers
// ============================================================================

/// Strips catalog qualifiers (`@hive#db`) before names reach the table.
#[derive(Debug)]
pub struct TranslatingRoutingTable<T> {
    inner: T,
}

impl<T: RoutingTable> TranslatingRoutingTable<T> {
    /// Wraps `inner`.
    pub fn new(inner: T) -> Self {
        Self { inner }
    }
}

forward_events!(TranslatingRoutingTable);

impl<T: RoutingTable> RoutingTable for TranslatingRoutingTable<T> {
    fn resolve_primary(&self) -> FederationResult<Arc<Mapping>> {
        self.inner.resolve_primary()
    }

    fn resolve(&self, database: &str) -> FederationResult<Arc<Mapping>> {
        self.inner.resolve(&remove_catalog_name(database))
    }

    fn check_allowed(
        &self,
        database: &str,
        table: Option<&str>,
        mapping: &Mapping,
        kind: RequestKind,
    ) -> FederationResult<()> {
        self.inner
            .check_allowed(&remove_catalog_name(database), table, mapping, kind)
    }

    fn filter(&self, database: &str, tables: Vec<String>, mapping: &Mapping) -> Vec<String> {
        self.inner
            .filter(&remove_catalog_name(database), tables, mapping)
    }

    fn available_mappings(&self) -> Vec<Arc<Mapping>> {
        self.inner.available_mappings()
    }

    fn all_mappings(&self) -> Vec<Arc<Mapping>> {
        self.inner.all_mappings()
    }

    fn panoptic_handler(&self) -> PanopticHandler {
        self.inner.panoptic_handler()
    }
}

// ============================================================================
// Access control
// ============================================================================

/// Rejects writes the mapping's access-control policy forbids.
#[derive(Debug)]
pub struct AccessControlledRoutingTable<T> {
    inner: T,
}

impl<T: RoutingTable> AccessControlledRoutingTable<T> {
    /// Wraps `inner`.
    pub fn new(inner: T) -> Self {
        Self { inner }
    }
}

forward_events!(AccessControlledRoutingTable);

impl<T: RoutingTable> RoutingTable for AccessControlledRoutingTable<T> {
    fn resolve_primary(&self) -> FederationResult<Arc<Mapping>> {
        self.inner.resolve_primary()
    }

    fn resolve(&self, database: &str) -> FederationResult<Arc<Mapping>> {
        self.inner.resolve(database)
    }

    fn check_allowed(
        &self,
        database: &str,
        table: Option<&str>,
        mapping: &Mapping,
        kind: RequestKind,
    ) -> FederationResult<()> {
        if kind == RequestKind::Write {
            let local = mapping.transform_inbound(database);
            let gate = mapping.access_control();
            if !gate.has_write_permission(&local) {
                let metastore = mapping.name().to_string();
                let err = match gate.kind() {
                    AccessControlType::ReadOnly => AccessError::ReadOnly {
                        metastore,
                        database: local,
                    },
                    _ => AccessError::NotWhitelisted {
                        metastore,
                        database: local,
                    },
                };
                return Err(err.into());
            }
        }
        self.inner.check_allowed(database, table, mapping, kind)
    }

    fn filter(&self, database: &str, tables: Vec<String>, mapping: &Mapping) -> Vec<String> {
        self.inner.filter(database, tables, mapping)
    }

    fn available_mappings(&self) -> Vec<Arc<Mapping>> {
        self.inner.available_mappings()
    }

    fn all_mappings(&self) -> Vec<Arc<Mapping>> {
        self.inner.all_mappings()
    }

    fn panoptic_handler(&self) -> PanopticHandler {
        self.inner.panoptic_handler()
    }
}
