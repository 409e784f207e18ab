//! Resolution of database names to mappings.
//!
//! The routing layer is a fixed pipeline of wrappers around a base table,
//! all sharing the [`RoutingTable`] contract:
//!
//! ```text
//! MonitoredRoutingTable        records which metastore served each request
//!   TranslatingRoutingTable    strips catalog qualifiers from names
//!     AccessControlledRoutingTable   enforces write policies
//!       MappingRoutingTable    resolves against the registry snapshot
//! ```
//!
//! Each wrapper owns exactly one delegate and forwards every call it does not
//! augment, registration events included.

mod decorators;
mod monitor;
mod registry;
mod table;

pub use decorators::{AccessControlledRoutingTable, MonitoredRoutingTable, TranslatingRoutingTable};
pub use monitor::{ALL_METASTORES, UsageMonitor};
pub use registry::{MappingRegistry, RoutingSnapshot};
pub use table::MappingRoutingTable;

use std::sync::Arc;

use crate::client::{ClientFactory, RequestKind};
use crate::config::FederationSettings;
use crate::error::FederationResult;
use crate::fanout::PanopticHandler;
use crate::mapping::Mapping;
use crate::model::{MetaStore, MetaStoreEntry};

/// Receives registration events for metastores.
pub trait MappingEventListener: Send + Sync {
    /// A metastore was registered.
    fn on_register(&self, entry: Arc<MetaStoreEntry>) -> FederationResult<()>;

    /// A metastore definition was replaced.
    fn on_update(&self, old: &MetaStore, entry: Arc<MetaStoreEntry>) -> FederationResult<()>;

    /// A metastore was removed.
    fn on_unregister(&self, name: &str) -> FederationResult<()>;
}

/// Name resolution contract shared by the base table and its wrappers.
///
/// Database names are caller-visible: prefixed, possibly aliased, possibly
/// catalog-qualified.
pub trait RoutingTable: MappingEventListener {
    /// The fallback mapping.
    fn resolve_primary(&self) -> FederationResult<Arc<Mapping>>;

    /// The mapping owning `database`, or the primary.
    fn resolve(&self, database: &str) -> FederationResult<Arc<Mapping>>;

    /// Fails if the operation on `database` (and `table`) is not permitted.
    fn check_allowed(
        &self,
        database: &str,
        table: Option<&str>,
        mapping: &Mapping,
        kind: RequestKind,
    ) -> FederationResult<()>;

    /// Keeps the tables of `database` visible through `mapping`.
    fn filter(&self, database: &str, tables: Vec<String>, mapping: &Mapping) -> Vec<String>;

    /// Mappings not currently flagged unavailable.
    fn available_mappings(&self) -> Vec<Arc<Mapping>>;

    /// Every registered mapping.
    fn all_mappings(&self) -> Vec<Arc<Mapping>>;

    /// Handler fanning operations out over the available mappings.
    fn panoptic_handler(&self) -> PanopticHandler;
}

/// Builds the full routing pipeline.
pub fn build_routing_table(
    settings: &FederationSettings,
    factory: Arc<dyn ClientFactory>,
    monitor: Arc<UsageMonitor>,
) -> Arc<dyn RoutingTable> {
    let registry = MappingRegistry::new(settings.database_resolution, factory);
    let base = MappingRoutingTable::new(registry, settings.request_timeout);
    Arc::new(MonitoredRoutingTable::new(
        TranslatingRoutingTable::new(AccessControlledRoutingTable::new(base)),
        monitor,
    ))
}
