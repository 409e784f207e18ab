//! Copy-on-write store of registered mappings.
//!
//! Readers load an immutable [`RoutingSnapshot`] and never block. Writers are
//! serialized, build a complete new snapshot and publish it with one atomic
//! swap, so a reader sees either the old or the new set of mappings.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tracing::info;

use crate::client::ClientFactory;
use crate::config::DatabaseResolution;
use crate::error::{FederationResult, RegistrationError};
use crate::mapping::Mapping;
use crate::model::{MetaStore, MetaStoreEntry, check_compatible};

/// Immutable view of the registered mappings.
#[derive(Debug, Default)]
pub struct RoutingSnapshot {
    mappings: Vec<Arc<Mapping>>,
    primary: Option<Arc<Mapping>>,
    /// Non-empty prefixes, longest first.
    by_prefix: Vec<Arc<Mapping>>,
    /// Lowercase mapped database to federated owner.
    by_database: HashMap<String, Arc<Mapping>>,
}

impl RoutingSnapshot {
    fn build(mappings: Vec<Arc<Mapping>>) -> Self {
        let primary = mappings.iter().find(|m| m.is_primary()).cloned();

        let mut by_prefix: Vec<Arc<Mapping>> = mappings
            .iter()
            .filter(|m| !m.prefix().is_empty())
            .cloned()
            .collect();
        by_prefix.sort_by(|a, b| b.prefix().len().cmp(&a.prefix().len()));

        let mut by_database = HashMap::new();
        for mapping in mappings.iter().filter(|m| !m.is_primary()) {
            for database in mapping.definition().mapped_databases.iter().flatten() {
                by_database.insert(database.to_lowercase(), Arc::clone(mapping));
            }
        }

        Self {
            mappings,
            primary,
            by_prefix,
            by_database,
        }
    }

    /// All mappings in registration order.
    pub fn mappings(&self) -> &[Arc<Mapping>] {
        &self.mappings
    }

    /// The primary mapping, if registered.
    pub fn primary(&self) -> Option<&Arc<Mapping>> {
        self.primary.as_ref()
    }

    /// Mapping with the longest prefix that starts `database`, ignoring case.
    pub fn by_prefix(&self, database: &str) -> Option<&Arc<Mapping>> {
        self.by_prefix.iter().find(|mapping| {
            database
                .get(..mapping.prefix().len())
                .is_some_and(|head| head.eq_ignore_ascii_case(mapping.prefix()))
        })
    }

    /// Federated mapping listing `database` in its mapped databases.
    pub fn by_database(&self, database: &str) -> Option<&Arc<Mapping>> {
        self.by_database.get(&database.to_lowercase())
    }

    /// Mapping registered under `name`.
    pub fn by_name(&self, name: &str) -> Option<&Arc<Mapping>> {
        self.mappings.iter().find(|m| m.name() == name)
    }
}

/// Registered mappings with atomic replacement.
pub struct MappingRegistry {
    resolution: DatabaseResolution,
    factory: Arc<dyn ClientFactory>,
    snapshot: ArcSwap<RoutingSnapshot>,
    write_lock: Mutex<()>,
}

impl MappingRegistry {
    /// Creates an empty registry.
    pub fn new(resolution: DatabaseResolution, factory: Arc<dyn ClientFactory>) -> Self {
        Self {
            resolution,
            factory,
            snapshot: ArcSwap::from_pointee(RoutingSnapshot::default()),
            write_lock: Mutex::new(()),
        }
    }

    /// The resolution mode mappings are built for.
    pub fn resolution(&self) -> DatabaseResolution {
        self.resolution
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Arc<RoutingSnapshot> {
        self.snapshot.load_full()
    }

    /// Adds a mapping for `entry`.
    ///
    /// Registering a definition identical to the one already registered under
    /// the same name is a no-op.
    pub fn register(&self, entry: Arc<MetaStoreEntry>) -> FederationResult<()> {
        let _guard = self.write_lock.lock();
        let current = self.snapshot.load_full();

        if let Some(existing) = current.by_name(entry.name()) {
            if existing.is_built_from(entry.definition()) {
                return Ok(());
            }
            return Err(RegistrationError::DuplicateName {
                name: entry.name().to_string(),
            }
            .into());
        }

        check_compatible(
            current.mappings().iter().map(|m| m.definition()),
            entry.definition(),
            self.resolution,
        )?;

        let mapping = self.bind(entry)?;
        info!(metastore = %mapping.name(), prefix = %mapping.prefix(), "Registered metastore mapping");

        let mut mappings = current.mappings().to_vec();
        mappings.push(Arc::new(mapping));
        self.publish(mappings);
        Ok(())
    }

    /// Replaces the mapping of `old` with one for `entry`, in place.
    pub fn update(&self, old: &MetaStore, entry: Arc<MetaStoreEntry>) -> FederationResult<()> {
        let _guard = self.write_lock.lock();
        let current = self.snapshot.load_full();

        let position = current
            .mappings()
            .iter()
            .position(|m| m.name() == old.name)
            .ok_or_else(|| RegistrationError::NotRegistered {
                name: old.name.clone(),
            })?;

        let replaced = &current.mappings()[position];
        if replaced.definition().federation_type != entry.definition().federation_type {
            return Err(RegistrationError::FederationTypeChange {
                name: old.name.clone(),
            }
            .into());
        }

        check_compatible(
            current
                .mappings()
                .iter()
                .filter(|m| m.name() != old.name)
                .map(|m| m.definition()),
            entry.definition(),
            self.resolution,
        )?;

        let mapping = self.bind(entry)?;
        info!(metastore = %mapping.name(), previous = %old.name, prefix = %mapping.prefix(), "Updated metastore mapping");

        let mut mappings = current.mappings().to_vec();
        mappings[position] = Arc::new(mapping);
        self.publish(mappings);
        Ok(())
    }

    /// Removes the mapping registered under `name`.
    pub fn unregister(&self, name: &str) -> FederationResult<()> {
        let _guard = self.write_lock.lock();
        let current = self.snapshot.load_full();

        let mapping = current
            .by_name(name)
            .ok_or_else(|| RegistrationError::NotRegistered {
                name: name.to_string(),
            })?;
        if mapping.is_primary() {
            return Err(RegistrationError::PrimaryUnregister {
                name: name.to_string(),
            }
            .into());
        }

        let mappings = current
            .mappings()
            .iter()
            .filter(|m| m.name() != name)
            .cloned()
            .collect();
        self.publish(mappings);
        info!(metastore = %name, "Unregistered metastore mapping");
        Ok(())
    }

    fn bind(&self, entry: Arc<MetaStoreEntry>) -> Result<Mapping, RegistrationError> {
        let client =
            self.factory
                .create(entry.definition())
                .map_err(|source| RegistrationError::Client {
                    name: entry.name().to_string(),
                    source,
                })?;
        Mapping::new(entry, client, self.resolution)
    }

    fn publish(&self, mappings: Vec<Arc<Mapping>>) {
        self.snapshot
            .store(Arc::new(RoutingSnapshot::build(mappings)));
    }
}

impl std::fmt::Debug for MappingRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappingRegistry")
            .field("resolution", &self.resolution)
            .field("mappings", &self.snapshot.load().mappings().len())
            .finish()
    }
}
