//! Live bindings of metastore definitions to backend clients.
//!
//! A [`Mapping`] owns everything needed to serve one metastore: its client,
//! its routing prefix, its name transforms, its access-control gate and its
//! visibility rules. Mappings are immutable once built (the whitelist aside);
//! an update to a definition produces a new mapping.
//!
//! # Name transforms
//!
//! Names seen by callers carry the mapping's prefix; names seen by the
//! backend do not. For a mapping with prefix `x_`:
//!
//! - inbound: `x_foo` → `foo` (then alias → backend name)
//! - outbound: `foo` → `x_foo` (plus `x_<alias>` for every alias)

mod access;
mod names;

pub use access::AccessControl;
pub use names::DatabaseNameMapping;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use regex::Regex;

use crate::client::{CatalogClient, TableMeta};
use crate::config::DatabaseResolution;
use crate::error::RegistrationError;
use crate::model::{MetaStore, MetaStoreEntry, MetaStoreStatus};

/// One registered metastore bound to its backend client.
pub struct Mapping {
    entry: Arc<MetaStoreEntry>,
    client: Arc<dyn CatalogClient>,
    prefix: String,
    names: DatabaseNameMapping,
    access: AccessControl,
    mapped_databases: Option<HashSet<String>>,
    mapped_tables: HashMap<String, Vec<Regex>>,
}

impl Mapping {
    /// Binds a registered entry to its client.
    ///
    /// Under manual resolution prefixes do not exist and every mapping's
    /// prefix is empty.
    pub fn new(
        entry: Arc<MetaStoreEntry>,
        client: Arc<dyn CatalogClient>,
        resolution: DatabaseResolution,
    ) -> Result<Self, RegistrationError> {
        let definition = entry.definition();
        let invalid = |e: regex::Error| RegistrationError::InvalidDefinition {
            name: definition.name.clone(),
            message: e.to_string(),
        };

        let prefix = match resolution {
            DatabaseResolution::Prefixed => definition.database_prefix(),
            DatabaseResolution::Manual => String::new(),
        };

        let access = AccessControl::new(
            &definition.name,
            definition.access_control_type,
            &definition.writable_database_white_list,
        )
        .map_err(invalid)?;

        let mapped_databases = definition
            .mapped_databases
            .as_ref()
            .map(|databases| databases.iter().map(|db| db.to_lowercase()).collect());

        let mut mapped_tables: HashMap<String, Vec<Regex>> = HashMap::new();
        for rule in &definition.mapped_tables {
            let regexes = rule
                .mapped_tables
                .iter()
                .map(|table| Regex::new(&format!("(?i)^(?:{})$", table)))
                .collect::<Result<Vec<_>, _>>()
                .map_err(invalid)?;
            mapped_tables
                .entry(rule.database.to_lowercase())
                .or_default()
                .extend(regexes);
        }

        let names = DatabaseNameMapping::new(&definition.database_name_mapping);

        Ok(Self {
            entry,
            client,
            prefix,
            names,
            access,
            mapped_databases,
            mapped_tables,
        })
    }

    /// Metastore name.
    pub fn name(&self) -> &str {
        self.entry.name()
    }

    /// Routing prefix; empty for the primary.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The registered definition.
    pub fn definition(&self) -> &MetaStore {
        self.entry.definition()
    }

    /// The shared entry holding the live status.
    pub fn entry(&self) -> &Arc<MetaStoreEntry> {
        &self.entry
    }

    /// Backend client.
    pub fn client(&self) -> &dyn CatalogClient {
        self.client.as_ref()
    }

    /// Access-control gate.
    pub fn access_control(&self) -> &AccessControl {
        &self.access
    }

    /// Returns true for the primary mapping.
    pub fn is_primary(&self) -> bool {
        self.definition().is_primary()
    }

    /// Last known status.
    pub fn status(&self) -> MetaStoreStatus {
        self.entry.status()
    }

    /// Returns false only when the last probe failed.
    pub fn is_available(&self) -> bool {
        self.status() != MetaStoreStatus::Unavailable
    }

    /// Expected extra latency of the backend.
    pub fn latency(&self) -> Duration {
        self.definition().latency()
    }

    /// Converts a caller-visible database name to the backend name.
    pub fn transform_inbound(&self, database: &str) -> String {
        let local = strip_prefix_ignore_case(database, &self.prefix).unwrap_or(database);
        self.names.inbound(local)
    }

    /// Converts a backend database name to its caller-visible name.
    pub fn transform_outbound(&self, database: &str) -> String {
        format!("{}{}", self.prefix, database)
    }

    /// Every caller-visible name of a backend database, aliases included.
    pub fn transform_outbound_multiple(&self, database: &str) -> Vec<String> {
        self.names
            .outbound(database)
            .into_iter()
            .map(|name| self.transform_outbound(&name))
            .collect()
    }

    /// Rewrites the database name of a table summary for callers.
    pub fn transform_outbound_table_meta(&self, mut meta: TableMeta) -> TableMeta {
        meta.db_name = self.transform_outbound(&meta.db_name);
        meta
    }

    /// Returns true if the backend database is visible through this mapping.
    pub fn is_database_mapped(&self, database: &str) -> bool {
        match &self.mapped_databases {
            Some(databases) => databases.contains(&database.to_lowercase()),
            None => true,
        }
    }

    /// Returns true if the backend table is visible through this mapping.
    pub fn is_table_mapped(&self, database: &str, table: &str) -> bool {
        match self.mapped_tables.get(&database.to_lowercase()) {
            Some(regexes) => regexes.iter().any(|regex| regex.is_match(table)),
            None => true,
        }
    }

    /// Returns true if this mapping is built from exactly this definition.
    pub(crate) fn is_built_from(&self, definition: &MetaStore) -> bool {
        self.definition() == definition
    }
}

impl fmt::Debug for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapping")
            .field("name", &self.name())
            .field("prefix", &self.prefix)
            .field("status", &self.status())
            .field("access_control", &self.access.kind())
            .finish()
    }
}

fn strip_prefix_ignore_case<'a>(name: &'a str, prefix: &str) -> Option<&'a str> {
    let head = name.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        name.get(prefix.len()..)
    } else {
        None
    }
}
