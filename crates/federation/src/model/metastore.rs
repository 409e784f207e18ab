//! Metastore definitions.
//!
//! A [`MetaStore`] is the configured description of one backend catalog: where
//! it lives, how its databases are named in the federated view and what callers
//! may do with it. Definitions are plain data; the live binding to a client is a
//! [`Mapping`](crate::mapping::Mapping).

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Role of a metastore in the federation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FederationType {
    /// The catch-all fallback. Exactly one per federation.
    Primary,
    /// A prefixed (or manually mapped) secondary metastore.
    #[default]
    Federated,
}

impl FederationType {
    /// Returns true for the primary role.
    pub fn is_primary(&self) -> bool {
        matches!(self, FederationType::Primary)
    }
}

impl fmt::Display for FederationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FederationType::Primary => write!(f, "primary"),
            FederationType::Federated => write!(f, "federated"),
        }
    }
}

/// Access-control policy of a metastore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccessControlType {
    /// No writes of any kind.
    #[default]
    ReadOnly,
    /// Writes and database creation everywhere.
    ReadAndWriteAndCreate,
    /// Writes only to whitelisted databases, no creation.
    ReadAndWriteOnDatabaseWhitelist,
    /// Writes to whitelisted databases; created databases join the whitelist.
    ReadAndWriteAndCreateOnDatabaseWhitelist,
}

impl AccessControlType {
    /// Returns true if the policy consults the writable whitelist.
    pub fn uses_whitelist(&self) -> bool {
        matches!(
            self,
            AccessControlType::ReadAndWriteOnDatabaseWhitelist
                | AccessControlType::ReadAndWriteAndCreateOnDatabaseWhitelist
        )
    }

    /// Returns true if the policy may be used by a federated metastore.
    pub fn allowed_for_federated(&self) -> bool {
        matches!(
            self,
            AccessControlType::ReadOnly | AccessControlType::ReadAndWriteOnDatabaseWhitelist
        )
    }
}

impl fmt::Display for AccessControlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AccessControlType::ReadOnly => "read-only",
            AccessControlType::ReadAndWriteAndCreate => "read-and-write-and-create",
            AccessControlType::ReadAndWriteOnDatabaseWhitelist => {
                "read-and-write-on-database-whitelist"
            }
            AccessControlType::ReadAndWriteAndCreateOnDatabaseWhitelist => {
                "read-and-write-and-create-on-database-whitelist"
            }
        };
        write!(f, "{}", name)
    }
}

/// Table visibility rules for one database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MappedTables {
    /// Backend-local database name.
    pub database: String,
    /// Regular expressions; a table is visible if any of them fully matches.
    pub mapped_tables: Vec<String>,
}

impl MappedTables {
    /// Creates table rules for a database.
    pub fn new(database: impl Into<String>, tables: Vec<&str>) -> Self {
        Self {
            database: database.into(),
            mapped_tables: tables.into_iter().map(str::to_string).collect(),
        }
    }
}

/// Configured definition of one backend metastore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MetaStore {
    /// Unique name.
    pub name: String,

    /// Role in the federation.
    #[serde(default)]
    pub federation_type: FederationType,

    /// Comma-separated backend URIs.
    pub remote_meta_store_uris: String,

    /// Explicit routing prefix; see [`MetaStore::database_prefix`] for defaults.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_prefix: Option<String>,

    /// Access-control policy.
    #[serde(default)]
    pub access_control_type: AccessControlType,

    /// Databases (regular expressions) writable under a whitelist policy.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub writable_database_white_list: Vec<String>,

    /// Visible databases. `None` means all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapped_databases: Option<Vec<String>>,

    /// Per-database table visibility.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mapped_tables: Vec<MappedTables>,

    /// Backend database name to alias.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub database_name_mapping: BTreeMap<String, String>,

    /// Expected extra network latency in milliseconds.
    #[serde(default)]
    pub latency: u64,
}

impl MetaStore {
    /// Creates a primary metastore definition.
    pub fn primary(name: impl Into<String>, uris: impl Into<String>) -> Self {
        Self::new(name, uris, FederationType::Primary)
    }

    /// Creates a federated metastore definition.
    pub fn federated(name: impl Into<String>, uris: impl Into<String>) -> Self {
        Self::new(name, uris, FederationType::Federated)
    }

    fn new(name: impl Into<String>, uris: impl Into<String>, federation_type: FederationType) -> Self {
        Self {
            name: name.into(),
            federation_type,
            remote_meta_store_uris: uris.into(),
            database_prefix: None,
            access_control_type: AccessControlType::default(),
            writable_database_white_list: Vec::new(),
            mapped_databases: None,
            mapped_tables: Vec::new(),
            database_name_mapping: BTreeMap::new(),
            latency: 0,
        }
    }

    /// Sets an explicit prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.database_prefix = Some(prefix.into());
        self
    }

    /// Sets the access-control policy and its whitelist.
    pub fn with_access_control(mut self, kind: AccessControlType, whitelist: Vec<&str>) -> Self {
        self.access_control_type = kind;
        self.writable_database_white_list = whitelist.into_iter().map(str::to_string).collect();
        self
    }

    /// Restricts the visible databases.
    pub fn with_mapped_databases(mut self, databases: Vec<&str>) -> Self {
        self.mapped_databases = Some(databases.into_iter().map(str::to_string).collect());
        self
    }

    /// Adds table visibility rules.
    pub fn with_mapped_tables(mut self, tables: Vec<MappedTables>) -> Self {
        self.mapped_tables = tables;
        self
    }

    /// Adds a database alias.
    pub fn with_alias(mut self, database: impl Into<String>, alias: impl Into<String>) -> Self {
        self.database_name_mapping
            .insert(database.into(), alias.into());
        self
    }

    /// Sets the expected latency.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency.as_millis() as u64;
        self
    }

    /// Returns true if this is the primary metastore.
    pub fn is_primary(&self) -> bool {
        self.federation_type.is_primary()
    }

    /// Effective routing prefix.
    ///
    /// The primary always has the empty prefix. A federated metastore uses
    /// its explicit prefix, or `"<name>_"` without one.
    pub fn database_prefix(&self) -> String {
        match (&self.database_prefix, self.federation_type) {
            (_, FederationType::Primary) => String::new(),
            (Some(prefix), FederationType::Federated) => prefix.clone(),
            (None, FederationType::Federated) => format!("{}_", self.name),
        }
    }

    /// Expected latency as a duration.
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency)
    }

    /// Backend URIs split on commas.
    pub fn uris(&self) -> Vec<&str> {
        self.remote_meta_store_uris
            .split(',')
            .map(str::trim)
            .filter(|uri| !uri.is_empty())
            .collect()
    }

    /// Returns every problem with this definition in isolation.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.name.trim().is_empty() {
            problems.push("metastore name cannot be empty".to_string());
        }

        if self.uris().is_empty() {
            problems.push(format!("metastore '{}' has no remote URIs", self.name));
        }

        if self.is_primary()
            && let Some(prefix) = self.database_prefix.as_deref()
            && !prefix.is_empty()
        {
            problems.push(format!(
                "primary metastore '{}' cannot have database prefix '{}'",
                self.name, prefix
            ));
        }

        if !self.is_primary() && !self.access_control_type.allowed_for_federated() {
            problems.push(format!(
                "federated metastore '{}' cannot use access control '{}'",
                self.name, self.access_control_type
            ));
        }

        if !self.writable_database_white_list.is_empty()
            && !self.access_control_type.uses_whitelist()
        {
            problems.push(format!(
                "metastore '{}' has a writable whitelist but access control '{}' ignores it",
                self.name, self.access_control_type
            ));
        }

        problems
    }
}
