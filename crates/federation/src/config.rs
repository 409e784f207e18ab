//! Configuration for the federation core.
//!
//! Two documents configure a federation:
//!
//! - [`FederationSettings`]: runtime tunables, read from a YAML document or
//!   from `FEDERATION_*` environment variables.
//! - [`Federations`]: the metastore definitions, stored in the federation
//!   file and rewritten on shutdown when requested.
//!
//! # Example
//!
//! ```
//! use apiary_federation::config::Federations;
//!
//! let yaml = r#"
//! primary-meta-store:
//!   name: primary
//!   remote-meta-store-uris: thrift://primary:9083
//! federated-meta-stores:
//!   - name: waggle
//!     remote-meta-store-uris: thrift://waggle:9083
//! "#;
//!
//! let federations = Federations::from_yaml_str(yaml).unwrap();
//! assert_eq!(federations.metastores().len(), 2);
//! ```

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::{FederationType, MetaStore};

/// How database names are resolved to metastores.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum DatabaseResolution {
    /// Literal prefixes route names; the primary catches the rest.
    #[default]
    Prefixed,
    /// Each federated metastore lists the databases it owns.
    Manual,
}

/// Runtime settings of the federation core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Parser)]
#[command(name = "apiary-federation")]
#[serde(rename_all = "kebab-case", default)]
pub struct FederationSettings {
    /// Database resolution mode.
    #[arg(long, env = "FEDERATION_DATABASE_RESOLUTION", value_enum, default_value = "prefixed")]
    pub database_resolution: DatabaseResolution,

    /// Upper bound on one bulk status refresh.
    #[arg(long, env = "FEDERATION_STATUS_DEADLINE", default_value = "60s", value_parser = parse_duration)]
    #[serde(with = "humantime_serde")]
    pub status_deadline: Duration,

    /// Interval between background status refreshes.
    #[arg(long, env = "FEDERATION_POLLING_INTERVAL", default_value = "5m", value_parser = parse_duration)]
    #[serde(with = "humantime_serde")]
    pub status_polling_interval: Duration,

    /// Base timeout of one fan-out call; each metastore adds its latency.
    #[arg(long, env = "FEDERATION_REQUEST_TIMEOUT", default_value = "5s", value_parser = parse_duration)]
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Rewrite the federation file on shutdown.
    #[arg(long, env = "FEDERATION_OVERWRITE_CONFIG_ON_SHUTDOWN", default_value = "false")]
    pub overwrite_config_on_shutdown: bool,
}

impl Default for FederationSettings {
    fn default() -> Self {
        Self {
            database_resolution: DatabaseResolution::Prefixed,
            status_deadline: Duration::from_secs(60),
            status_polling_interval: Duration::from_secs(300),
            request_timeout: Duration::from_secs(5),
            overwrite_config_on_shutdown: false,
        }
    }
}

impl FederationSettings {
    /// Reads settings from `FEDERATION_*` environment variables, falling
    /// back to defaults.
    pub fn from_env() -> Self {
        Self::try_parse_from(["apiary-federation"]).unwrap_or_default()
    }

    /// Parses settings from YAML.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Validates the settings.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.status_deadline.is_zero() {
            errors.push("Status deadline cannot be 0".to_string());
        }

        if self.status_polling_interval.is_zero() {
            errors.push("Status polling interval cannot be 0".to_string());
        }

        if self.request_timeout.is_zero() {
            errors.push("Request timeout cannot be 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Creates settings suitable for testing: short timeouts everywhere.
    pub fn for_testing() -> Self {
        Self {
            status_deadline: Duration::from_secs(1),
            status_polling_interval: Duration::from_secs(1),
            request_timeout: Duration::from_millis(500),
            ..Self::default()
        }
    }
}

/// Parses a human-readable duration such as `"90s"` or `"5m"`.
pub fn parse_duration(value: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(value).map_err(|e| ConfigError::Duration {
        value: value.to_string(),
        message: e.to_string(),
    })
}

/// Contents of the federation file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Federations {
    /// The primary metastore.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_meta_store: Option<MetaStore>,

    /// Federated metastores.
    #[serde(default)]
    pub federated_meta_stores: Vec<MetaStore>,
}

impl Federations {
    /// Groups definitions by role.
    pub fn from_metastores(metastores: impl IntoIterator<Item = MetaStore>) -> Self {
        let mut federations = Self::default();
        for metastore in metastores {
            if metastore.is_primary() {
                federations.primary_meta_store = Some(metastore);
            } else {
                federations.federated_meta_stores.push(metastore);
            }
        }
        federations
    }

    /// Parses the federation file format.
    ///
    /// The role of each definition follows from the section it appears in.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let mut federations: Federations = serde_yaml::from_str(yaml)?;
        if let Some(primary) = federations.primary_meta_store.as_mut() {
            primary.federation_type = FederationType::Primary;
        }
        for federated in &mut federations.federated_meta_stores {
            federated.federation_type = FederationType::Federated;
        }
        Ok(federations)
    }

    /// Loads the federation file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let yaml = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Serializes to the federation file format.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Writes the federation file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let yaml = self.to_yaml()?;
        fs::write(path, yaml).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    /// All definitions, primary first.
    pub fn metastores(&self) -> Vec<MetaStore> {
        self.primary_meta_store
            .iter()
            .chain(self.federated_meta_stores.iter())
            .cloned()
            .collect()
    }

    /// Checks the whole federation, reporting every problem at once.
    pub fn validate(&self, resolution: DatabaseResolution) -> Result<(), ConfigError> {
        let metastores = self.metastores();
        let mut problems: Vec<String> = metastores.iter().flat_map(MetaStore::problems).collect();

        let mut names = HashSet::new();
        let mut prefixes: HashMap<String, &str> = HashMap::new();
        let mut databases: HashMap<String, &str> = HashMap::new();

        for metastore in &metastores {
            if !names.insert(metastore.name.as_str()) {
                problems.push(format!("duplicate metastore name '{}'", metastore.name));
            }

            match resolution {
                DatabaseResolution::Prefixed => {
                    let prefix = metastore.database_prefix();
                    if let Some(owner) = prefixes.insert(prefix.clone(), &metastore.name) {
                        problems.push(format!(
                            "prefix '{}' of metastore '{}' is already used by '{}'",
                            prefix, metastore.name, owner
                        ));
                    }
                }
                DatabaseResolution::Manual if !metastore.is_primary() => {
                    for database in metastore.mapped_databases.iter().flatten() {
                        let key = database.to_lowercase();
                        if let Some(owner) = databases.insert(key, &metastore.name) {
                            problems.push(format!(
                                "database '{}' of metastore '{}' is already mapped by '{}'",
                                database, metastore.name, owner
                            ));
                        }
                    }
                }
                DatabaseResolution::Manual => {}
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid { problems })
        }
    }
}

/// Serde module for Duration with humantime format.
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
