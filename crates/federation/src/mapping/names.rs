//! Database name aliases.

use std::collections::{BTreeMap, HashMap};

/// Bidirectional alias table of one metastore.
///
/// Configured as backend name to alias. Outbound, a backend database is
/// surfaced under its own name and under its alias; inbound, an alias is
/// translated back to the backend name.
#[derive(Debug, Clone, Default)]
pub struct DatabaseNameMapping {
    outbound: HashMap<String, String>,
    inbound: HashMap<String, String>,
}

impl DatabaseNameMapping {
    /// Builds the table from configuration.
    pub fn new(mapping: &BTreeMap<String, String>) -> Self {
        let mut outbound = HashMap::with_capacity(mapping.len());
        let mut inbound = HashMap::with_capacity(mapping.len());
        for (original, alias) in mapping {
            outbound.insert(original.to_lowercase(), alias.clone());
            inbound.insert(alias.to_lowercase(), original.clone());
        }
        Self { outbound, inbound }
    }

    /// Names a backend database is known by, its own name first.
    pub fn outbound(&self, database: &str) -> Vec<String> {
        let mut names = vec![database.to_string()];
        if let Some(alias) = self.outbound.get(&database.to_lowercase()) {
            names.push(alias.clone());
        }
        names
    }

    /// Backend name for a caller-visible (unprefixed) name.
    pub fn inbound(&self, database: &str) -> String {
        self.inbound
            .get(&database.to_lowercase())
            .cloned()
            .unwrap_or_else(|| database.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping() -> DatabaseNameMapping {
        let mut config = BTreeMap::new();
        config.insert("logs".to_string(), "logs_v2".to_string());
        DatabaseNameMapping::new(&config)
    }

    #[test]
    fn test_outbound_is_one_to_many() {
        assert_eq!(mapping().outbound("logs"), vec!["logs", "logs_v2"]);
        assert_eq!(mapping().outbound("events"), vec!["events"]);
    }

    #[test]
    fn test_inbound_reverses_alias() {
        assert_eq!(mapping().inbound("logs_v2"), "logs");
        assert_eq!(mapping().inbound("LOGS_V2"), "logs");
        assert_eq!(mapping().inbound("logs"), "logs");
    }

    #[test]
    fn test_every_outbound_name_maps_back() {
        let mapping = mapping();
        for name in mapping.outbound("logs") {
            assert_eq!(mapping.inbound(&name), "logs");
        }
    }
}
