//! Write and create permissions of one metastore.

use parking_lot::RwLock;
use regex::Regex;
use tracing::info;

use crate::model::AccessControlType;

/// Access-control gate of a mapping.
///
/// Whitelist entries are regular expressions matched against the whole
/// backend-local database name, ignoring case.
#[derive(Debug)]
pub struct AccessControl {
    kind: AccessControlType,
    metastore: String,
    whitelist: RwLock<Vec<Regex>>,
}

impl AccessControl {
    /// Builds the gate, compiling the whitelist.
    pub fn new(
        metastore: impl Into<String>,
        kind: AccessControlType,
        whitelist: &[String],
    ) -> Result<Self, regex::Error> {
        let whitelist = whitelist
            .iter()
            .map(|entry| whitelist_regex(entry))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            kind,
            metastore: metastore.into(),
            whitelist: RwLock::new(whitelist),
        })
    }

    /// The configured policy.
    pub fn kind(&self) -> AccessControlType {
        self.kind
    }

    /// Returns true if writes to `database` are allowed.
    pub fn has_write_permission(&self, database: &str) -> bool {
        match self.kind {
            AccessControlType::ReadOnly => false,
            AccessControlType::ReadAndWriteAndCreate => true,
            AccessControlType::ReadAndWriteOnDatabaseWhitelist
            | AccessControlType::ReadAndWriteAndCreateOnDatabaseWhitelist => {
                self.is_whitelisted(database)
            }
        }
    }

    /// Returns true if databases may be created.
    pub fn has_create_permission(&self) -> bool {
        matches!(
            self.kind,
            AccessControlType::ReadAndWriteAndCreate
                | AccessControlType::ReadAndWriteAndCreateOnDatabaseWhitelist
        )
    }

    /// Records a successful database creation.
    ///
    /// Under the whitelist-and-create policy the new database becomes
    /// writable. Other policies ignore the event.
    pub fn database_created(&self, database: &str) {
        if self.kind != AccessControlType::ReadAndWriteAndCreateOnDatabaseWhitelist
            || self.is_whitelisted(database)
        {
            return;
        }

        if let Ok(regex) = whitelist_regex(&regex::escape(database)) {
            self.whitelist.write().push(regex);
            info!(metastore = %self.metastore, database = %database, "Database added to writable whitelist");
        }
    }

    fn is_whitelisted(&self, database: &str) -> bool {
        self.whitelist
            .read()
            .iter()
            .any(|regex| regex.is_match(database))
    }
}

fn whitelist_regex(entry: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("(?i)^(?:{})$", entry))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate(kind: AccessControlType, whitelist: &[&str]) -> AccessControl {
        let whitelist: Vec<String> = whitelist.iter().map(|s| s.to_string()).collect();
        AccessControl::new("m", kind, &whitelist).unwrap()
    }

    #[test]
    fn test_read_only() {
        let gate = gate(AccessControlType::ReadOnly, &[]);
        assert!(!gate.has_write_permission("db"));
        assert!(!gate.has_create_permission());
    }

    #[test]
    fn test_read_write_create() {
        let gate = gate(AccessControlType::ReadAndWriteAndCreate, &[]);
        assert!(gate.has_write_permission("anything"));
        assert!(gate.has_create_permission());
    }

    #[test]
    fn test_whitelist_is_case_insensitive_regex() {
        let gate = gate(
            AccessControlType::ReadAndWriteOnDatabaseWhitelist,
            &["logs", "tmp_.*"],
        );
        assert!(gate.has_write_permission("LOGS"));
        assert!(gate.has_write_permission("tmp_2024"));
        assert!(!gate.has_write_permission("logs_archive"));
        assert!(!gate.has_create_permission());
    }

    #[test]
    fn test_database_created_extends_whitelist() {
        let gate = gate(
            AccessControlType::ReadAndWriteAndCreateOnDatabaseWhitelist,
            &[],
        );
        assert!(!gate.has_write_permission("new.db"));
        gate.database_created("new.db");
        assert!(gate.has_write_permission("new.db"));
        assert!(!gate.has_write_permission("newxdb"));
    }

    #[test]
    fn test_database_created_ignored_without_create_whitelist() {
        let gate = gate(AccessControlType::ReadAndWriteOnDatabaseWhitelist, &[]);
        gate.database_created("new_db");
        assert!(!gate.has_write_permission("new_db"));
    }

    #[test]
    fn test_invalid_whitelist_entry() {
        let whitelist = vec!["(".to_string()];
        assert!(
            AccessControl::new("m", AccessControlType::ReadAndWriteOnDatabaseWhitelist, &whitelist)
                .is_err()
        );
    }
}
