//! Compatibility checks between a candidate definition and the registered set.

use std::collections::HashSet;

use crate::config::DatabaseResolution;
use crate::error::RegistrationError;

use super::metastore::MetaStore;

/// Checks that `candidate` can join `others`.
///
/// `others` must not contain the definition being replaced. Checks the
/// definition itself, the single-primary rule and, depending on the
/// resolution mode, prefix or mapped-database uniqueness.
pub fn check_compatible<'a>(
    others: impl IntoIterator<Item = &'a MetaStore>,
    candidate: &MetaStore,
    resolution: DatabaseResolution,
) -> Result<(), RegistrationError> {
    let problems = candidate.problems();
    if !problems.is_empty() {
        return Err(RegistrationError::InvalidDefinition {
            name: candidate.name.clone(),
            message: problems.join("; "),
        });
    }

    let prefix = candidate.database_prefix();
    let databases: HashSet<String> = candidate
        .mapped_databases
        .iter()
        .flatten()
        .map(|db| db.to_lowercase())
        .collect();

    for other in others {
        if other.name == candidate.name {
            return Err(RegistrationError::DuplicateName {
                name: candidate.name.clone(),
            });
        }

        if candidate.is_primary() && other.is_primary() {
            return Err(RegistrationError::PrimaryAlreadyRegistered {
                existing: other.name.clone(),
            });
        }

        match resolution {
            DatabaseResolution::Prefixed => {
                if other.database_prefix() == prefix {
                    return Err(RegistrationError::DuplicatePrefix {
                        prefix,
                        owner: other.name.clone(),
                    });
                }
            }
            DatabaseResolution::Manual => {
                if candidate.is_primary() || other.is_primary() {
                    continue;
                }
                if let Some(database) = other
                    .mapped_databases
                    .iter()
                    .flatten()
                    .find(|db| databases.contains(&db.to_lowercase()))
                {
                    return Err(RegistrationError::DuplicateDatabase {
                        database: database.clone(),
                        owner: other.name.clone(),
                    });
                }
            }
        }
    }

    Ok(())
}
