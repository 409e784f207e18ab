//! Storage of registered metastore entries.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::config::Federations;
use crate::error::ConfigError;
use crate::model::{MetaStore, MetaStoreEntry};

/// Where registered definitions live.
///
/// Entries are shared with the routing layer so status written through one
/// is visible through the other.
pub trait MetaStoreStorage: Send + Sync {
    /// Every entry, primary first.
    fn all(&self) -> Vec<Arc<MetaStoreEntry>>;

    /// Entry registered under `name`.
    fn get(&self, name: &str) -> Option<Arc<MetaStoreEntry>>;

    /// Adds an entry.
    fn insert(&self, entry: Arc<MetaStoreEntry>);

    /// Replaces the entry registered under `name`, keeping its position.
    ///
    /// Returns the replaced entry.
    fn replace(&self, name: &str, entry: Arc<MetaStoreEntry>) -> Option<Arc<MetaStoreEntry>>;

    /// Removes the entry registered under `name`.
    fn remove(&self, name: &str) -> Option<Arc<MetaStoreEntry>>;

    /// Persists the definitions, if the storage is persistent.
    fn save(&self) -> Result<(), ConfigError>;
}

/// Volatile storage.
#[derive(Debug, Default)]
pub struct InMemoryMetaStoreStorage {
    entries: RwLock<Vec<Arc<MetaStoreEntry>>>,
}

impl InMemoryMetaStoreStorage {
    /// Creates storage holding `metastores`.
    pub fn new(metastores: impl IntoIterator<Item = MetaStore>) -> Self {
        let mut entries: Vec<Arc<MetaStoreEntry>> = metastores
            .into_iter()
            .map(|metastore| Arc::new(MetaStoreEntry::new(metastore)))
            .collect();
        entries.sort_by_key(|entry| !entry.definition().is_primary());
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Definitions currently stored.
    pub fn definitions(&self) -> Vec<MetaStore> {
        self.entries
            .read()
            .iter()
            .map(|entry| entry.definition().clone())
            .collect()
    }
}

impl MetaStoreStorage for InMemoryMetaStoreStorage {
    fn all(&self) -> Vec<Arc<MetaStoreEntry>> {
        self.entries.read().clone()
    }

    fn get(&self, name: &str) -> Option<Arc<MetaStoreEntry>> {
        self.entries
            .read()
            .iter()
            .find(|entry| entry.name() == name)
            .cloned()
    }

    fn insert(&self, entry: Arc<MetaStoreEntry>) {
        let mut entries = self.entries.write();
        if entry.definition().is_primary() {
            entries.insert(0, entry);
        } else {
            entries.push(entry);
        }
    }

    fn replace(&self, name: &str, entry: Arc<MetaStoreEntry>) -> Option<Arc<MetaStoreEntry>> {
        let mut entries = self.entries.write();
        let slot = entries.iter_mut().find(|existing| existing.name() == name)?;
        Some(std::mem::replace(slot, entry))
    }

    fn remove(&self, name: &str) -> Option<Arc<MetaStoreEntry>> {
        let mut entries = self.entries.write();
        let position = entries.iter().position(|entry| entry.name() == name)?;
        Some(entries.remove(position))
    }

    fn save(&self) -> Result<(), ConfigError> {
        Ok(())
    }
}

/// Storage backed by the YAML federation file.
#[derive(Debug)]
pub struct YamlMetaStoreStorage {
    path: PathBuf,
    overwrite_on_save: bool,
    inner: InMemoryMetaStoreStorage,
}

impl YamlMetaStoreStorage {
    /// Loads the federation file at `path`.
    ///
    /// [`MetaStoreStorage::save`] only writes the file back when
    /// `overwrite_on_save` is set.
    pub fn load(path: impl AsRef<Path>, overwrite_on_save: bool) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_path_buf();
        let federations = Federations::load(&path)?;
        info!(
            path = %path.display(),
            metastores = federations.metastores().len(),
            "Loaded federation file"
        );
        Ok(Self {
            inner: InMemoryMetaStoreStorage::new(federations.metastores()),
            path,
            overwrite_on_save,
        })
    }

    /// Path of the federation file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MetaStoreStorage for YamlMetaStoreStorage {
    fn all(&self) -> Vec<Arc<MetaStoreEntry>> {
        self.inner.all()
    }

    fn get(&self, name: &str) -> Option<Arc<MetaStoreEntry>> {
        self.inner.get(name)
    }

    fn insert(&self, entry: Arc<MetaStoreEntry>) {
        self.inner.insert(entry)
    }

    fn replace(&self, name: &str, entry: Arc<MetaStoreEntry>) -> Option<Arc<MetaStoreEntry>> {
        self.inner.replace(name, entry)
    }

    fn remove(&self, name: &str) -> Option<Arc<MetaStoreEntry>> {
        self.inner.remove(name)
    }

    fn save(&self) -> Result<(), ConfigError> {
        if !self.overwrite_on_save {
            debug!(path = %self.path.display(), "Federation file overwrite disabled, not saving");
            return Ok(());
        }

        Federations::from_metastores(self.inner.definitions()).save(&self.path)?;
        info!(path = %self.path.display(), "Saved federation file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> InMemoryMetaStoreStorage {
        InMemoryMetaStoreStorage::new(vec![
            MetaStore::federated("waggle", "thrift://w:9083"),
            MetaStore::primary("primary", "thrift://p:9083"),
        ])
    }

    #[test]
    fn test_primary_first() {
        let names: Vec<String> = storage()
            .all()
            .iter()
            .map(|e| e.name().to_string())
            .collect();
        assert_eq!(names, vec!["primary", "waggle"]);
    }

    #[test]
    fn test_replace_keeps_position() {
        let storage = storage();
        let replaced = storage.replace(
            "primary",
            Arc::new(MetaStoreEntry::new(MetaStore::primary("main", "thrift://m:9083"))),
        );
        assert_eq!(replaced.unwrap().name(), "primary");
        assert_eq!(storage.all()[0].name(), "main");
        assert!(storage.get("primary").is_none());
    }

    #[test]
    fn test_remove() {
        let storage = storage();
        assert!(storage.remove("waggle").is_some());
        assert!(storage.remove("waggle").is_none());
        assert_eq!(storage.all().len(), 1);
    }

    #[test]
    fn test_yaml_storage_respects_overwrite_flag() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("federations.yml");
        Federations::from_metastores(vec![MetaStore::primary("primary", "thrift://p:9083")])
            .save(&path)
            .unwrap();

        let storage = YamlMetaStoreStorage::load(&path, false).unwrap();
        storage.insert(Arc::new(MetaStoreEntry::new(MetaStore::federated(
            "waggle",
            "thrift://w:9083",
        ))));
        storage.save().unwrap();
        assert_eq!(Federations::load(&path).unwrap().metastores().len(), 1);

        let storage = YamlMetaStoreStorage::load(&path, true).unwrap();
        storage.insert(Arc::new(MetaStoreEntry::new(MetaStore::federated(
            "waggle",
            "thrift://w:9083",
        ))));
        storage.save().unwrap();
        let saved = Federations::load(&path).unwrap();
        assert_eq!(saved.federated_meta_stores.len(), 1);
        assert_eq!(saved.federated_meta_stores[0].name, "waggle");
    }
}
