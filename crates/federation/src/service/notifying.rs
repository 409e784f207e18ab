//! Federation service persisting to storage and notifying listeners.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{info, warn};

use crate::config::DatabaseResolution;
use crate::error::{FederationResult, RegistrationError};
use crate::model::{MetaStore, MetaStoreEntry, MetaStoreView, check_compatible};
use crate::routing::MappingEventListener;

use super::FederationService;
use super::storage::MetaStoreStorage;

/// Validates changes against storage, stores them, then tells listeners.
///
/// If a listener rejects a change, the listeners already notified are told to
/// revert and storage is restored. Changes are serialized, so the check
/// against storage and the write that follows see the same state.
pub struct NotifyingFederationService {
    storage: Arc<dyn MetaStoreStorage>,
    listeners: Vec<Arc<dyn MappingEventListener>>,
    resolution: DatabaseResolution,
    write_lock: Mutex<()>,
}

impl NotifyingFederationService {
    /// Creates the service.
    pub fn new(storage: Arc<dyn MetaStoreStorage>, resolution: DatabaseResolution) -> Self {
        Self {
            storage,
            listeners: Vec::new(),
            resolution,
            write_lock: Mutex::new(()),
        }
    }

    /// Adds a listener.
    pub fn with_listener(mut self, listener: Arc<dyn MappingEventListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// The backing storage.
    pub fn storage(&self) -> &Arc<dyn MetaStoreStorage> {
        &self.storage
    }

    /// Tells every listener about the stored entries, e.g. at startup.
    pub fn replay(&self) -> FederationResult<()> {
        for entry in self.storage.all() {
            for listener in &self.listeners {
                listener.on_register(Arc::clone(&entry))?;
            }
        }
        Ok(())
    }

    fn others(&self, excluded: &str) -> Vec<MetaStore> {
        self.storage
            .all()
            .iter()
            .filter(|entry| entry.name() != excluded)
            .map(|entry| entry.definition().clone())
            .collect()
    }
}

#[async_trait]
impl FederationService for NotifyingFederationService {
    async fn register(&self, metastore: MetaStore) -> FederationResult<()> {
        let _guard = self.write_lock.lock();

        if let Some(existing) = self.storage.get(&metastore.name) {
            if existing.definition() == &metastore {
                info!(metastore = %metastore.name, "Metastore already registered with identical definition");
                return Ok(());
            }
            return Err(RegistrationError::DuplicateName {
                name: metastore.name,
            }
            .into());
        }

        check_compatible(&self.others(&metastore.name), &metastore, self.resolution)?;

        let entry = Arc::new(MetaStoreEntry::new(metastore));
        self.storage.insert(Arc::clone(&entry));

        for (notified, listener) in self.listeners.iter().enumerate() {
            if let Err(e) = listener.on_register(Arc::clone(&entry)) {
                warn!(metastore = %entry.name(), error = %e, "Listener rejected registration, rolling back");
                for listener in &self.listeners[..notified] {
                    if let Err(revert) = listener.on_unregister(entry.name()) {
                        warn!(metastore = %entry.name(), error = %revert, "Failed to revert registration");
                    }
                }
                self.storage.remove(entry.name());
                return Err(e);
            }
        }

        info!(metastore = %entry.name(), federation_type = %entry.definition().federation_type, "Registered metastore");
        Ok(())
    }

    async fn update(&self, old: &MetaStore, metastore: MetaStore) -> FederationResult<()> {
        let _guard = self.write_lock.lock();

        let current = self
            .storage
            .get(&old.name)
            .ok_or_else(|| RegistrationError::NotRegistered {
                name: old.name.clone(),
            })?;

        if current.definition().federation_type != metastore.federation_type {
            return Err(RegistrationError::FederationTypeChange {
                name: old.name.clone(),
            }
            .into());
        }

        if current.definition() == &metastore {
            return Ok(());
        }

        check_compatible(&self.others(&old.name), &metastore, self.resolution)?;

        let entry = Arc::new(MetaStoreEntry::new(metastore));
        self.storage.replace(&old.name, Arc::clone(&entry));

        for (notified, listener) in self.listeners.iter().enumerate() {
            if let Err(e) = listener.on_update(current.definition(), Arc::clone(&entry)) {
                warn!(metastore = %old.name, error = %e, "Listener rejected update, rolling back");
                for listener in &self.listeners[..notified] {
                    if let Err(revert) = listener.on_update(entry.definition(), Arc::clone(&current)) {
                        warn!(metastore = %old.name, error = %revert, "Failed to revert update");
                    }
                }
                self.storage.replace(entry.name(), Arc::clone(&current));
                return Err(e);
            }
        }

        info!(metastore = %entry.name(), previous = %old.name, "Updated metastore");
        Ok(())
    }

    async fn unregister(&self, name: &str) -> FederationResult<()> {
        let _guard = self.write_lock.lock();

        let current = self
            .storage
            .get(name)
            .ok_or_else(|| RegistrationError::NotRegistered {
                name: name.to_string(),
            })?;

        if current.definition().is_primary() {
            return Err(RegistrationError::PrimaryUnregister {
                name: name.to_string(),
            }
            .into());
        }

        for (notified, listener) in self.listeners.iter().enumerate() {
            if let Err(e) = listener.on_unregister(name) {
                warn!(metastore = %name, error = %e, "Listener rejected unregistration, rolling back");
                for listener in &self.listeners[..notified] {
                    if let Err(revert) = listener.on_register(Arc::clone(&current)) {
                        warn!(metastore = %name, error = %revert, "Failed to revert unregistration");
                    }
                }
                return Err(e);
            }
        }
        self.storage.remove(name);

        info!(metastore = %name, "Unregistered metastore");
        Ok(())
    }

    async fn get(&self, name: &str) -> FederationResult<MetaStoreView> {
        self.storage
            .get(name)
            .map(|entry| entry.view())
            .ok_or_else(|| {
                RegistrationError::NotRegistered {
                    name: name.to_string(),
                }
                .into()
            })
    }

    async fn get_all(&self) -> Vec<MetaStoreView> {
        self.storage.all().iter().map(|entry| entry.view()).collect()
    }
}
