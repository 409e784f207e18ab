//! Metastore health status.
//!
//! Status is best-effort: it is written by probes and read by routing without
//! any coordination, so a reader may see a value one refresh old.

use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicU8, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::metastore::MetaStore;

/// Tri-state health of a metastore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetaStoreStatus {
    /// Never probed.
    #[default]
    Unknown,
    /// Last probe succeeded.
    Available,
    /// Last probe failed.
    Unavailable,
}

impl MetaStoreStatus {
    fn as_u8(self) -> u8 {
        match self {
            MetaStoreStatus::Unknown => 0,
            MetaStoreStatus::Available => 1,
            MetaStoreStatus::Unavailable => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => MetaStoreStatus::Available,
            2 => MetaStoreStatus::Unavailable,
            _ => MetaStoreStatus::Unknown,
        }
    }
}

impl fmt::Display for MetaStoreStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaStoreStatus::Unknown => write!(f, "UNKNOWN"),
            MetaStoreStatus::Available => write!(f, "AVAILABLE"),
            MetaStoreStatus::Unavailable => write!(f, "UNAVAILABLE"),
        }
    }
}

/// Lock-free status slot with the time of the last write.
#[derive(Debug, Default)]
pub struct StatusCell {
    status: AtomicU8,
    checked_at_ms: AtomicI64,
}

impl StatusCell {
    /// Reads the current status.
    pub fn get(&self) -> MetaStoreStatus {
        MetaStoreStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    /// Stores a status and returns the previous one.
    pub fn set(&self, status: MetaStoreStatus) -> MetaStoreStatus {
        self.checked_at_ms
            .store(Utc::now().timestamp_millis(), Ordering::Release);
        MetaStoreStatus::from_u8(self.status.swap(status.as_u8(), Ordering::AcqRel))
    }

    /// When the status was last written, if ever.
    pub fn checked_at(&self) -> Option<DateTime<Utc>> {
        match self.checked_at_ms.load(Ordering::Acquire) {
            0 => None,
            ms => DateTime::from_timestamp_millis(ms),
        }
    }
}

/// A registered definition together with its live status.
///
/// Entries are shared (`Arc`) between the registry, the routing table and the
/// status poller; an update replaces the entry rather than mutating it, so a
/// new definition always starts [`MetaStoreStatus::Unknown`].
#[derive(Debug)]
pub struct MetaStoreEntry {
    definition: MetaStore,
    status: StatusCell,
}

impl MetaStoreEntry {
    /// Wraps a definition with an unknown status.
    pub fn new(definition: MetaStore) -> Self {
        Self {
            definition,
            status: StatusCell::default(),
        }
    }

    /// The configured definition.
    pub fn definition(&self) -> &MetaStore {
        &self.definition
    }

    /// The metastore name.
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// Current status.
    pub fn status(&self) -> MetaStoreStatus {
        self.status.get()
    }

    /// Records a probe result, returning the previous status.
    pub fn set_status(&self, status: MetaStoreStatus) -> MetaStoreStatus {
        self.status.set(status)
    }

    /// Freezes the entry into a serializable view.
    pub fn view(&self) -> MetaStoreView {
        MetaStoreView {
            definition: self.definition.clone(),
            status: self.status.get(),
            checked_at: self.status.checked_at(),
        }
    }
}

/// Snapshot of a definition and its status at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct MetaStoreView {
    /// The definition.
    #[serde(flatten)]
    pub definition: MetaStore,
    /// Status when the view was taken.
    pub status: MetaStoreStatus,
    /// When that status was recorded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checked_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_cell_starts_unknown() {
        let cell = StatusCell::default();
        assert_eq!(cell.get(), MetaStoreStatus::Unknown);
        assert!(cell.checked_at().is_none());
    }

    #[test]
    fn test_status_cell_swap() {
        let cell = StatusCell::default();
        assert_eq!(cell.set(MetaStoreStatus::Available), MetaStoreStatus::Unknown);
        assert_eq!(
            cell.set(MetaStoreStatus::Unavailable),
            MetaStoreStatus::Available
        );
        assert_eq!(cell.get(), MetaStoreStatus::Unavailable);
        assert!(cell.checked_at().is_some());
    }

    #[test]
    fn test_view_freezes_status() {
        let entry = MetaStoreEntry::new(MetaStore::primary("main", "thrift://a:9083"));
        entry.set_status(MetaStoreStatus::Available);
        let view = entry.view();
        entry.set_status(MetaStoreStatus::Unavailable);

        assert_eq!(view.status, MetaStoreStatus::Available);
        assert_eq!(entry.status(), MetaStoreStatus::Unavailable);
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&MetaStoreStatus::Unavailable).unwrap();
        assert_eq!(json, "\"UNAVAILABLE\"");
    }
}
