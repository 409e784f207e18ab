//! Per-metastore usage counters.

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::debug;

/// Name recorded when a request is served by every metastore.
pub const ALL_METASTORES: &str = "all";

/// Counts how many requests each metastore served.
#[derive(Debug, Default)]
pub struct UsageMonitor {
    counts: Mutex<HashMap<String, u64>>,
}

impl UsageMonitor {
    /// Creates an empty monitor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one request served by `metastore`.
    pub fn record(&self, metastore: &str) {
        let mut counts = self.counts.lock();
        let count = counts.entry(metastore.to_string()).or_insert(0);
        *count += 1;
        debug!(metastore = %metastore, count = *count, "Metastore served request");
    }

    /// Records one fan-out request.
    pub fn record_all(&self) {
        self.record(ALL_METASTORES);
    }

    /// Requests served by `metastore` so far.
    pub fn count(&self, metastore: &str) -> u64 {
        self.counts.lock().get(metastore).copied().unwrap_or(0)
    }

    /// Copy of every counter.
    pub fn snapshot(&self) -> HashMap<String, u64> {
        self.counts.lock().clone()
    }
}
