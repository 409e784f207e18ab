//! Best-effort health status of the registered metastores.
//!
//! Two refresh paths with different guarantees:
//!
//! - [`StatusPoller::refresh_one`] probes one metastore and waits for the
//!   answer.
//! - [`StatusPoller::refresh_all`] probes every metastore in parallel but
//!   returns once the deadline passes, whatever has been recorded by then.
//!   Probes still running are left to finish in the background.
//!
//! Probes write the status of their own entry only, so no two tasks ever
//! write the same slot.
//!
//! # Example
//!
//! ```ignore
//! let poller = Arc::new(StatusPoller::new(probe, Duration::from_secs(60)));
//!
//! // Background refresh every five minutes
//! let handle = poller.start(Duration::from_secs(300), storage.clone());
//!
//! // ...
//! poller.stop().await;
//! ```

mod probe;

pub use probe::{ClientStatusProbe, StatusProbe};

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use crate::error::BackendError;
use crate::model::{MetaStoreEntry, MetaStoreStatus};
use crate::service::MetaStoreStorage;

/// Outcome of a bulk refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshReport {
    /// Probes launched.
    pub total: usize,
    /// Probes that reported before the deadline.
    pub completed: usize,
}

impl RefreshReport {
    /// Returns true if every probe reported in time.
    pub fn is_complete(&self) -> bool {
        self.completed == self.total
    }

    /// Probes still outstanding when the refresh returned.
    pub fn pending(&self) -> usize {
        self.total - self.completed
    }
}

/// Refreshes metastore statuses on demand and periodically.
pub struct StatusPoller {
    probe: Arc<dyn StatusProbe>,
    deadline: Duration,
    shutdown_tx: Mutex<Option<mpsc::Sender<()>>>,
}

impl StatusPoller {
    /// Creates a poller whose bulk refresh waits at most `deadline`.
    pub fn new(probe: Arc<dyn StatusProbe>, deadline: Duration) -> Self {
        Self {
            probe,
            deadline,
            shutdown_tx: Mutex::new(None),
        }
    }

    /// Bulk refresh deadline.
    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Probes one metastore and records the result before returning.
    pub async fn refresh_one(&self, entry: &MetaStoreEntry) -> MetaStoreStatus {
        let status = self.probe.probe(entry.definition()).await;
        record(entry, status);
        status
    }

    /// Probes every entry in parallel, returning by the deadline.
    ///
    /// Entries whose probe has not reported keep their previous status.
    #[instrument(skip_all, fields(targets = entries.len()))]
    pub async fn refresh_all(&self, entries: &[Arc<MetaStoreEntry>]) -> RefreshReport {
        refresh_entries(&self.probe, self.deadline, entries).await
    }

    /// Starts refreshing every entry of `storage` each `interval`.
    pub fn start(
        &self,
        interval: Duration,
        storage: Arc<dyn MetaStoreStorage>,
    ) -> tokio::task::JoinHandle<()> {
        let (tx, rx) = mpsc::channel(1);
        *self.shutdown_tx.lock() = Some(tx);

        let probe = Arc::clone(&self.probe);
        let deadline = self.deadline;

        tokio::spawn(async move {
            poll_loop(rx, interval, probe, deadline, storage).await;
        })
    }

    /// Stops the background refresh.
    pub async fn stop(&self) {
        let tx = self.shutdown_tx.lock().take();
        if let Some(tx) = tx {
            let _ = tx.send(()).await;
        }
    }
}

impl std::fmt::Debug for StatusPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusPoller")
            .field("deadline", &self.deadline)
            .field("running", &self.shutdown_tx.lock().is_some())
            .finish()
    }
}

async fn refresh_entries(
    probe: &Arc<dyn StatusProbe>,
    deadline: Duration,
    entries: &[Arc<MetaStoreEntry>],
) -> RefreshReport {
    let mut tasks = JoinSet::new();
    for entry in entries {
        let entry = Arc::clone(entry);
        let probe = Arc::clone(probe);
        tasks.spawn(async move {
            let status = probe.probe(entry.definition()).await;
            record(&entry, status);
        });
    }

    let total = entries.len();
    let mut completed = 0;
    let collect = async {
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(()) => completed += 1,
                Err(e) => {
                    let err = BackendError::ProbeInterrupted {
                        message: e.to_string(),
                    };
                    warn!(error = %err, "Status probe did not report");
                }
            }
        }
    };

    if tokio::time::timeout(deadline, collect).await.is_err() {
        warn!(
            deadline_ms = deadline.as_millis() as u64,
            completed,
            total,
            "Status refresh deadline elapsed, returning partial results"
        );
    }

    // Outstanding probes keep running; their late results are not awaited.
    tasks.detach_all();

    RefreshReport { total, completed }
}

async fn poll_loop(
    mut shutdown_rx: mpsc::Receiver<()>,
    interval: Duration,
    probe: Arc<dyn StatusProbe>,
    deadline: Duration,
    storage: Arc<dyn MetaStoreStorage>,
) {
    let mut interval = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                debug!("Status poller shutting down");
                break;
            }
            _ = interval.tick() => {
                let entries = storage.all();
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        debug!("Status poller shutting down during refresh");
                        break;
                    }
                    report = refresh_entries(&probe, deadline, &entries) => {
                        debug!(completed = report.completed, total = report.total, "Status refresh finished");
                    }
                }
            }
        }
    }
}

fn record(entry: &MetaStoreEntry, status: MetaStoreStatus) {
    let previous = entry.set_status(status);
    if previous != status {
        info!(metastore = %entry.name(), from = %previous, to = %status, "Metastore status changed");
    }
}
