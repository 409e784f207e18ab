//! Parallel execution of one operation against many mappings.
//!
//! Every target runs in its own task with its own timeout. A failing or slow
//! metastore only loses its own contribution; the aggregate of the others is
//! always returned.

mod handler;
mod requests;

pub use handler::{PanopticHandler, PatternScope};
pub use requests::{
    GetAllDatabasesRequest, GetDatabasesByPatternRequest, GetTableMetaRequest, SetUgiRequest,
};

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{debug, instrument, warn};

use crate::error::{BackendError, ClientResult};
use crate::mapping::Mapping;

/// Decides whether a backend database (local name) is surfaced.
pub type DatabaseFilter = Arc<dyn Fn(&str, &Mapping) -> bool + Send + Sync>;

/// One unit of fan-out work bound to a single mapping.
pub trait FanOutRequest: Send + 'static {
    /// Item type contributed to the aggregate.
    type Output: Send + 'static;

    /// Mapping the request targets.
    fn mapping(&self) -> &Arc<Mapping>;

    /// Issues the remote call and post-processes its result.
    fn call(self) -> impl Future<Output = ClientResult<Vec<Self::Output>>> + Send;
}

/// Runs requests concurrently, one task per mapping.
#[derive(Debug, Clone)]
pub struct FanOutExecutor {
    request_timeout: Duration,
}

impl FanOutExecutor {
    /// Creates an executor with the given base timeout.
    pub fn new(request_timeout: Duration) -> Self {
        Self { request_timeout }
    }

    /// Base timeout of one call.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Executes all requests and returns the unordered union of successes.
    ///
    /// Each call is bounded by the base timeout plus its metastore's latency.
    /// Failures are logged and omitted.
    #[instrument(skip(self, requests), fields(targets = requests.len()))]
    pub async fn execute<R: FanOutRequest>(
        &self,
        operation: &'static str,
        requests: Vec<R>,
    ) -> Vec<R::Output> {
        let mut tasks: JoinSet<(String, Result<Vec<R::Output>, BackendError>)> = JoinSet::new();

        for request in requests {
            let mapping = Arc::clone(request.mapping());
            let timeout = self.request_timeout + mapping.latency();
            tasks.spawn(async move {
                let name = mapping.name().to_string();
                let result = match tokio::time::timeout(timeout, request.call()).await {
                    Ok(Ok(items)) => Ok(items),
                    Ok(Err(e)) => Err(BackendError::from_client(&name, e)),
                    Err(_) => Err(BackendError::Timeout {
                        metastore: name.clone(),
                        timeout_ms: timeout.as_millis() as u64,
                    }),
                };
                (name, result)
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, Ok(items))) => {
                    debug!(metastore = %name, count = items.len(), "Fan-out call completed");
                    results.extend(items);
                }
                Ok((name, Err(e))) => {
                    warn!(metastore = %name, operation, error = %e, "Fan-out call failed, omitting its results");
                }
                Err(e) => {
                    warn!(operation, error = %e, "Task join error during fan-out");
                }
            }
        }

        results
    }
}
