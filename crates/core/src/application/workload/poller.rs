// Workload Poller
// Fixed-interval status polling until a terminal snapshot is observed.
// Deliberately no backoff: callers depend on bounded poll latency, and the
// interval is externally configurable.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::application::cancellation::CancelToken;
use crate::domain::Workload;
use crate::port::{WorkloadApi, WorkloadApiError};

/// Polling errors
#[derive(Error, Debug)]
pub enum PollingError {
    #[error("workload status fetch failed: {0}")]
    Api(#[source] WorkloadApiError),

    #[error("polling interrupted before a terminal status was observed")]
    Interrupted,
}

pub struct WorkloadPoller {
    api: Arc<dyn WorkloadApi>,
}

impl WorkloadPoller {
    pub fn new(api: Arc<dyn WorkloadApi>) -> Self {
        Self { api }
    }

    /// Poll until the workload reaches SUCCESS, FAILURE, or CANCELLED and
    /// return that terminal snapshot.
    ///
    /// The inter-poll sleep races the cancel token, so interruption aborts
    /// the loop promptly instead of waiting out the interval. Fetch failures
    /// surface immediately; retry policy belongs to the caller's duration
    /// budget.
    pub async fn await_terminal(
        &self,
        workload_id: &str,
        poll_interval: Duration,
        mut cancel: CancelToken,
    ) -> Result<Workload, PollingError> {
        loop {
            if cancel.is_cancelled() {
                return Err(PollingError::Interrupted);
            }

            let workload = self
                .api
                .get(workload_id)
                .await
                .map_err(PollingError::Api)?;

            if workload.is_terminal() {
                info!(
                    workload_id = %workload_id,
                    status = %workload.status,
                    "Workload reached terminal status"
                );
                return Ok(workload);
            }

            debug!(
                workload_id = %workload_id,
                status = %workload.status,
                "Workload still in progress"
            );

            tokio::select! {
                _ = sleep(poll_interval) => {}
                _ = cancel.cancelled() => return Err(PollingError::Interrupted),
            }
        }
    }
}
