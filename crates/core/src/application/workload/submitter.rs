// Workload Submitter
// Idempotently registers a unit of work with the remote executor.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::port::{WorkloadApi, WorkloadApiError, WorkloadCreateRequest};

/// Submission errors. There is no variant for a conflict: a workload that
/// already exists is a successful submission.
#[derive(Error, Debug)]
pub enum SubmissionError {
    #[error("workload submission failed: {0}")]
    Fatal(#[source] WorkloadApiError),
}

pub struct WorkloadSubmitter {
    api: Arc<dyn WorkloadApi>,
}

impl WorkloadSubmitter {
    pub fn new(api: Arc<dyn WorkloadApi>) -> Self {
        Self { api }
    }

    /// Register the workload. A conflict response means an earlier attempt
    /// of the same `(job_id, attempt_id, operation)` already created it; the
    /// durable-execution caller may retry this whole activity, and a retry
    /// must not create a duplicate or surface a spurious error.
    pub async fn submit(&self, request: WorkloadCreateRequest) -> Result<(), SubmissionError> {
        let workload_id = request.workload_id.clone();

        match self.api.create(request).await {
            Ok(()) => {
                info!(workload_id = %workload_id, "Workload created");
                Ok(())
            }
            Err(WorkloadApiError::Conflict) => {
                warn!(
                    workload_id = %workload_id,
                    "Workload already created and in progress, continuing"
                );
                Ok(())
            }
            Err(e) => Err(SubmissionError::Fatal(e)),
        }
    }
}
