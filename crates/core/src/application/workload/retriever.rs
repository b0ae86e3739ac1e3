// Result Retriever
// Fetches the completed workload's output from the result store.

use std::sync::Arc;

use thiserror::Error;
use tracing::warn;

use crate::domain::{ConnectorJobOutput, FailureReason, FailureType, OperationType};
use crate::port::{OutputStore, OutputStoreError};

/// Retrieval errors. A missing entry is NOT an error; the retriever
/// synthesizes a well-formed failure output instead, so the caller can
/// distinguish "we know it failed" from "we cannot know".
#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("job output store unavailable: {0}")]
    Store(#[source] OutputStoreError),
}

pub struct OutputRetriever {
    store: Arc<dyn OutputStore>,
}

impl OutputRetriever {
    pub fn new(store: Arc<dyn OutputStore>) -> Self {
        Self { store }
    }

    /// Fetch the output for a terminal workload. Every terminal status
    /// routes through here; the stored output (or the synthesized fallback)
    /// is returned regardless of whether the workload succeeded.
    pub async fn fetch(
        &self,
        workload_id: &str,
        operation: OperationType,
    ) -> Result<ConnectorJobOutput, RetrievalError> {
        match self.store.read(workload_id).await {
            Ok(Some(output)) => Ok(output),
            Ok(None) => {
                warn!(
                    workload_id = %workload_id,
                    "No output found for terminal workload, synthesizing failure output"
                );
                Ok(Self::missing_output(workload_id, operation))
            }
            Err(e) => Err(RetrievalError::Store(e)),
        }
    }

    fn missing_output(workload_id: &str, operation: OperationType) -> ConnectorJobOutput {
        ConnectorJobOutput::failed(
            operation.output_type(),
            FailureReason::new(
                FailureType::ConfigError,
                format!("unable to read output for workload {workload_id}"),
                "Unable to read output",
            ),
        )
    }
}
