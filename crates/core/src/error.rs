// Central Error Type for the Engine

use thiserror::Error;

use crate::application::runner::ExecutionError;
use crate::application::workload::poller::PollingError;
use crate::application::workload::retriever::RetrievalError;
use crate::application::workload::submitter::SubmissionError;

/// Engine-level error type. Everything a dispatcher caller can observe as
/// a hard failure; a well-formed `ConnectorJobOutput` carrying a failure
/// reason is NOT an error.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("submission error: {0}")]
    Submission(#[from] SubmissionError),

    #[error("polling error: {0}")]
    Polling(#[from] PollingError),

    #[error("retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    /// True when the failure was caused by cooperative cancellation rather
    /// than the operation itself. Callers propagate these instead of
    /// retrying.
    pub fn is_interruption(&self) -> bool {
        matches!(
            self,
            EngineError::Execution(ExecutionError::Cancelled)
                | EngineError::Polling(PollingError::Interrupted)
        )
    }
}

/// Result type alias using EngineError
pub type Result<T> = std::result::Result<T, EngineError>;
