// Remote Path - workload submission, polling, and result retrieval

pub mod id;
pub mod poller;
pub mod retriever;
pub mod submitter;

pub use id::WorkloadIdGenerator;
pub use poller::{PollingError, WorkloadPoller};
pub use retriever::{OutputRetriever, RetrievalError};
pub use submitter::{SubmissionError, WorkloadSubmitter};

/// Label keys attached to every created workload.
pub mod labels {
    pub const JOB_ID: &str = "job_id";
    pub const ATTEMPT_ID: &str = "attempt_id";
}
