// Workload API Port
// Abstraction over the remote executor that owns workload lifecycles.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{OperationType, Workload};

/// Request to register a unit of work with the remote executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadCreateRequest {
    pub workload_id: String,
    pub labels: HashMap<String, String>,
    pub serialized_input: String,
    pub log_path: String,
    pub workload_type: OperationType,
}

/// Workload API errors
#[derive(Error, Debug, Clone)]
pub enum WorkloadApiError {
    /// The workload already exists. Submission treats this as success.
    #[error("workload already exists")]
    Conflict,

    #[error("workload not found: {0}")]
    NotFound(String),

    #[error("workload api transport error: {0}")]
    Transport(String),

    #[error("workload api server error ({code}): {message}")]
    Server { code: i32, message: String },
}

/// Workload API trait
///
/// Implementations:
/// - HttpWorkloadClient: JSON-RPC client against the remote executor
#[async_trait]
pub trait WorkloadApi: Send + Sync {
    /// Register a workload. Returns `WorkloadApiError::Conflict` when a
    /// workload with the same id already exists.
    async fn create(&self, request: WorkloadCreateRequest) -> Result<(), WorkloadApiError>;

    /// Fetch the current snapshot of a workload.
    async fn get(&self, workload_id: &str) -> Result<Workload, WorkloadApiError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use crate::domain::WorkloadStatus;

    /// In-memory remote executor. `create` stores a PENDING workload and
    /// returns `Conflict` for duplicate ids; `get` pops the next scripted
    /// status (if any) before returning the snapshot.
    #[derive(Default)]
    pub struct InMemoryWorkloadApi {
        workloads: Mutex<HashMap<String, Workload>>,
        scripts: Mutex<HashMap<String, VecDeque<WorkloadStatus>>>,
        create_error: Mutex<Option<WorkloadApiError>>,
        get_error: Mutex<Option<WorkloadApiError>>,
        create_calls: AtomicUsize,
        get_calls: AtomicUsize,
    }

    impl InMemoryWorkloadApi {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue statuses that successive `get` calls walk through.
        pub fn script_statuses(
            &self,
            workload_id: &str,
            statuses: impl IntoIterator<Item = WorkloadStatus>,
        ) {
            self.scripts
                .lock()
                .unwrap()
                .insert(workload_id.to_string(), statuses.into_iter().collect());
        }

        /// Make every subsequent `create` fail with this error.
        pub fn fail_creates_with(&self, error: WorkloadApiError) {
            *self.create_error.lock().unwrap() = Some(error);
        }

        /// Make every subsequent `get` fail with this error.
        pub fn fail_gets_with(&self, error: WorkloadApiError) {
            *self.get_error.lock().unwrap() = Some(error);
        }

        pub fn set_status(&self, workload_id: &str, status: WorkloadStatus) {
            if let Some(w) = self.workloads.lock().unwrap().get_mut(workload_id) {
                w.status = status;
            }
        }

        pub fn create_count(&self) -> usize {
            self.create_calls.load(Ordering::SeqCst)
        }

        pub fn get_count(&self) -> usize {
            self.get_calls.load(Ordering::SeqCst)
        }

        pub fn stored(&self, workload_id: &str) -> Option<Workload> {
            self.workloads.lock().unwrap().get(workload_id).cloned()
        }
    }

    #[async_trait]
    impl WorkloadApi for InMemoryWorkloadApi {
        async fn create(&self, request: WorkloadCreateRequest) -> Result<(), WorkloadApiError> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);

            if let Some(e) = self.create_error.lock().unwrap().clone() {
                return Err(e);
            }

            let mut workloads = self.workloads.lock().unwrap();
            if workloads.contains_key(&request.workload_id) {
                return Err(WorkloadApiError::Conflict);
            }
            workloads.insert(
                request.workload_id.clone(),
                Workload {
                    id: request.workload_id,
                    labels: request.labels,
                    status: WorkloadStatus::Pending,
                    log_path: request.log_path,
                    workload_type: request.workload_type,
                },
            );
            Ok(())
        }

        async fn get(&self, workload_id: &str) -> Result<Workload, WorkloadApiError> {
            self.get_calls.fetch_add(1, Ordering::SeqCst);

            if let Some(e) = self.get_error.lock().unwrap().clone() {
                return Err(e);
            }

            let next = self
                .scripts
                .lock()
                .unwrap()
                .get_mut(workload_id)
                .and_then(|script| script.pop_front());

            let mut workloads = self.workloads.lock().unwrap();
            let workload = workloads
                .get_mut(workload_id)
                .ok_or_else(|| WorkloadApiError::NotFound(workload_id.to_string()))?;
            if let Some(status) = next {
                workload.status = status;
            }
            Ok(workload.clone())
        }
    }
}
