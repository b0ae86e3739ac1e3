// Job Output Store Port
// Result store keyed by workload id, written by the remote executor.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::ConnectorJobOutput;

/// Storage-layer errors. A missing entry is NOT an error; it is `Ok(None)`
/// from `read`, so callers can distinguish "we know it failed" from
/// "we cannot know".
#[derive(Error, Debug, Clone)]
pub enum OutputStoreError {
    #[error("output store unreachable: {0}")]
    Unavailable(String),

    #[error("stored output is malformed: {0}")]
    Malformed(String),
}

/// Output Store trait
///
/// Implementations:
/// - FsOutputStore: per-workload JSON documents on a shared filesystem
#[async_trait]
pub trait OutputStore: Send + Sync {
    async fn read(
        &self,
        workload_id: &str,
    ) -> Result<Option<ConnectorJobOutput>, OutputStoreError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct InMemoryOutputStore {
        entries: Mutex<HashMap<String, ConnectorJobOutput>>,
        error: Mutex<Option<OutputStoreError>>,
    }

    impl InMemoryOutputStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn insert(&self, workload_id: &str, output: ConnectorJobOutput) {
            self.entries
                .lock()
                .unwrap()
                .insert(workload_id.to_string(), output);
        }

        /// Make every subsequent `read` fail with this error.
        pub fn fail_with(&self, error: OutputStoreError) {
            *self.error.lock().unwrap() = Some(error);
        }
    }

    #[async_trait]
    impl OutputStore for InMemoryOutputStore {
        async fn read(
            &self,
            workload_id: &str,
        ) -> Result<Option<ConnectorJobOutput>, OutputStoreError> {
            if let Some(e) = self.error.lock().unwrap().clone() {
                return Err(e);
            }
            Ok(self.entries.lock().unwrap().get(workload_id).cloned())
        }
    }
}
