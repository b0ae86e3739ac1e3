// Workload Domain Model
// Workloads are owned by the remote executor; this engine only creates
// and observes them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::job::OperationType;

/// Remote workload status. Monotonic: once a terminal status is reached it
/// never changes; PENDING and RUNNING are the only non-terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkloadStatus {
    Pending,
    Running,
    Success,
    Failure,
    Cancelled,
}

impl WorkloadStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkloadStatus::Success | WorkloadStatus::Failure | WorkloadStatus::Cancelled
        )
    }
}

impl std::fmt::Display for WorkloadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkloadStatus::Pending => write!(f, "PENDING"),
            WorkloadStatus::Running => write!(f, "RUNNING"),
            WorkloadStatus::Success => write!(f, "SUCCESS"),
            WorkloadStatus::Failure => write!(f, "FAILURE"),
            WorkloadStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// A durable, remotely tracked unit of work. Label insertion order is
/// irrelevant, hence the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workload {
    pub id: String,
    pub labels: HashMap<String, String>,
    pub status: WorkloadStatus,
    pub log_path: String,
    pub workload_type: OperationType,
}

impl Workload {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
