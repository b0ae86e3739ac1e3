// Deterministic Workload Identifiers
// Retried submissions from an at-least-once caller must collapse onto the
// same workload, so the id is a pure function of the attempt identity.

use crate::domain::{JobRunIdentity, OperationType};

#[derive(Debug, Clone, Copy, Default)]
pub struct WorkloadIdGenerator;

impl WorkloadIdGenerator {
    pub fn new() -> Self {
        Self
    }

    /// `{job_id}_{attempt_id}_{operation}`, e.g. `1234_0_check`.
    pub fn generate(&self, identity: &JobRunIdentity, operation: OperationType) -> String {
        format!(
            "{}_{}_{}",
            identity.job_id,
            identity.attempt_id,
            operation.id_suffix()
        )
    }
}
