// Job Run Domain Model

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::output::OutputType;

/// Identity of one attempt of one job, supplied by the durable-execution
/// caller. Immutable; used to derive deterministic workload identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobRunIdentity {
    pub job_id: String,
    pub attempt_id: i64,
}

impl JobRunIdentity {
    pub fn new(job_id: impl Into<String>, attempt_id: i64) -> Self {
        Self {
            job_id: job_id.into(),
            attempt_id,
        }
    }
}

/// Connector operation kind. Maps 1:1 onto the remote executor's
/// workload type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationType {
    Spec,
    Check,
    Discover,
    Sync,
}

impl OperationType {
    /// Lowercase suffix used in workload identifiers and container args.
    pub fn id_suffix(&self) -> &'static str {
        match self {
            OperationType::Spec => "spec",
            OperationType::Check => "check",
            OperationType::Discover => "discover",
            OperationType::Sync => "sync",
        }
    }

    /// Output type produced by this operation.
    pub fn output_type(&self) -> OutputType {
        match self {
            OperationType::Spec => OutputType::Spec,
            OperationType::Check => OutputType::CheckConnection,
            OperationType::Discover => OutputType::DiscoverCatalogId,
            OperationType::Sync => OutputType::ReplicationSummary,
        }
    }
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationType::Spec => write!(f, "SPEC"),
            OperationType::Check => write!(f, "CHECK"),
            OperationType::Discover => write!(f, "DISCOVER"),
            OperationType::Sync => write!(f, "SYNC"),
        }
    }
}

/// How to launch the connector container. Immutable per invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LauncherConfig {
    pub docker_image: String,
    pub connection_id: Option<Uuid>,
    pub workspace_id: Option<Uuid>,
    pub protocol_version: Option<String>,
    pub is_custom_connector: bool,
    pub allowed_hosts: Option<Vec<String>>,
}

impl LauncherConfig {
    /// Minimal config for a given image; remaining fields default to unset.
    pub fn for_image(docker_image: impl Into<String>) -> Self {
        Self {
            docker_image: docker_image.into(),
            connection_id: None,
            workspace_id: None,
            protocol_version: None,
            is_custom_connector: false,
            allowed_hosts: None,
        }
    }
}

/// The full input to one connector-operation activity: which operation to
/// run, for which job attempt, how to launch it, and the operation-specific
/// connector configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationInput {
    pub operation: OperationType,
    pub identity: JobRunIdentity,
    pub launcher: LauncherConfig,
    pub config: serde_json::Value,
}

impl OperationInput {
    pub fn new(
        operation: OperationType,
        identity: JobRunIdentity,
        launcher: LauncherConfig,
        config: serde_json::Value,
    ) -> Self {
        Self {
            operation,
            identity,
            launcher,
            config,
        }
    }
}
