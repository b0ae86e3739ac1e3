// Domain Layer - connector operations, workloads, job outputs

pub mod job;
pub mod output;
pub mod workload;

pub use job::{JobRunIdentity, LauncherConfig, OperationInput, OperationType};
pub use output::{
    CheckConnectionResult, ConnectorJobOutput, FailureReason, FailureType, OutputPayload,
    OutputResult, OutputType,
};
pub use workload::{Workload, WorkloadStatus};
