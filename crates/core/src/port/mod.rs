// Port Layer - Interfaces for external dependencies

pub mod activity_context;
pub mod flag_client;
pub mod metric_client;
pub mod output_store;
pub mod process_launcher;
pub mod time_provider;
pub mod workload_api;

// Re-exports
pub use activity_context::{ActivityCancelled, ActivityContext};
pub use flag_client::{Flag, FlagClient, FlagContext};
pub use metric_client::{MetricClient, NoopMetricClient};
pub use output_store::{OutputStore, OutputStoreError};
pub use process_launcher::{LaunchError, ProcessHandle, ProcessLauncher, ProcessOutput};
pub use time_provider::TimeProvider;
pub use workload_api::{WorkloadApi, WorkloadApiError, WorkloadCreateRequest};
