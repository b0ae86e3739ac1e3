// Activity Dispatcher
// Top-level entry point: routes one connector-operation activity through
// the direct path (supervised subprocess) or the remote path (workload
// submission + polling + result retrieval).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};
use uuid::Uuid;

use crate::application::cancellation::{cancel_channel, CancelSlot};
use crate::application::heartbeat::with_background_heartbeat;
use crate::application::runner::ProcessRunner;
use crate::application::workload::{
    labels, OutputRetriever, WorkloadIdGenerator, WorkloadPoller, WorkloadSubmitter,
};
use crate::domain::{ConnectorJobOutput, OperationInput, OperationType};
use crate::error::{EngineError, Result};
use crate::port::flag_client::{USE_REMOTE_EXECUTION, WORKLOAD_POLL_FREQUENCY_SECONDS};
use crate::port::{
    ActivityContext, FlagClient, FlagContext, MetricClient, OutputStore, ProcessLauncher,
    TimeProvider, WorkloadApi, WorkloadCreateRequest,
};

/// Counted once per activity invocation.
pub const ACTIVITY_EXECUTION_METRIC: &str = "activity.execution";
/// Counted by `report_success`/`report_failure`.
pub const OPERATION_OUTCOME_METRIC: &str = "operation.outcome";

/// Engine-level tunables. Poll frequency is flag-sourced at runtime; these
/// are the fallbacks and fixed intervals.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How often the direct-path probe heartbeats to the caller.
    pub heartbeat_interval: Duration,
    /// Poll interval used when the flag oracle returns a non-positive value.
    pub default_poll_interval: Duration,
    /// Base path for workload log locations.
    pub workspace_root: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(30),
            default_poll_interval: Duration::from_secs(5),
            workspace_root: "/workspace".to_string(),
        }
    }
}

/// Executes connector-operation activities on behalf of a durable-execution
/// caller. All collaborators are constructor-supplied; the dispatcher holds
/// no process-wide state.
pub struct ConnectorActivity {
    launcher: Arc<dyn ProcessLauncher>,
    workload_api: Arc<dyn WorkloadApi>,
    output_store: Arc<dyn OutputStore>,
    flags: Arc<dyn FlagClient>,
    metrics: Arc<dyn MetricClient>,
    time_provider: Arc<dyn TimeProvider>,
    id_generator: WorkloadIdGenerator,
    config: EngineConfig,
}

impl ConnectorActivity {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        launcher: Arc<dyn ProcessLauncher>,
        workload_api: Arc<dyn WorkloadApi>,
        output_store: Arc<dyn OutputStore>,
        flags: Arc<dyn FlagClient>,
        metrics: Arc<dyn MetricClient>,
        time_provider: Arc<dyn TimeProvider>,
        config: EngineConfig,
    ) -> Self {
        Self {
            launcher,
            workload_api,
            output_store,
            flags,
            metrics,
            time_provider,
            id_generator: WorkloadIdGenerator::new(),
            config,
        }
    }

    /// Read-only routing query, no side effects.
    pub fn should_use_remote_path(&self, workspace_id: Option<Uuid>) -> bool {
        self.flags.bool_variation(
            &USE_REMOTE_EXECUTION,
            &FlagContext::for_workspace(workspace_id),
        )
    }

    /// Execute one activity. Safe to call more than once for the same
    /// `(job_id, attempt_id)`: the remote path collapses retried
    /// submissions onto one workload via its deterministic id, and the
    /// direct path spawns a fresh subprocess per call.
    pub async fn run(
        &self,
        input: OperationInput,
        context: Arc<dyn ActivityContext>,
    ) -> Result<ConnectorJobOutput> {
        self.metrics.count(
            ACTIVITY_EXECUTION_METRIC,
            1,
            &[("operation", input.operation.to_string())],
        );

        let use_remote = self.should_use_remote_path(input.launcher.workspace_id);
        self.execute(input, context, use_remote).await
    }

    /// Execute with a pre-evaluated routing decision. Callers that own
    /// their routing can bypass the flag oracle.
    pub async fn execute(
        &self,
        input: OperationInput,
        context: Arc<dyn ActivityContext>,
        use_remote: bool,
    ) -> Result<ConnectorJobOutput> {
        info!(
            operation = %input.operation,
            job_id = %input.identity.job_id,
            attempt_id = %input.identity.attempt_id,
            remote = %use_remote,
            "Dispatching connector operation"
        );

        if use_remote {
            self.execute_remote(input, context).await
        } else {
            self.execute_direct(input, context).await
        }
    }

    /// Record a successful operation outcome.
    pub fn report_success(&self, operation: OperationType) {
        self.metrics.count(
            OPERATION_OUTCOME_METRIC,
            1,
            &[
                ("operation", operation.to_string()),
                ("status", "success".to_string()),
            ],
        );
    }

    /// Record a failed operation outcome.
    pub fn report_failure(&self, operation: OperationType) {
        self.metrics.count(
            OPERATION_OUTCOME_METRIC,
            1,
            &[
                ("operation", operation.to_string()),
                ("status", "failed".to_string()),
            ],
        );
    }

    /// Direct path: one supervised subprocess under a background heartbeat.
    /// The unit of work registers the runner's cancel action in the slot
    /// before the subprocess starts, so a cancellation observed by the
    /// probe always has something to stop.
    async fn execute_direct(
        &self,
        input: OperationInput,
        context: Arc<dyn ActivityContext>,
    ) -> Result<ConnectorJobOutput> {
        let runner = Arc::new(ProcessRunner::new(
            Arc::clone(&self.launcher),
            Arc::clone(&self.time_provider),
        ));
        let slot = CancelSlot::new();

        let work = {
            let runner = Arc::clone(&runner);
            let slot = slot.clone();
            async move {
                let cancel_target = Arc::clone(&runner);
                slot.register(move || cancel_target.cancel());

                let output = runner.run(&input.launcher, &input).await?;
                Ok::<_, EngineError>(output)
            }
        };

        with_background_heartbeat(slot, context, self.config.heartbeat_interval, work).await
    }

    /// Remote path: submit -> poll -> fetch. The same heartbeat supervisor
    /// covers it, but the registered cancel action aborts the poll loop via
    /// its token; no server-side liveness probe is needed because the
    /// remote executor tracks the workload itself.
    async fn execute_remote(
        &self,
        input: OperationInput,
        context: Arc<dyn ActivityContext>,
    ) -> Result<ConnectorJobOutput> {
        let workload_id = self.id_generator.generate(&input.identity, input.operation);
        let request = self.create_request(&workload_id, &input)?;

        let submitter = WorkloadSubmitter::new(Arc::clone(&self.workload_api));
        let poller = WorkloadPoller::new(Arc::clone(&self.workload_api));
        let retriever = OutputRetriever::new(Arc::clone(&self.output_store));
        let poll_interval = self.poll_interval();
        let operation = input.operation;

        let (cancel_handle, cancel_token) = cancel_channel();
        let slot = CancelSlot::new();
        slot.register(move || cancel_handle.cancel());

        let work = async move {
            submitter.submit(request).await?;

            let workload = poller
                .await_terminal(&workload_id, poll_interval, cancel_token)
                .await?;

            debug!(
                workload_id = %workload.id,
                status = %workload.status,
                "Fetching output for terminal workload"
            );
            let output = retriever.fetch(&workload.id, operation).await?;
            Ok::<_, EngineError>(output)
        };

        with_background_heartbeat(slot, context, self.config.heartbeat_interval, work).await
    }

    fn create_request(
        &self,
        workload_id: &str,
        input: &OperationInput,
    ) -> Result<WorkloadCreateRequest> {
        let serialized_input = serde_json::to_string(input)?;

        let mut label_map = HashMap::new();
        label_map.insert(labels::JOB_ID.to_string(), input.identity.job_id.clone());
        label_map.insert(
            labels::ATTEMPT_ID.to_string(),
            input.identity.attempt_id.to_string(),
        );

        Ok(WorkloadCreateRequest {
            workload_id: workload_id.to_string(),
            labels: label_map,
            serialized_input,
            log_path: format!(
                "{}/{}/logs",
                self.config.workspace_root.trim_end_matches('/'),
                workload_id
            ),
            workload_type: input.operation,
        })
    }

    fn poll_interval(&self) -> Duration {
        let seconds = self
            .flags
            .int_variation(&WORKLOAD_POLL_FREQUENCY_SECONDS, &FlagContext::Anonymous);
        if seconds >= 1 {
            Duration::from_secs(seconds as u64)
        } else {
            self.config.default_poll_interval
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::application::runner::ExecutionError;
    use crate::application::workload::poller::PollingError;
    use crate::domain::{
        FailureType, JobRunIdentity, LauncherConfig, OutputPayload, OutputType, WorkloadStatus,
    };
    use crate::port::activity_context::mocks::MockActivityContext;
    use crate::port::flag_client::mocks::StaticFlagClient;
    use crate::port::metric_client::mocks::RecordingMetricClient;
    use crate::port::output_store::mocks::InMemoryOutputStore;
    use crate::port::process_launcher::mocks::{MockBehavior, MockProcessLauncher};
    use crate::port::time_provider::SystemTimeProvider;
    use crate::port::workload_api::mocks::InMemoryWorkloadApi;

    struct Harness {
        launcher: Arc<MockProcessLauncher>,
        api: Arc<InMemoryWorkloadApi>,
        store: Arc<InMemoryOutputStore>,
        metrics: Arc<RecordingMetricClient>,
        activity: ConnectorActivity,
    }

    fn harness(behavior: MockBehavior, flags: StaticFlagClient) -> Harness {
        let launcher = Arc::new(MockProcessLauncher::new(behavior));
        let api = Arc::new(InMemoryWorkloadApi::new());
        let store = Arc::new(InMemoryOutputStore::new());
        let metrics = Arc::new(RecordingMetricClient::new());

        let config = EngineConfig {
            heartbeat_interval: Duration::from_millis(20),
            default_poll_interval: Duration::from_millis(10),
            workspace_root: "/workspace".to_string(),
        };

        let activity = ConnectorActivity::new(
            Arc::clone(&launcher) as Arc<dyn ProcessLauncher>,
            Arc::clone(&api) as Arc<dyn WorkloadApi>,
            Arc::clone(&store) as Arc<dyn OutputStore>,
            Arc::new(flags),
            Arc::clone(&metrics) as Arc<dyn MetricClient>,
            Arc::new(SystemTimeProvider),
            config,
        );

        Harness {
            launcher,
            api,
            store,
            metrics,
            activity,
        }
    }

    fn spec_input() -> OperationInput {
        OperationInput::new(
            OperationType::Spec,
            JobRunIdentity::new("1234", 0),
            LauncherConfig::for_image("connectors/source-x:0.1.0"),
            serde_json::json!({}),
        )
    }

    fn spec_output() -> ConnectorJobOutput {
        ConnectorJobOutput::succeeded(
            OutputType::Spec,
            OutputPayload::Spec(serde_json::json!({"connectionSpecification": {}})),
        )
    }

    #[tokio::test]
    async fn direct_path_returns_subprocess_output() {
        let h = harness(MockBehavior::Output(spec_output()), StaticFlagClient::new());
        let ctx = Arc::new(MockActivityContext::healthy());

        let output = h.activity.run(spec_input(), ctx).await.unwrap();

        assert_eq!(output, spec_output());
        assert_eq!(h.launcher.launch_count(), 1);
        assert_eq!(h.api.create_count(), 0, "direct path never touches the executor");
        assert_eq!(h.metrics.total_for(ACTIVITY_EXECUTION_METRIC), 1);
    }

    #[tokio::test]
    async fn direct_path_cancellation_propagates_as_interruption() {
        let h = harness(MockBehavior::Hang, StaticFlagClient::new());
        let ctx = Arc::new(MockActivityContext::cancel_after(1));

        let err = h.activity.run(spec_input(), ctx).await.unwrap_err();

        assert!(matches!(
            err,
            EngineError::Execution(ExecutionError::Cancelled)
        ));
        assert!(err.is_interruption());

        let state = h.launcher.last_state().unwrap();
        assert!(state.cancelled.load(std::sync::atomic::Ordering::SeqCst));
        assert!(!state.completed.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn remote_path_submits_polls_and_fetches() {
        let flags = StaticFlagClient::new().with_bool(&USE_REMOTE_EXECUTION, true);
        let h = harness(MockBehavior::Hang, flags);

        h.api.script_statuses(
            "1234_0_spec",
            [
                WorkloadStatus::Pending,
                WorkloadStatus::Running,
                WorkloadStatus::Success,
            ],
        );
        h.store.insert("1234_0_spec", spec_output());

        let ctx = Arc::new(MockActivityContext::healthy());
        let output = h.activity.run(spec_input(), ctx).await.unwrap();

        assert_eq!(output, spec_output());
        assert_eq!(h.api.create_count(), 1);
        assert_eq!(h.launcher.launch_count(), 0, "remote path spawns no subprocess");

        let stored = h.api.stored("1234_0_spec").unwrap();
        assert_eq!(stored.labels.get(labels::JOB_ID).map(String::as_str), Some("1234"));
        assert_eq!(stored.labels.get(labels::ATTEMPT_ID).map(String::as_str), Some("0"));
        assert_eq!(stored.log_path, "/workspace/1234_0_spec/logs");
    }

    #[tokio::test]
    async fn remote_path_fetches_even_for_failed_workloads() {
        let flags = StaticFlagClient::new().with_bool(&USE_REMOTE_EXECUTION, true);
        let h = harness(MockBehavior::Hang, flags);

        h.api.script_statuses("1234_0_spec", [WorkloadStatus::Failure]);
        let failed = ConnectorJobOutput::failed(
            OutputType::Spec,
            crate::domain::FailureReason::new(
                FailureType::SystemError,
                "container OOM",
                "Something went wrong",
            ),
        );
        h.store.insert("1234_0_spec", failed.clone());

        let ctx = Arc::new(MockActivityContext::healthy());
        let output = h.activity.run(spec_input(), ctx).await.unwrap();

        assert_eq!(output, failed, "failed workloads still route through retrieval");
    }

    #[tokio::test]
    async fn remote_path_synthesizes_output_when_result_is_missing() {
        let flags = StaticFlagClient::new().with_bool(&USE_REMOTE_EXECUTION, true);
        let h = harness(MockBehavior::Hang, flags);

        h.api.script_statuses("1234_0_spec", [WorkloadStatus::Success]);
        // No store entry for the workload.

        let ctx = Arc::new(MockActivityContext::healthy());
        let output = h.activity.run(spec_input(), ctx).await.unwrap();

        let reason = output.failure_reason().unwrap();
        assert_eq!(reason.failure_type, FailureType::ConfigError);
        assert!(reason.internal_message.contains("1234_0_spec"));
    }

    #[tokio::test]
    async fn retried_activity_absorbs_the_conflict() {
        let flags = StaticFlagClient::new().with_bool(&USE_REMOTE_EXECUTION, true);
        let h = harness(MockBehavior::Hang, flags);

        h.api.script_statuses(
            "1234_0_spec",
            [WorkloadStatus::Success, WorkloadStatus::Success],
        );
        h.store.insert("1234_0_spec", spec_output());

        let ctx = Arc::new(MockActivityContext::healthy());
        let first = h
            .activity
            .run(spec_input(), Arc::clone(&ctx) as Arc<dyn ActivityContext>)
            .await
            .unwrap();
        // At-least-once caller retries the whole activity.
        let second = h.activity.run(spec_input(), ctx).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(h.api.create_count(), 2, "second create conflicts and is absorbed");
    }

    #[tokio::test]
    async fn fatal_submission_surfaces_as_hard_error() {
        let flags = StaticFlagClient::new().with_bool(&USE_REMOTE_EXECUTION, true);
        let h = harness(MockBehavior::Hang, flags);
        h.api.fail_creates_with(crate::port::WorkloadApiError::Server {
            code: 5000,
            message: "executor unavailable".to_string(),
        });

        let ctx = Arc::new(MockActivityContext::healthy());
        let err = h.activity.run(spec_input(), ctx).await.unwrap_err();

        assert!(matches!(err, EngineError::Submission(_)));
    }

    #[tokio::test]
    async fn unreachable_store_surfaces_as_hard_error() {
        let flags = StaticFlagClient::new().with_bool(&USE_REMOTE_EXECUTION, true);
        let h = harness(MockBehavior::Hang, flags);

        h.api.script_statuses("1234_0_spec", [WorkloadStatus::Success]);
        h.store.fail_with(crate::port::OutputStoreError::Unavailable(
            "bucket down".to_string(),
        ));

        let ctx = Arc::new(MockActivityContext::healthy());
        let err = h.activity.run(spec_input(), ctx).await.unwrap_err();

        assert!(matches!(err, EngineError::Retrieval(_)));
    }

    #[tokio::test]
    async fn remote_path_poll_honors_caller_cancellation() {
        let flags = StaticFlagClient::new()
            .with_bool(&USE_REMOTE_EXECUTION, true)
            .with_int(&WORKLOAD_POLL_FREQUENCY_SECONDS, 3600);
        let h = harness(MockBehavior::Hang, flags);
        // Workload never leaves PENDING.

        let ctx = Arc::new(MockActivityContext::cancel_after(1));
        let started = std::time::Instant::now();
        let err = h.activity.run(spec_input(), ctx).await.unwrap_err();

        assert!(matches!(err, EngineError::Polling(PollingError::Interrupted)));
        assert!(err.is_interruption());
        assert!(
            started.elapsed() < Duration::from_secs(5),
            "cancellation must not wait out the poll interval"
        );
    }

    #[tokio::test]
    async fn routing_follows_the_flag_oracle() {
        let on = harness(
            MockBehavior::Hang,
            StaticFlagClient::new().with_bool(&USE_REMOTE_EXECUTION, true),
        );
        let off = harness(MockBehavior::Hang, StaticFlagClient::new());

        assert!(on.activity.should_use_remote_path(None));
        assert!(!off.activity.should_use_remote_path(Some(Uuid::new_v4())));
    }

    #[tokio::test]
    async fn outcome_reporting_counts_by_status() {
        let h = harness(MockBehavior::Hang, StaticFlagClient::new());

        h.activity.report_success(OperationType::Check);
        h.activity.report_failure(OperationType::Check);
        h.activity.report_failure(OperationType::Spec);

        assert_eq!(h.metrics.total_for(OPERATION_OUTCOME_METRIC), 3);
        let recorded = h.metrics.recorded();
        assert!(recorded
            .iter()
            .any(|c| c.attributes.contains(&("status".to_string(), "success".to_string()))));
    }
}
