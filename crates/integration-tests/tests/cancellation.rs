// Caller-driven cancellation across both execution paths. The heartbeat
// probe is the only cancellation signal source; these tests verify it stops
// a live subprocess, aborts a long poll promptly, and never fires against
// work that already finished.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use covalent_core::application::runner::ExecutionError;
use covalent_core::application::workload::poller::PollingError;
use covalent_core::application::{ConnectorActivity, EngineConfig};
use covalent_core::domain::{
    ConnectorJobOutput, JobRunIdentity, LauncherConfig, OperationInput, OperationType,
    OutputPayload, OutputType,
};
use covalent_core::error::EngineError;
use covalent_core::port::activity_context::mocks::MockActivityContext;
use covalent_core::port::flag_client::mocks::StaticFlagClient;
use covalent_core::port::flag_client::{USE_REMOTE_EXECUTION, WORKLOAD_POLL_FREQUENCY_SECONDS};
use covalent_core::port::metric_client::NoopMetricClient;
use covalent_core::port::output_store::mocks::InMemoryOutputStore;
use covalent_core::port::process_launcher::mocks::{MockBehavior, MockProcessLauncher};
use covalent_core::port::time_provider::SystemTimeProvider;
use covalent_core::port::workload_api::mocks::InMemoryWorkloadApi;
use covalent_core::port::{
    ActivityContext, FlagClient, MetricClient, OutputStore, ProcessLauncher, WorkloadApi,
};

fn activity(
    launcher: &Arc<MockProcessLauncher>,
    api: &Arc<InMemoryWorkloadApi>,
    flags: StaticFlagClient,
) -> ConnectorActivity {
    ConnectorActivity::new(
        Arc::clone(launcher) as Arc<dyn ProcessLauncher>,
        Arc::clone(api) as Arc<dyn WorkloadApi>,
        Arc::new(InMemoryOutputStore::new()) as Arc<dyn OutputStore>,
        Arc::new(flags) as Arc<dyn FlagClient>,
        Arc::new(NoopMetricClient) as Arc<dyn MetricClient>,
        Arc::new(SystemTimeProvider),
        EngineConfig {
            heartbeat_interval: Duration::from_millis(20),
            default_poll_interval: Duration::from_millis(10),
            workspace_root: "/workspace".to_string(),
        },
    )
}

fn input() -> OperationInput {
    OperationInput::new(
        OperationType::Spec,
        JobRunIdentity::new("1234", 0),
        LauncherConfig::for_image("connectors/source-x:0.1.0"),
        serde_json::json!({}),
    )
}

#[tokio::test]
async fn cancellation_terminates_a_live_subprocess() {
    let launcher = Arc::new(MockProcessLauncher::new(MockBehavior::Hang));
    let api = Arc::new(InMemoryWorkloadApi::new());
    let activity = activity(&launcher, &api, StaticFlagClient::new());

    let ctx = Arc::new(MockActivityContext::cancel_after(1));
    let started = Instant::now();
    let err = activity.run(input(), ctx).await.unwrap_err();

    assert!(matches!(
        err,
        EngineError::Execution(ExecutionError::Cancelled)
    ));
    assert!(err.is_interruption());
    assert!(
        started.elapsed() < Duration::from_secs(5),
        "cancellation must not wait for the hanging process"
    );

    let state = launcher.last_state().unwrap();
    assert!(state.cancelled.load(Ordering::SeqCst));
    assert!(!state.completed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn cancellation_aborts_a_long_poll_promptly() {
    let launcher = Arc::new(MockProcessLauncher::new(MockBehavior::Hang));
    let api = Arc::new(InMemoryWorkloadApi::new());
    let flags = StaticFlagClient::new()
        .with_bool(&USE_REMOTE_EXECUTION, true)
        .with_int(&WORKLOAD_POLL_FREQUENCY_SECONDS, 3600);
    let activity = activity(&launcher, &api, flags);

    // Workload is created PENDING and never progresses.
    let ctx = Arc::new(MockActivityContext::cancel_after(1));
    let started = Instant::now();
    let err = activity.run(input(), ctx).await.unwrap_err();

    assert!(matches!(
        err,
        EngineError::Polling(PollingError::Interrupted)
    ));
    assert!(
        started.elapsed() < Duration::from_secs(5),
        "interruption must not wait out the poll interval"
    );
    assert_eq!(api.create_count(), 1, "the workload was submitted before the abort");
}

#[tokio::test]
async fn completed_work_is_never_cancelled() {
    let output = ConnectorJobOutput::succeeded(
        OutputType::Spec,
        OutputPayload::Spec(serde_json::json!({"connectionSpecification": {}})),
    );
    let launcher = Arc::new(MockProcessLauncher::new(MockBehavior::OutputAfter(
        output.clone(),
        Duration::from_millis(30),
    )));
    let api = Arc::new(InMemoryWorkloadApi::new());
    let activity = activity(&launcher, &api, StaticFlagClient::new());

    let ctx = Arc::new(MockActivityContext::healthy());
    let result = activity
        .run(input(), Arc::clone(&ctx) as Arc<dyn ActivityContext>)
        .await
        .unwrap();

    assert_eq!(result, output);

    // The probe is torn down with the work; the finished process is untouched.
    tokio::time::sleep(Duration::from_millis(60)).await;
    let state = launcher.last_state().unwrap();
    assert!(state.completed.load(Ordering::SeqCst));
    assert!(!state.cancelled.load(Ordering::SeqCst));
}

#[tokio::test]
async fn late_cancellation_signal_is_ignored_after_success() {
    let output = ConnectorJobOutput::succeeded(
        OutputType::Spec,
        OutputPayload::Spec(serde_json::json!({"connectionSpecification": {}})),
    );
    let launcher = Arc::new(MockProcessLauncher::new(MockBehavior::Output(output.clone())));
    let api = Arc::new(InMemoryWorkloadApi::new());
    let activity = activity(&launcher, &api, StaticFlagClient::new());

    // The context would report cancellation on its first heartbeat, but the
    // work finishes before the first probe tick.
    let ctx = Arc::new(MockActivityContext::cancel_after(1));
    let result = activity.run(input(), ctx).await.unwrap();

    assert_eq!(result, output);
    let state = launcher.last_state().unwrap();
    assert!(!state.cancelled.load(Ordering::SeqCst));
}
