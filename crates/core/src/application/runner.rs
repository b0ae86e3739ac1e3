// Process Runner
// Supervises a single local subprocess wrapping one connector operation.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::application::cancellation::{cancel_channel, CancelHandle, CancelToken};
use crate::domain::{ConnectorJobOutput, LauncherConfig, OperationInput};
use crate::port::{LaunchError, ProcessLauncher, ProcessOutput, TimeProvider};

/// Execution errors for the direct path.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("failed to launch connector process: {0}")]
    Launch(#[from] LaunchError),

    #[error("connector exited with code {code:?} and produced no output message: {stderr}")]
    NonZeroExit { code: Option<i32>, stderr: String },

    #[error("connector output could not be parsed: {0}")]
    Protocol(String),

    #[error("connector operation cancelled")]
    Cancelled,
}

/// Runs one connector operation as a supervised subprocess.
///
/// `cancel` is idempotent, safe to call concurrently with `run`, and a
/// no-op once the run has completed. The subprocess is reaped on every
/// exit path: the handle's `wait` reaps on normal exit and `terminate`
/// reaps after signalling.
pub struct ProcessRunner {
    launcher: Arc<dyn ProcessLauncher>,
    time_provider: Arc<dyn TimeProvider>,
    cancel_handle: CancelHandle,
    cancel_token: CancelToken,
}

impl ProcessRunner {
    pub fn new(launcher: Arc<dyn ProcessLauncher>, time_provider: Arc<dyn TimeProvider>) -> Self {
        let (cancel_handle, cancel_token) = cancel_channel();
        Self {
            launcher,
            time_provider,
            cancel_handle,
            cancel_token,
        }
    }

    /// Request cooperative cancellation of the in-flight run.
    pub fn cancel(&self) {
        self.cancel_handle.cancel();
    }

    /// Spawn the subprocess and wait for its typed output.
    pub async fn run(
        &self,
        config: &LauncherConfig,
        input: &OperationInput,
    ) -> Result<ConnectorJobOutput, ExecutionError> {
        let started_at = self.time_provider.now_millis();
        let handle = self.launcher.launch(config, input).await?;

        info!(
            docker_image = %config.docker_image,
            operation = %input.operation,
            job_id = %input.identity.job_id,
            "Connector process started"
        );

        let mut token = self.cancel_token.clone();
        let result = tokio::select! {
            exited = handle.wait() => Self::parse_output(exited?),
            _ = token.cancelled() => {
                warn!(
                    operation = %input.operation,
                    job_id = %input.identity.job_id,
                    "Cancellation requested, terminating connector process"
                );
                handle.terminate().await?;
                Err(ExecutionError::Cancelled)
            }
        };

        let duration_ms = self.time_provider.now_millis() - started_at;
        info!(
            operation = %input.operation,
            job_id = %input.identity.job_id,
            duration_ms = %duration_ms,
            success = %result.is_ok(),
            "Connector process finished"
        );

        result
    }

    /// The connector's last stdout line carries the typed output message.
    fn parse_output(output: ProcessOutput) -> Result<ConnectorJobOutput, ExecutionError> {
        for line in output.stdout.lines().rev() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Ok(parsed) = serde_json::from_str::<ConnectorJobOutput>(line) {
                return Ok(parsed);
            }
        }

        match output.exit_code {
            Some(0) => Err(ExecutionError::Protocol(
                "connector exited successfully but emitted no output message".to_string(),
            )),
            code => Err(ExecutionError::NonZeroExit {
                code,
                stderr: truncate(&output.stderr, 1024),
            }),
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &s[..end])
    }
}
