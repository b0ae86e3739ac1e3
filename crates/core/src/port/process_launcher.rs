// Process Launcher Port
// Abstraction over spawning and supervising one connector subprocess.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{LauncherConfig, OperationInput};

/// Raw result of a finished connector process. The final stdout message is
/// parsed into a `ConnectorJobOutput` by the process runner.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Launch errors
#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("spawn failed: {0}")]
    Spawn(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("terminate failed: {0}")]
    Terminate(String),
}

/// Handle to one launched subprocess.
///
/// Implementations guarantee the child is reaped on every path: `wait`
/// reaps on normal exit, `terminate` reaps after signalling.
#[async_trait]
pub trait ProcessHandle: Send + Sync {
    /// Wait for the process to exit and collect its output. Consumes the
    /// exit result; a second call is an error.
    async fn wait(&self) -> Result<ProcessOutput, LaunchError>;

    /// Cooperatively stop the process. Safe to call multiple times and
    /// after the process has already exited (no-op then).
    async fn terminate(&self) -> Result<(), LaunchError>;
}

/// Process Launcher trait
///
/// Implementations:
/// - DockerProcessLauncher: spawns the connector container locally
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    /// Spawn exactly one subprocess for the given operation.
    ///
    /// # Errors
    /// - LaunchError::Spawn if the process cannot be started
    async fn launch(
        &self,
        config: &LauncherConfig,
        input: &OperationInput,
    ) -> Result<Box<dyn ProcessHandle>, LaunchError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use crate::domain::ConnectorJobOutput;

    /// Mock launcher behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Exit immediately with this output on stdout
        Output(ConnectorJobOutput),
        /// Exit with this output after a delay
        OutputAfter(ConnectorJobOutput, Duration),
        /// Exit immediately with raw (possibly unparseable) stdout
        Raw(String, Option<i32>),
        /// Fail to spawn
        SpawnFail(String),
        /// Run until terminated
        Hang,
    }

    /// Observable state of one mock process.
    #[derive(Debug, Default)]
    pub struct MockProcessState {
        pub cancelled: AtomicBool,
        pub completed: AtomicBool,
    }

    pub struct MockProcessLauncher {
        behavior: MockBehavior,
        launches: AtomicUsize,
        states: Mutex<Vec<Arc<MockProcessState>>>,
    }

    impl MockProcessLauncher {
        pub fn new(behavior: MockBehavior) -> Self {
            Self {
                behavior,
                launches: AtomicUsize::new(0),
                states: Mutex::new(Vec::new()),
            }
        }

        pub fn launch_count(&self) -> usize {
            self.launches.load(Ordering::SeqCst)
        }

        /// State handle of the most recently launched process.
        pub fn last_state(&self) -> Option<Arc<MockProcessState>> {
            self.states.lock().unwrap().last().cloned()
        }
    }

    #[async_trait]
    impl ProcessLauncher for MockProcessLauncher {
        async fn launch(
            &self,
            _config: &LauncherConfig,
            _input: &OperationInput,
        ) -> Result<Box<dyn ProcessHandle>, LaunchError> {
            self.launches.fetch_add(1, Ordering::SeqCst);

            if let MockBehavior::SpawnFail(msg) = &self.behavior {
                return Err(LaunchError::Spawn(msg.clone()));
            }

            let state = Arc::new(MockProcessState::default());
            self.states.lock().unwrap().push(Arc::clone(&state));

            Ok(Box::new(MockProcessHandle {
                behavior: self.behavior.clone(),
                state,
            }))
        }
    }

    struct MockProcessHandle {
        behavior: MockBehavior,
        state: Arc<MockProcessState>,
    }

    #[async_trait]
    impl ProcessHandle for MockProcessHandle {
        async fn wait(&self) -> Result<ProcessOutput, LaunchError> {
            let (stdout, exit_code) = match &self.behavior {
                MockBehavior::Output(output) => {
                    (serde_json::to_string(output).unwrap(), Some(0))
                }
                MockBehavior::OutputAfter(output, delay) => {
                    tokio::time::sleep(*delay).await;
                    (serde_json::to_string(output).unwrap(), Some(0))
                }
                MockBehavior::Raw(raw, code) => (raw.clone(), *code),
                MockBehavior::Hang => {
                    // Long enough that only termination ends the test
                    tokio::time::sleep(Duration::from_secs(600)).await;
                    (String::new(), Some(1))
                }
                MockBehavior::SpawnFail(_) => unreachable!("spawn failure has no handle"),
            };

            self.state.completed.store(true, Ordering::SeqCst);
            Ok(ProcessOutput {
                exit_code,
                stdout,
                stderr: String::new(),
            })
        }

        async fn terminate(&self) -> Result<(), LaunchError> {
            if !self.state.completed.load(Ordering::SeqCst) {
                self.state.cancelled.store(true, Ordering::SeqCst);
            }
            Ok(())
        }
    }
}
