// Docker process launcher
// Spawns one connector container per operation and hands back a handle the
// engine can wait on or terminate. The child is reaped on every path: a
// waiter task owns the `Child` and collects its output as soon as it exits.

use std::process::Stdio;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use covalent_core::domain::{LauncherConfig, OperationInput};
use covalent_core::port::{LaunchError, ProcessHandle, ProcessLauncher, ProcessOutput};

const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// Launches connector operations as `docker run` children.
///
/// The connector config is written to the container's stdin; the container
/// writes its final output message to stdout.
pub struct DockerProcessLauncher {
    docker_path: String,
    grace_period: Duration,
}

impl Default for DockerProcessLauncher {
    fn default() -> Self {
        Self::new("docker", DEFAULT_GRACE_PERIOD)
    }
}

impl DockerProcessLauncher {
    pub fn new(docker_path: impl Into<String>, grace_period: Duration) -> Self {
        Self {
            docker_path: docker_path.into(),
            grace_period,
        }
    }

    fn build_command(&self, config: &LauncherConfig, input: &OperationInput) -> Command {
        let mut command = Command::new(&self.docker_path);
        command.arg("run").arg("--rm").arg("-i");

        if let Some(connection_id) = &config.connection_id {
            command.arg("--env");
            command.arg(format!("CONNECTION_ID={connection_id}"));
        }
        if let Some(hosts) = &config.allowed_hosts {
            command.arg("--env");
            command.arg(format!("ALLOWED_HOSTS={}", hosts.join(",")));
        }
        if let Some(version) = &config.protocol_version {
            command.arg("--env");
            command.arg(format!("PROTOCOL_VERSION={version}"));
        }

        command.arg(&config.docker_image);
        command.arg(input.operation.id_suffix());
        command
    }

    /// Spawn the command with piped stdio and write `stdin_payload` to the
    /// child's stdin from a background task.
    fn spawn(
        &self,
        mut command: Command,
        stdin_payload: Vec<u8>,
    ) -> Result<SpawnedProcess, LaunchError> {
        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| LaunchError::Spawn(e.to_string()))?;

        let pid = child.id().map(|id| id as i32);

        if let Some(mut stdin) = child.stdin.take() {
            tokio::spawn(async move {
                // The child may exit without reading; a broken pipe here is fine.
                if let Err(e) = stdin.write_all(&stdin_payload).await {
                    debug!(error = %e, "Could not write connector config to stdin");
                }
                let _ = stdin.shutdown().await;
            });
        }

        let (exit_tx, exit_rx) = oneshot::channel();
        tokio::spawn(async move {
            let _ = exit_tx.send(child.wait_with_output().await);
        });

        Ok(SpawnedProcess {
            pid,
            grace_period: self.grace_period,
            exit_rx: Mutex::new(Some(exit_rx)),
        })
    }
}

#[async_trait]
impl ProcessLauncher for DockerProcessLauncher {
    async fn launch(
        &self,
        config: &LauncherConfig,
        input: &OperationInput,
    ) -> Result<Box<dyn ProcessHandle>, LaunchError> {
        let stdin_payload =
            serde_json::to_vec(&input.config).map_err(|e| LaunchError::Io(e.to_string()))?;

        let command = self.build_command(config, input);
        let process = self.spawn(command, stdin_payload)?;

        info!(
            image = %config.docker_image,
            operation = %input.operation,
            pid = ?process.pid,
            "Spawned connector container"
        );

        Ok(Box::new(process))
    }
}

#[derive(Debug)]
struct SpawnedProcess {
    pid: Option<i32>,
    grace_period: Duration,
    exit_rx: Mutex<Option<oneshot::Receiver<std::io::Result<std::process::Output>>>>,
}

impl SpawnedProcess {
    fn take_exit_rx(
        &self,
    ) -> Option<oneshot::Receiver<std::io::Result<std::process::Output>>> {
        self.exit_rx
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take()
    }
}

#[async_trait]
impl ProcessHandle for SpawnedProcess {
    async fn wait(&self) -> Result<ProcessOutput, LaunchError> {
        let exit_rx = self
            .take_exit_rx()
            .ok_or_else(|| LaunchError::Io("process exit already consumed".to_string()))?;

        let output = exit_rx
            .await
            .map_err(|_| LaunchError::Io("process waiter task dropped".to_string()))?
            .map_err(|e| LaunchError::Io(e.to_string()))?;

        Ok(ProcessOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    #[cfg(unix)]
    async fn terminate(&self) -> Result<(), LaunchError> {
        use nix::errno::Errno;
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        let Some(raw_pid) = self.pid else {
            return Ok(());
        };
        let pid = Pid::from_raw(raw_pid);

        info!(pid = %raw_pid, "Sending SIGTERM for graceful shutdown");
        match kill(pid, Signal::SIGTERM) {
            Ok(()) => {}
            // Already exited and reaped
            Err(Errno::ESRCH) => return Ok(()),
            Err(e) => return Err(LaunchError::Terminate(format!("SIGTERM failed: {e}"))),
        }

        let started = std::time::Instant::now();
        loop {
            tokio::time::sleep(Duration::from_millis(100)).await;

            // Signal 0 checks existence without delivering anything
            if kill(pid, None).is_err() {
                info!(pid = %raw_pid, "Process exited gracefully after SIGTERM");
                return Ok(());
            }

            if started.elapsed() > self.grace_period {
                warn!(pid = %raw_pid, "Process did not exit after SIGTERM, sending SIGKILL");
                match kill(pid, Signal::SIGKILL) {
                    Ok(()) | Err(Errno::ESRCH) => return Ok(()),
                    Err(e) => {
                        return Err(LaunchError::Terminate(format!("SIGKILL failed: {e}")))
                    }
                }
            }
        }
    }

    #[cfg(not(unix))]
    async fn terminate(&self) -> Result<(), LaunchError> {
        let Some(raw_pid) = self.pid else {
            return Ok(());
        };

        info!(pid = %raw_pid, "Killing process");
        let output = Command::new("taskkill")
            .args(["/F", "/PID", &raw_pid.to_string()])
            .output()
            .await
            .map_err(|e| LaunchError::Terminate(e.to_string()))?;

        if !output.status.success() {
            return Err(LaunchError::Terminate(format!(
                "taskkill failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }
        Ok(())
    }
}
