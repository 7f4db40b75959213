//! Post-write hook execution
//!
//! Hooks run after a batch has been written (or failed to be written), e.g. to
//! reload a DNS forwarder. A failing hook is logged and never fails the batch:
//! by the time it runs the file is already in its final state.

use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{error, info, warn};

/// Default per-hook timeout in seconds
pub const DEFAULT_HOOK_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum HookError {
    #[error("hook timed out after {0} seconds")]
    Timeout(u64),

    #[error("hook failed with exit code {code}: {command}")]
    Failed { code: i32, command: String },

    #[error("failed to run hook: {0}")]
    Io(#[from] std::io::Error),
}

/// Event passed to hooks through `HOSTS_MANAGER_EVENT`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookEvent {
    Success,
    Failure,
}

impl HookEvent {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

pub struct HookExecutor {
    on_success: Vec<String>,
    on_failure: Vec<String>,
    timeout_secs: u64,
}

impl HookExecutor {
    pub fn new(on_success: Vec<String>, on_failure: Vec<String>, timeout_secs: u64) -> Self {
        Self {
            on_success,
            on_failure,
            timeout_secs,
        }
    }

    /// Run success hooks after the hosts file was written
    pub async fn run_success(&self, entry_count: usize) {
        for cmd in &self.on_success {
            if let Err(e) = self.run_hook(cmd, HookEvent::Success, entry_count, "").await {
                warn!(command = %cmd, error = %e, "Success hook failed (continuing)");
            }
        }
    }

    /// Run failure hooks after the hosts file could not be written
    pub async fn run_failure(&self, error_msg: &str) {
        for cmd in &self.on_failure {
            if let Err(e) = self.run_hook(cmd, HookEvent::Failure, 0, error_msg).await {
                warn!(command = %cmd, error = %e, "Failure hook failed (continuing)");
            }
        }
    }

    async fn run_hook(
        &self,
        cmd: &str,
        event: HookEvent,
        entry_count: usize,
        error_msg: &str,
    ) -> Result<(), HookError> {
        info!(command = %cmd, event = event.as_str(), "Running hook");

        let child = Command::new("sh")
            .arg("-c")
            .arg(cmd)
            .env("HOSTS_MANAGER_EVENT", event.as_str())
            .env("HOSTS_MANAGER_ENTRY_COUNT", entry_count.to_string())
            .env("HOSTS_MANAGER_ERROR", error_msg)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        // Dropping the output future on timeout drops the child, which kills it
        let output = match timeout(
            Duration::from_secs(self.timeout_secs),
            child.wait_with_output(),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                error!(command = %cmd, "Hook timed out");
                return Err(HookError::Timeout(self.timeout_secs));
            }
        };

        if output.status.success() {
            info!(command = %cmd, "Hook completed successfully");
            Ok(())
        } else {
            let code = output.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!(
                command = %cmd,
                code,
                stderr = %stderr.trim(),
                "Hook failed"
            );
            Err(HookError::Failed {
                code,
                command: cmd.to_string(),
            })
        }
    }
}

impl Default for HookExecutor {
    fn default() -> Self {
        Self::new(vec![], vec![], DEFAULT_HOOK_TIMEOUT_SECS)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_success_hook_sees_env() {
        let temp_dir = TempDir::new().unwrap();
        let marker = temp_dir.path().join("marker");
        let executor = HookExecutor::new(
            vec![format!(
                "echo \"$HOSTS_MANAGER_EVENT $HOSTS_MANAGER_ENTRY_COUNT\" > {}",
                marker.display()
            )],
            vec![],
            5,
        );

        executor.run_success(7).await;

        let written = std::fs::read_to_string(&marker).unwrap();
        assert_eq!(written.trim(), "success 7");
    }

    #[tokio::test]
    async fn test_failure_hook_sees_error() {
        let temp_dir = TempDir::new().unwrap();
        let marker = temp_dir.path().join("marker");
        let executor = HookExecutor::new(
            vec![],
            vec![format!(
                "echo \"$HOSTS_MANAGER_EVENT: $HOSTS_MANAGER_ERROR\" > {}",
                marker.display()
            )],
            5,
        );

        executor.run_failure("disk full").await;

        let written = std::fs::read_to_string(&marker).unwrap();
        assert_eq!(written.trim(), "failure: disk full");
    }

    #[tokio::test]
    async fn test_failing_hook_reports_exit_code() {
        let executor = HookExecutor::default();
        let err = executor
            .run_hook("exit 3", HookEvent::Success, 0, "")
            .await
            .unwrap_err();
        assert!(matches!(err, HookError::Failed { code: 3, .. }));
    }

    #[tokio::test]
    async fn test_hook_timeout() {
        let executor = HookExecutor::new(vec![], vec![], 1);
        let err = executor
            .run_hook("sleep 10", HookEvent::Success, 0, "")
            .await
            .unwrap_err();
        assert!(matches!(err, HookError::Timeout(1)));
    }

    #[tokio::test]
    async fn test_later_hooks_run_after_failure() {
        let temp_dir = TempDir::new().unwrap();
        let marker = temp_dir.path().join("marker");
        let executor = HookExecutor::new(
            vec!["false".to_string(), format!("touch {}", marker.display())],
            vec![],
            5,
        );

        executor.run_success(1).await;
        assert!(marker.exists());
    }

    #[tokio::test]
    async fn test_empty_hooks() {
        let executor = HookExecutor::default();
        executor.run_success(0).await;
        executor.run_failure("test error").await;
    }
}
