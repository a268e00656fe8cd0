//! Trusted runner implementation
//!
//! Executes trusted helper programs (the text generator) directly without
//! the sandbox's process isolation.

use anyhow::{Context, Result};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::CommandSpec;

/// Captured output of a trusted program
#[derive(Debug, Clone)]
pub struct TrustedOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

/// Runner that executes trusted programs directly
pub struct TrustedRunner {
    timeout: Duration,
}

impl TrustedRunner {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// Run a program, feeding `stdin_content` to its standard input
    pub async fn execute(&self, cmd: &CommandSpec, stdin_content: &str) -> Result<TrustedOutput> {
        if cmd.is_empty() {
            anyhow::bail!("Trusted command is empty");
        }
        debug!(
            "Running trusted program: {} with args: {:?}",
            cmd.program, cmd.args
        );

        let mut child = Command::new(&cmd.program)
            .args(&cmd.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to spawn trusted program {}", cmd.program))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(stdin_content.as_bytes())
                .await
                .context("Failed to write trusted program input")?;
        }

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .context("Trusted program execution timed out")?
            .context("Failed to wait for trusted program")?;

        Ok(TrustedOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
        })
    }
}

impl Default for TrustedRunner {
    fn default() -> Self {
        Self::new(30)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stdin_is_forwarded() {
        let runner = TrustedRunner::default();
        let output = runner
            .execute(&CommandSpec::parse("cat"), "prompt text")
            .await
            .unwrap();
        assert!(output.success);
        assert_eq!(output.stdout, "prompt text");
    }

    #[tokio::test]
    async fn test_failure_exit_code() {
        let runner = TrustedRunner::default();
        let output = runner.execute(&CommandSpec::parse("false"), "").await.unwrap();
        assert!(!output.success);
        assert_eq!(output.exit_code, 1);
    }

    #[tokio::test]
    async fn test_timeout_is_error() {
        let runner = TrustedRunner::new(1);
        let err = runner
            .execute(&CommandSpec::parse("sleep 5"), "")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }
}
