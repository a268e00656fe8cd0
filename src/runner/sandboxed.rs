//! Sandboxed executor for candidate code
//!
//! Each run writes the code to a uniquely named file in the scratch
//! directory and starts the language runtime as a child in its own process
//! group. The group is killed when the wall-clock limit expires, and again
//! after a normal exit to reap anything the program left running in the
//! background. The source file is removed on every path. Captured output
//! is capped per stream.

use anyhow::{Context, Result};
use async_trait::async_trait;
use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::memory::resident_memory_kb;
use super::{ExecutionResult, ExecutionStatus, Executor};
use crate::languages::{LanguageConfig, LanguageRegistry};

/// Cap on captured stdout and stderr, each
const MAX_OUTPUT_BYTES: usize = 8 * 1024 * 1024;

/// Executor that runs untrusted code under a wall-clock limit
pub struct SandboxExecutor {
    languages: LanguageRegistry,
    timeout: Duration,
    scratch_dir: PathBuf,
}

impl SandboxExecutor {
    pub fn new(
        languages: LanguageRegistry,
        timeout_ms: u64,
        scratch_dir: impl AsRef<Path>,
    ) -> Self {
        Self {
            languages,
            timeout: Duration::from_millis(timeout_ms),
            scratch_dir: scratch_dir.as_ref().to_path_buf(),
        }
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }

    /// Fail fast when a configured runtime cannot run an empty program.
    pub async fn ensure_runtime_available(&self) -> Result<()> {
        for config in self.languages.configs() {
            let result = self
                .run_source(config, "", "")
                .await
                .with_context(|| format!("Runtime for {} is not available", config.name))?;
            if result.status != ExecutionStatus::Completed {
                anyhow::bail!(
                    "Runtime for {} failed to run an empty program: {:?} {}",
                    config.name,
                    result.status,
                    result.output.trim()
                );
            }
            debug!("Runtime for {} is available", config.name);
        }
        Ok(())
    }

    async fn run_source(
        &self,
        config: &LanguageConfig,
        code: &str,
        input: &str,
    ) -> Result<ExecutionResult> {
        let source = tempfile::Builder::new()
            .prefix("submission-")
            .suffix(&config.source_suffix)
            .tempfile_in(&self.scratch_dir)
            .with_context(|| {
                format!(
                    "Failed to create source file in {}",
                    self.scratch_dir.display()
                )
            })?;

        let result = self.spawn_and_wait(config, source.path(), code, input).await;
        discard(source);
        result
    }

    async fn spawn_and_wait(
        &self,
        config: &LanguageConfig,
        source_path: &Path,
        code: &str,
        input: &str,
    ) -> Result<ExecutionResult> {
        tokio::fs::write(source_path, code)
            .await
            .context("Failed to write source file")?;

        let command = config.command_for(source_path);
        debug!(
            "Running {} program: {} {:?}",
            config.name, command.program, command.args
        );

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .current_dir(&self.scratch_dir)
            .env_clear()
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .process_group(0);
        if let Some(path) = std::env::var_os("PATH") {
            cmd.env("PATH", path);
        }

        let baseline_kb = resident_memory_kb().await;
        let start = Instant::now();

        let mut child = cmd
            .spawn()
            .with_context(|| format!("Failed to spawn {}", command.program))?;
        let pid = child.id();

        let writer = spawn_writer(child.stdin.take(), input.to_owned());
        let mut stdout_reader = spawn_reader(child.stdout.take());
        let mut stderr_reader = spawn_reader(child.stderr.take());

        // The deadline covers the pipe drains too: a descendant that left the
        // group can hold stdout open after the direct child exits
        let finished = tokio::time::timeout(self.timeout, async {
            let status = child.wait().await.context("Failed to wait for program")?;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            // Background children may still hold the pipes open
            kill_group(pid);
            let stdout = (&mut stdout_reader).await.context("Stdout reader failed")?;
            let stderr = (&mut stderr_reader).await.context("Stderr reader failed")?;
            anyhow::Ok((status, elapsed_ms, stdout, stderr))
        })
        .await;

        let (status, elapsed_ms, stdout, stderr) = match finished {
            Ok(finished) => finished?,
            Err(_) => {
                debug!(
                    "Program exceeded {} ms, killing process group",
                    self.timeout_ms()
                );
                kill_group(pid);
                if let Err(e) = child.kill().await {
                    debug!("Child already gone after group kill: {}", e);
                }
                writer.abort();
                stdout_reader.abort();
                stderr_reader.abort();
                return Ok(ExecutionResult::timed_out(self.timeout_ms()));
            }
        };
        writer.abort();

        let memory_kb = resident_memory_kb().await.saturating_sub(baseline_kb);

        debug!(
            "Program exited with {:?} after {} ms ({} bytes stdout, {} bytes stderr)",
            status.code(),
            elapsed_ms,
            stdout.bytes.len(),
            stderr.bytes.len()
        );

        if stdout.overflowed || stderr.overflowed {
            return Ok(ExecutionResult::runtime_error(format!(
                "Output limit exceeded: more than {} bytes",
                MAX_OUTPUT_BYTES
            )));
        }
        if !stderr.bytes.is_empty() {
            return Ok(ExecutionResult::runtime_error(
                String::from_utf8_lossy(&stderr.bytes).into_owned(),
            ));
        }

        Ok(ExecutionResult::completed(
            String::from_utf8_lossy(&stdout.bytes).into_owned(),
            elapsed_ms,
            memory_kb,
        ))
    }
}

#[async_trait]
impl Executor for SandboxExecutor {
    async fn execute(&self, code: &str, language: &str, input: &str) -> Result<ExecutionResult> {
        let Some(config) = self.languages.get(language) else {
            warn!("Rejected execution for unsupported language: {}", language);
            return Ok(ExecutionResult::unsupported(language));
        };
        self.run_source(config, code, input).await
    }
}

fn discard(source: NamedTempFile) {
    let path = source.path().to_path_buf();
    if let Err(e) = source.close() {
        warn!("Failed to remove source file {}: {}", path.display(), e);
    }
}

fn kill_group(pid: Option<u32>) {
    let Some(pid) = pid else { return };
    match killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => warn!("Failed to kill process group {}: {}", pid, e),
    }
}

fn spawn_writer<W>(stdin: Option<W>, input: String) -> JoinHandle<()>
where
    W: tokio::io::AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let Some(mut stdin) = stdin else { return };
        // Programs that never read their input close the pipe early
        if let Err(e) = stdin.write_all(input.as_bytes()).await {
            debug!("Stdin closed before input was written: {}", e);
        }
    })
}

/// Bytes read from one pipe, capped at `MAX_OUTPUT_BYTES`
struct Captured {
    bytes: Vec<u8>,
    overflowed: bool,
}

/// Reads at most `MAX_OUTPUT_BYTES`; past the cap the pipe is dropped so a
/// flooding writer gets EPIPE instead of filling worker memory.
fn spawn_reader<R>(pipe: Option<R>) -> JoinHandle<Captured>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut bytes = Vec::new();
        if let Some(pipe) = pipe {
            let mut limited = pipe.take(MAX_OUTPUT_BYTES as u64 + 1);
            if let Err(e) = limited.read_to_end(&mut bytes).await {
                debug!("Pipe read ended with error: {}", e);
            }
        }
        let overflowed = bytes.len() > MAX_OUTPUT_BYTES;
        bytes.truncate(MAX_OUTPUT_BYTES);
        Captured { bytes, overflowed }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // `sh` stands in for the python runtime so tests do not need python3
    const SHELL_TABLE: &str = r#"
[python]
source_suffix = ".sh"
run_command = "sh {source}"
aliases = ["py"]
"#;

    fn executor(timeout_ms: u64) -> (SandboxExecutor, TempDir) {
        let dir = TempDir::new().unwrap();
        let languages = LanguageRegistry::from_toml_str(SHELL_TABLE).unwrap();
        (SandboxExecutor::new(languages, timeout_ms, dir.path()), dir)
    }

    fn scratch_is_empty(dir: &TempDir) -> bool {
        std::fs::read_dir(dir.path()).unwrap().next().is_none()
    }

    #[tokio::test]
    async fn test_echo_input() {
        let (executor, dir) = executor(5000);
        let result = executor
            .execute("read line\necho \"got $line\"\n", "python", "hello\n")
            .await
            .unwrap();

        assert_eq!(result.status, ExecutionStatus::Completed);
        assert_eq!(result.output, "got hello\n");
        assert!(result.execution_time_ms < 5000);
        assert!(scratch_is_empty(&dir));
    }

    #[tokio::test]
    async fn test_language_alias_is_accepted() {
        let (executor, _dir) = executor(5000);
        let result = executor.execute("cat", "PY", "abc").await.unwrap();
        assert_eq!(result.output, "abc");
    }

    #[tokio::test]
    async fn test_stderr_is_runtime_error() {
        let (executor, dir) = executor(5000);
        let result = executor
            .execute("echo partial\necho boom >&2\n", "python", "")
            .await
            .unwrap();

        assert_eq!(result.status, ExecutionStatus::RuntimeError);
        assert_eq!(result.output, "boom\n");
        assert_eq!(result.execution_time_ms, 0);
        assert_eq!(result.memory_kb, 0);
        assert!(scratch_is_empty(&dir));
    }

    #[tokio::test]
    async fn test_nonzero_exit_without_stderr_completes() {
        let (executor, _dir) = executor(5000);
        let result = executor
            .execute("echo partial\nexit 3\n", "python", "")
            .await
            .unwrap();

        assert_eq!(result.status, ExecutionStatus::Completed);
        assert_eq!(result.output, "partial\n");
    }

    #[tokio::test]
    async fn test_timeout_reports_limit() {
        let (executor, dir) = executor(300);
        let started = Instant::now();
        let result = executor
            .execute("echo before\nsleep 5\n", "python", "")
            .await
            .unwrap();

        assert_eq!(result.status, ExecutionStatus::TimedOut);
        assert_eq!(result.execution_time_ms, 300);
        assert!(result.output.is_empty());
        assert!(started.elapsed() < Duration::from_secs(4));
        assert!(scratch_is_empty(&dir));
    }

    #[tokio::test]
    async fn test_background_children_do_not_block() {
        let (executor, _dir) = executor(5000);
        let started = Instant::now();
        let result = executor
            .execute("sleep 10 &\necho done\n", "python", "")
            .await
            .unwrap();

        assert_eq!(result.status, ExecutionStatus::Completed);
        assert_eq!(result.output, "done\n");
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_detached_descendant_cannot_outlive_limit() {
        let (executor, dir) = executor(500);
        let started = Instant::now();
        let result = executor
            .execute("setsid sleep 30 &\necho done\n", "python", "")
            .await
            .unwrap();

        assert_eq!(result.status, ExecutionStatus::TimedOut);
        assert_eq!(result.execution_time_ms, 500);
        assert!(started.elapsed() < Duration::from_secs(4));
        assert!(scratch_is_empty(&dir));
    }

    #[tokio::test]
    async fn test_output_flood_is_capped() {
        let (executor, dir) = executor(5000);
        let started = Instant::now();
        let result = executor.execute("yes\n", "python", "").await.unwrap();

        assert_eq!(result.status, ExecutionStatus::RuntimeError);
        assert!(result.output.starts_with("Output limit exceeded"));
        assert!(result.output.len() < 100);
        assert!(started.elapsed() < Duration::from_secs(4));
        assert!(scratch_is_empty(&dir));
    }

    #[tokio::test]
    async fn test_unsupported_language_spawns_nothing() {
        let (executor, dir) = executor(5000);
        let result = executor.execute("int main(){}", "cobol", "").await.unwrap();

        assert_eq!(result.status, ExecutionStatus::UnsupportedLanguage);
        assert_eq!(result.output, "Language not supported: cobol");
        assert_eq!(result.execution_time_ms, 0);
        assert!(scratch_is_empty(&dir));
    }

    #[tokio::test]
    async fn test_runtime_check() {
        let (executor, _dir) = executor(5000);
        executor.ensure_runtime_available().await.unwrap();

        let dir = TempDir::new().unwrap();
        let missing = LanguageRegistry::from_toml_str(
            "[python]\nsource_suffix = \".py\"\nrun_command = \"definitely-not-a-runtime {source}\"\n",
        )
        .unwrap();
        let executor = SandboxExecutor::new(missing, 1000, dir.path());
        assert!(executor.ensure_runtime_available().await.is_err());
    }
}
