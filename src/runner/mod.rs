//! Runner module - Execution abstraction layer
//!
//! This module provides the execution primitives used by the worker:
//! - `SandboxExecutor`: For untrusted candidate code (bounded, isolated child process)
//! - `TrustedRunner`: For trusted helper programs like the text generator command
//!
//! The runner module does NOT:
//! - Compare outputs or determine verdicts
//! - Know about problems or test case selection

pub mod memory;
pub mod sandboxed;
pub mod trusted;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Command specification for execution
#[derive(Debug, Clone, PartialEq)]
pub struct CommandSpec {
    /// Program path or name
    pub program: String,
    /// Arguments to the program
    pub args: Vec<String>,
}

impl CommandSpec {
    /// Create from a command vector (first element is program, rest are args)
    pub fn from_vec(cmd: &[String]) -> Self {
        let mut iter = cmd.iter();
        let program = iter.next().cloned().unwrap_or_default();
        let args: Vec<String> = iter.cloned().collect();
        Self { program, args }
    }

    /// Split a whitespace-separated command line
    pub fn parse(command_line: &str) -> Self {
        let parts: Vec<String> = command_line.split_whitespace().map(String::from).collect();
        Self::from_vec(&parts)
    }

    /// Replace every `{source}` placeholder with the given path
    pub fn with_source(&self, source: &Path) -> Self {
        let source = source.to_string_lossy();
        Self {
            program: self.program.replace("{source}", &source),
            args: self
                .args
                .iter()
                .map(|a| a.replace("{source}", &source))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.program.is_empty()
    }
}

/// How a sandboxed run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Process exited within the limit with empty stderr
    Completed,
    /// Wall-clock limit hit; the process group was killed
    TimedOut,
    /// Process wrote to stderr
    RuntimeError,
    /// No runtime configured for the language; nothing was spawned
    UnsupportedLanguage,
}

/// Outcome of running one program against one input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub status: ExecutionStatus,
    /// Stdout, or stderr for runtime errors, or the unsupported-language notice
    pub output: String,
    /// Wall-clock time in milliseconds
    pub execution_time_ms: u64,
    /// Approximate resident-memory delta in KB
    pub memory_kb: u64,
}

/// Output reported for languages without a runtime
pub const UNSUPPORTED_LANGUAGE_OUTPUT: &str = "Language not supported";

impl ExecutionResult {
    pub fn completed(output: String, execution_time_ms: u64, memory_kb: u64) -> Self {
        Self {
            status: ExecutionStatus::Completed,
            output,
            execution_time_ms,
            memory_kb,
        }
    }

    /// Canonical timeout result: time equals the limit, nothing else reported
    pub fn timed_out(timeout_ms: u64) -> Self {
        Self {
            status: ExecutionStatus::TimedOut,
            output: String::new(),
            execution_time_ms: timeout_ms,
            memory_kb: 0,
        }
    }

    /// Error output takes precedence over anything written to stdout
    pub fn runtime_error(stderr: String) -> Self {
        Self {
            status: ExecutionStatus::RuntimeError,
            output: stderr,
            execution_time_ms: 0,
            memory_kb: 0,
        }
    }

    pub fn unsupported(language: &str) -> Self {
        Self {
            status: ExecutionStatus::UnsupportedLanguage,
            output: format!("{}: {}", UNSUPPORTED_LANGUAGE_OUTPUT, language),
            execution_time_ms: 0,
            memory_kb: 0,
        }
    }
}

/// Executor trait for running candidate code
///
/// Timeouts, runtime errors and unsupported languages are normal results.
/// An `Err` means the execution infrastructure itself failed.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, code: &str, language: &str, input: &str) -> Result<ExecutionResult>;
}

// Re-exports
pub use sandboxed::SandboxExecutor;
pub use trusted::TrustedRunner;
