//! Caller-visible failures of the evaluation and generation entry points.
//! Everything else (timeouts, runtime errors, malformed generator text) is
//! absorbed into normal results.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum JudgeError {
    #[error("Problem not found: {0}")]
    ProblemNotFound(String),

    #[error("Problem {0} has no test cases")]
    NoTestCases(String),

    #[error("Problem generation unavailable: {0}")]
    GenerationUnavailable(String),

    #[error("Problem store failure: {0:#}")]
    Store(#[source] anyhow::Error),
}

impl JudgeError {
    /// Stable machine-readable tag used in job responses
    pub fn kind(&self) -> &'static str {
        match self {
            JudgeError::ProblemNotFound(_) => "problem_not_found",
            JudgeError::NoTestCases(_) => "no_test_cases",
            JudgeError::GenerationUnavailable(_) => "generation_unavailable",
            JudgeError::Store(_) => "store",
        }
    }
}

pub type JudgeResult<T> = std::result::Result<T, JudgeError>;
