//! Evaluation harness
//!
//! Runs one submission against a problem's test cases, strictly one after
//! another, and aggregates the per-case outcomes into an `EvaluationResult`.
//! Executor failures never escape: they turn the whole evaluation into an
//! `Error` result.

use anyhow::Result;
use rand::seq::index::sample;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::problem::{Problem, TestCase};
use crate::runner::Executor;
use crate::synthesizer::synthesize;
use crate::verdict::Verdict;

/// Which hidden cases take part in an evaluation
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationMode {
    /// Every stored hidden case
    #[default]
    Run,
    /// A bounded random sample of hidden cases
    Submit,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TestResult {
    pub passed: bool,
    pub input: String,
    pub expected_output: String,
    pub actual_output: String,
    /// Milliseconds
    pub execution_time: u64,
    /// KB
    pub memory_usage: u64,
    pub is_hidden: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OverallMetrics {
    pub total_tests: usize,
    pub passed_tests: usize,
    pub success_rate: f64,
    pub average_time: f64,
    pub average_memory: f64,
    pub status: Verdict,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct EvaluationResult {
    pub test_results: Vec<TestResult>,
    pub overall_metrics: OverallMetrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl EvaluationResult {
    pub fn from_results(test_results: Vec<TestResult>) -> Self {
        let total_tests = test_results.len();
        let passed_tests = test_results.iter().filter(|r| r.passed).count();
        let (success_rate, average_time, average_memory) = if total_tests == 0 {
            (0.0, 0.0, 0.0)
        } else {
            let n = total_tests as f64;
            let time: u64 = test_results.iter().map(|r| r.execution_time).sum();
            let memory: u64 = test_results.iter().map(|r| r.memory_usage).sum();
            (passed_tests as f64 / n, time as f64 / n, memory as f64 / n)
        };

        let status = if passed_tests == total_tests {
            Verdict::Accepted
        } else {
            Verdict::WrongAnswer
        };

        Self {
            test_results,
            overall_metrics: OverallMetrics {
                total_tests,
                passed_tests,
                success_rate,
                average_time,
                average_memory,
                status,
            },
            feedback: None,
            error_message: None,
        }
    }

    /// Evaluation that could not run: no results, zero metrics
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            test_results: vec![],
            overall_metrics: OverallMetrics {
                total_tests: 0,
                passed_tests: 0,
                success_rate: 0.0,
                average_time: 0.0,
                average_memory: 0.0,
                status: Verdict::Error,
            },
            feedback: None,
            error_message: Some(message.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.overall_metrics.status == Verdict::Error
    }
}

/// Compare program output with expected output
pub fn outputs_match(actual: &str, expected: &str) -> bool {
    actual.trim() == expected.trim()
}

/// Sequential evaluation harness
pub struct Judge {
    executor: Arc<dyn Executor>,
    hidden_sample_size: usize,
}

impl Judge {
    pub fn new(executor: Arc<dyn Executor>, hidden_sample_size: usize) -> Self {
        Self {
            executor,
            hidden_sample_size,
        }
    }

    /// Visible examples in order, then the hidden cases for `mode`
    pub fn select_cases<R: Rng + ?Sized>(
        &self,
        problem: &Problem,
        mode: EvaluationMode,
        rng: &mut R,
    ) -> Vec<TestCase> {
        let mut cases: Vec<TestCase> = problem.visible_examples().cloned().collect();
        let hidden: Vec<&TestCase> = problem.hidden_examples().collect();

        match mode {
            EvaluationMode::Run => cases.extend(hidden.into_iter().cloned()),
            EvaluationMode::Submit if hidden.is_empty() => {
                debug!(
                    "Problem {} has no stored hidden cases, synthesizing {}",
                    problem.id, self.hidden_sample_size
                );
                cases.extend((0..self.hidden_sample_size).map(|_| synthesize(problem, rng).case));
            }
            EvaluationMode::Submit => {
                let amount = self.hidden_sample_size.min(hidden.len());
                let mut picked = sample(rng, hidden.len(), amount).into_vec();
                // Keep stored order
                picked.sort_unstable();
                cases.extend(picked.into_iter().map(|i| hidden[i].clone()));
            }
        }
        cases
    }

    /// Run `code` against the problem's cases. Never fails; faults become
    /// an `Error` result.
    pub async fn evaluate(
        &self,
        problem: &Problem,
        code: &str,
        language: &str,
        mode: EvaluationMode,
    ) -> EvaluationResult {
        let cases = self.select_cases(problem, mode, &mut rand::thread_rng());
        info!(
            "Evaluating problem {} ({:?} mode): {} cases, language={}",
            problem.id,
            mode,
            cases.len(),
            language
        );

        match self.run_cases(&cases, code, language).await {
            Ok(results) => {
                let result = EvaluationResult::from_results(results);
                info!(
                    "Evaluation summary: problem={}, status={}, passed={}/{}",
                    problem.id,
                    result.overall_metrics.status,
                    result.overall_metrics.passed_tests,
                    result.overall_metrics.total_tests
                );
                result
            }
            Err(e) => {
                warn!("Evaluation of problem {} failed: {:#}", problem.id, e);
                EvaluationResult::error(format!("{:#}", e))
            }
        }
    }

    async fn run_cases(
        &self,
        cases: &[TestCase],
        code: &str,
        language: &str,
    ) -> Result<Vec<TestResult>> {
        let mut results = Vec::with_capacity(cases.len());
        for (idx, case) in cases.iter().enumerate() {
            let execution = self.executor.execute(code, language, &case.input).await?;
            let passed = outputs_match(&execution.output, &case.output);
            debug!(
                "Case {} ({:?}): passed={}, time={}ms",
                idx, execution.status, passed, execution.execution_time_ms
            );

            results.push(TestResult {
                passed,
                input: case.input.clone(),
                expected_output: case.output.clone(),
                actual_output: execution.output,
                execution_time: execution.execution_time_ms,
                memory_usage: execution.memory_kb,
                is_hidden: case.is_hidden,
            });
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::Difficulty;
    use crate::runner::ExecutionResult;
    use async_trait::async_trait;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::{BTreeMap, BTreeSet};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers with the input wrapped in whitespace, except for inputs
    /// starting with "wrong"
    struct EchoExecutor {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Executor for EchoExecutor {
        async fn execute(
            &self,
            _code: &str,
            _language: &str,
            input: &str,
        ) -> Result<ExecutionResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let output = if input.starts_with("wrong") {
                "nope".to_string()
            } else {
                format!("  {}\n", input)
            };
            Ok(ExecutionResult::completed(output, 10, 100))
        }
    }

    struct BrokenExecutor;

    #[async_trait]
    impl Executor for BrokenExecutor {
        async fn execute(&self, _: &str, _: &str, _: &str) -> Result<ExecutionResult> {
            anyhow::bail!("spawn failed")
        }
    }

    fn echo() -> Arc<EchoExecutor> {
        Arc::new(EchoExecutor {
            calls: AtomicUsize::new(0),
        })
    }

    fn problem(examples: Vec<TestCase>) -> Problem {
        Problem {
            id: "p1".into(),
            title: "Echo".into(),
            description: "Print the input".into(),
            difficulty: Difficulty::Easy,
            topics: BTreeSet::new(),
            hint: None,
            constraints: vec![],
            starter_code: BTreeMap::new(),
            examples,
        }
    }

    #[tokio::test]
    async fn test_all_matching_is_accepted() {
        let executor = echo();
        let judge = Judge::new(executor.clone(), 3);
        let problem = problem(vec![
            TestCase::new("a", "a"),
            TestCase::new("b", "b"),
            TestCase::new("c", "c").hidden(),
        ]);

        let result = judge.evaluate(&problem, "code", "python", EvaluationMode::Run).await;

        assert_eq!(result.overall_metrics.status, Verdict::Accepted);
        assert_eq!(result.overall_metrics.total_tests, 3);
        assert_eq!(result.overall_metrics.passed_tests, 3);
        assert_eq!(result.overall_metrics.success_rate, 1.0);
        assert_eq!(result.overall_metrics.average_time, 10.0);
        assert_eq!(result.overall_metrics.average_memory, 100.0);
        assert!(result.test_results[2].is_hidden);
        assert_eq!(executor.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_one_mismatch_is_wrong_answer() {
        let judge = Judge::new(echo(), 3);
        let problem = problem(vec![TestCase::new("a", "a"), TestCase::new("wrong", "x")]);

        let result = judge.evaluate(&problem, "code", "python", EvaluationMode::Run).await;

        assert_eq!(result.overall_metrics.status, Verdict::WrongAnswer);
        assert_eq!(result.overall_metrics.passed_tests, 1);
        assert_eq!(result.overall_metrics.success_rate, 0.5);
        assert_eq!(result.test_results[1].actual_output, "nope");
        assert!(result.error_message.is_none());
    }

    #[tokio::test]
    async fn test_executor_fault_is_error_result() {
        let judge = Judge::new(Arc::new(BrokenExecutor), 3);
        let problem = problem(vec![TestCase::new("a", "a")]);

        let result = judge.evaluate(&problem, "code", "python", EvaluationMode::Run).await;

        assert!(result.is_error());
        assert!(result.test_results.is_empty());
        assert_eq!(result.overall_metrics.total_tests, 0);
        assert_eq!(result.overall_metrics.success_rate, 0.0);
        assert!(result.error_message.unwrap().contains("spawn failed"));
    }

    #[test]
    fn test_submit_samples_hidden_in_stored_order() {
        let judge = Judge::new(echo(), 3);
        let mut examples = vec![TestCase::new("v", "v")];
        examples.extend((0..8).map(|i| TestCase::new(format!("h{}", i), "x").hidden()));
        let problem = problem(examples);

        for seed in 0..10 {
            let mut rng = StdRng::seed_from_u64(seed);
            let cases = judge.select_cases(&problem, EvaluationMode::Submit, &mut rng);
            assert_eq!(cases.len(), 4);
            assert_eq!(cases[0].input, "v");
            let picked: Vec<usize> = cases[1..]
                .iter()
                .map(|c| c.input[1..].parse().unwrap())
                .collect();
            assert!(picked.windows(2).all(|w| w[0] < w[1]));
        }

        let all = judge.select_cases(&problem, EvaluationMode::Run, &mut StdRng::seed_from_u64(0));
        assert_eq!(all.len(), 9);
    }

    #[test]
    fn test_submit_without_stored_hidden_synthesizes() {
        let judge = Judge::new(echo(), 2);
        let problem = problem(vec![TestCase::new("n = 4", "4")]);

        let mut rng = StdRng::seed_from_u64(1);
        let cases = judge.select_cases(&problem, EvaluationMode::Submit, &mut rng);
        assert_eq!(cases.len(), 3);
        assert!(cases[1..].iter().all(|c| c.is_hidden && c.input == "n = 40"));

        let run = judge.select_cases(&problem, EvaluationMode::Run, &mut StdRng::seed_from_u64(1));
        assert_eq!(run.len(), 1);
    }

    #[test]
    fn test_outputs_match_trims() {
        assert!(outputs_match("  [0,1]\n", "[0,1]"));
        assert!(!outputs_match("[0, 1]", "[0,1]"));
    }

    #[test]
    fn test_mode_serde() {
        let mode: EvaluationMode = serde_json::from_str("\"submit\"").unwrap();
        assert_eq!(mode, EvaluationMode::Submit);
    }
}
