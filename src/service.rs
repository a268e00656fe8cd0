//! Entry points for the two job kinds
//!
//! `EvaluationService` looks a problem up and runs a submission through the
//! harness. `GenerationService` produces a new problem, pads it with hidden
//! cases and stores it.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{JudgeError, JudgeResult};
use crate::feedback::Feedback;
use crate::generator::TextGenerator;
use crate::judger::{EvaluationMode, EvaluationResult, Judge};
use crate::parser::{parse_problem, parse_test_cases};
use crate::presets::PresetCatalog;
use crate::problem::{Difficulty, Problem};
use crate::storage::ProblemStore;
use crate::synthesizer::fill_hidden;

/// Topic recorded when a generated problem names none and its description
/// does not mention the requested one
pub const FALLBACK_TOPIC: &str = "Algorithm";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluateRequest {
    pub code: String,
    pub language: String,
    pub problem_id: String,
    #[serde(default)]
    pub mode: EvaluationMode,
}

fn default_topic() -> String {
    "arrays".to_string()
}

fn default_difficulty() -> String {
    Difficulty::default().to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    #[serde(default = "default_topic")]
    pub topic: String,
    /// Free-form; unknown values become `medium`
    #[serde(default = "default_difficulty")]
    pub difficulty: String,
}

pub struct EvaluationService {
    store: Arc<dyn ProblemStore>,
    judge: Judge,
}

impl EvaluationService {
    pub fn new(store: Arc<dyn ProblemStore>, judge: Judge) -> Self {
        Self { store, judge }
    }

    pub async fn evaluate(&self, request: &EvaluateRequest) -> JudgeResult<EvaluationResult> {
        let problem = self
            .store
            .get(&request.problem_id)
            .await
            .map_err(JudgeError::Store)?
            .ok_or_else(|| JudgeError::ProblemNotFound(request.problem_id.clone()))?;

        if problem.examples.is_empty() {
            return Err(JudgeError::NoTestCases(problem.id));
        }

        let mut result = self
            .judge
            .evaluate(&problem, &request.code, &request.language, request.mode)
            .await;

        if !result.is_error() {
            let metrics = &result.overall_metrics;
            let feedback = Feedback::synthesize(
                &problem,
                &request.language,
                metrics.passed_tests,
                metrics.total_tests,
                &mut rand::thread_rng(),
            );
            result.feedback = Some(feedback.render());
        }
        Ok(result)
    }
}

pub struct GenerationService {
    store: Arc<dyn ProblemStore>,
    generator: Option<Arc<dyn TextGenerator>>,
    presets: PresetCatalog,
    min_test_cases: usize,
}

impl GenerationService {
    pub fn new(
        store: Arc<dyn ProblemStore>,
        generator: Option<Arc<dyn TextGenerator>>,
        presets: PresetCatalog,
        min_test_cases: usize,
    ) -> Self {
        Self {
            store,
            generator,
            presets,
            min_test_cases,
        }
    }

    pub async fn generate(&self, request: &GenerateRequest) -> JudgeResult<Problem> {
        let difficulty = Difficulty::normalize(&request.difficulty);

        let mut problem = match &self.generator {
            Some(generator) => {
                self.generate_with(generator.as_ref(), &request.topic, difficulty)
                    .await?
            }
            None => {
                info!(
                    "No text generator configured, using preset for topic={}, difficulty={}",
                    request.topic, difficulty
                );
                self.presets.select(&request.topic, difficulty)
            }
        };

        fill_hidden(&mut problem, self.min_test_cases, &mut rand::thread_rng());

        self.store
            .insert(problem.clone())
            .await
            .map_err(JudgeError::Store)?;
        info!(
            "Generated problem {} ({}): {} examples, {} hidden",
            problem.id,
            problem.title,
            problem.examples.len(),
            problem.hidden_examples().count()
        );
        Ok(problem)
    }

    async fn generate_with(
        &self,
        generator: &dyn TextGenerator,
        topic: &str,
        difficulty: Difficulty,
    ) -> JudgeResult<Problem> {
        let raw = generator
            .generate_problem(topic, difficulty)
            .await
            .map_err(|e| JudgeError::GenerationUnavailable(format!("{:#}", e)))?;

        let mut problem = parse_problem(&raw);
        if problem.topics.is_empty() {
            problem.topics.insert(fallback_topic(&problem, topic));
        }

        // Extra cases are best effort; synthesis fills the gap
        match generator.generate_test_cases(&problem).await {
            Ok(text) => {
                let cases = parse_test_cases(&text);
                info!("Generator supplied {} extra test cases", cases.len());
                for case in cases {
                    problem.push_hidden(case);
                }
            }
            Err(e) => warn!("Extra test case generation failed: {:#}", e),
        }
        Ok(problem)
    }
}

fn fallback_topic(problem: &Problem, topic: &str) -> String {
    let topic = topic.trim();
    if !topic.is_empty()
        && problem
            .description
            .to_lowercase()
            .contains(&topic.to_lowercase())
    {
        capitalize(topic)
    } else {
        FALLBACK_TOPIC.to_string()
    }
}

/// First character upper-cased, the rest lower-cased
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
