pub mod evaluate;
pub mod generate;

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::JudgeError;
use crate::jobs::evaluate::EvaluateJob;
use crate::jobs::generate::GenerateJob;
use crate::service::{EvaluationService, GenerationService};

/// Worker job enum - represents different types of jobs the worker can process
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "job_type")]
pub enum WorkerJob {
    /// Evaluate a submission against a stored problem
    #[serde(rename = "evaluate")]
    Evaluate(EvaluateJob),
    /// Generate and store a new problem
    #[serde(rename = "generate")]
    Generate(GenerateJob),
}

impl WorkerJob {
    pub fn request_id(&self) -> &str {
        match self {
            WorkerJob::Evaluate(job) => &job.request_id,
            WorkerJob::Generate(job) => &job.request_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobError {
    pub kind: String,
    pub message: String,
}

impl From<&JudgeError> for JobError {
    fn from(e: &JudgeError) -> Self {
        Self {
            kind: e.kind().to_string(),
            message: e.to_string(),
        }
    }
}

/// Response stored for every job, successful or not
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResponse {
    pub request_id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
}

impl JobResponse {
    pub fn ok<T: Serialize>(request_id: &str, result: &T) -> Self {
        match serde_json::to_value(result) {
            Ok(value) => Self {
                request_id: request_id.to_string(),
                success: true,
                result: Some(value),
                error: None,
            },
            Err(e) => {
                error!("Failed to serialize result for {}: {}", request_id, e);
                Self::error(
                    request_id,
                    "internal",
                    format!("Failed to serialize result: {}", e),
                )
            }
        }
    }

    pub fn failed(request_id: &str, error: &JudgeError) -> Self {
        Self {
            request_id: request_id.to_string(),
            success: false,
            result: None,
            error: Some(error.into()),
        }
    }

    /// Failure outside the judge taxonomy (bad payload, serialization)
    pub fn error(request_id: &str, kind: &str, message: String) -> Self {
        Self {
            request_id: request_id.to_string(),
            success: false,
            result: None,
            error: Some(JobError {
                kind: kind.to_string(),
                message,
            }),
        }
    }
}

/// Everything a job handler needs
pub struct Services {
    pub evaluation: EvaluationService,
    pub generation: GenerationService,
}

impl Services {
    pub async fn handle(&self, job: WorkerJob) -> JobResponse {
        match job {
            WorkerJob::Evaluate(job) => {
                evaluate::process_evaluate_job(&job, &self.evaluation).await
            }
            WorkerJob::Generate(job) => {
                generate::process_generate_job(&job, &self.generation).await
            }
        }
    }
}
