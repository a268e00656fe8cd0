use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::JobResponse;
use crate::service::{GenerateRequest, GenerationService};

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateJob {
    pub request_id: String,
    #[serde(flatten)]
    pub request: GenerateRequest,
}

/// Process a generate job
pub async fn process_generate_job(job: &GenerateJob, service: &GenerationService) -> JobResponse {
    info!(
        "Received generate job: request_id={}, topic={}, difficulty={}",
        job.request_id, job.request.topic, job.request.difficulty
    );

    match service.generate(&job.request).await {
        Ok(problem) => {
            info!(
                "Generate job completed: request_id={}, problem_id={}",
                job.request_id, problem.id
            );
            JobResponse::ok(&job.request_id, &problem)
        }
        Err(e) => {
            warn!("Generate job {} failed: {}", job.request_id, e);
            JobResponse::failed(&job.request_id, &e)
        }
    }
}
