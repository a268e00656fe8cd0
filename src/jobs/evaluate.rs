use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::JobResponse;
use crate::service::{EvaluateRequest, EvaluationService};

#[derive(Debug, Serialize, Deserialize)]
pub struct EvaluateJob {
    pub request_id: String,
    #[serde(flatten)]
    pub request: EvaluateRequest,
}

/// Process an evaluate job
pub async fn process_evaluate_job(job: &EvaluateJob, service: &EvaluationService) -> JobResponse {
    info!(
        "Received evaluate job: request_id={}, problem_id={}, language={}, mode={:?}",
        job.request_id, job.request.problem_id, job.request.language, job.request.mode
    );

    match service.evaluate(&job.request).await {
        Ok(result) => {
            info!(
                "Evaluate job completed: request_id={}, status={}",
                job.request_id, result.overall_metrics.status
            );
            JobResponse::ok(&job.request_id, &result)
        }
        Err(e) => {
            warn!("Evaluate job {} rejected: {}", job.request_id, e);
            JobResponse::failed(&job.request_id, &e)
        }
    }
}
