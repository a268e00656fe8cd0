mod config;
mod error;
mod feedback;
mod generator;
mod jobs;
mod judger;
mod languages;
mod parser;
mod presets;
mod problem;
mod redis_manager;
mod runner;
mod service;
mod storage;
mod synthesizer;
mod verdict;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info};

use crate::config::WorkerConfig;
use crate::generator::{CommandGenerator, TextGenerator};
use crate::jobs::{JobResponse, Services};
use crate::judger::Judge;
use crate::languages::LanguageRegistry;
use crate::presets::PresetCatalog;
use crate::redis_manager::{QueueEntry, RedisManager};
use crate::runner::SandboxExecutor;
use crate::service::{EvaluationService, GenerationService};
use crate::storage::{ProblemStore, RedisProblemStore};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("problem_forge=info".parse()?),
        )
        .init();

    dotenvy::dotenv().ok();

    let config = WorkerConfig::from_env()?;

    info!("Starting Problem Forge Worker...");

    // Load language configurations
    let languages = match &config.languages_config {
        Some(path) => {
            let registry = LanguageRegistry::from_path(path)?;
            info!("Loaded language configurations from {}", path.display());
            registry
        }
        None => LanguageRegistry::builtin()?,
    };
    info!("Executable languages: {:?}", languages.supported_languages());

    std::fs::create_dir_all(&config.sandbox_dir).with_context(|| {
        format!(
            "Failed to create sandbox dir {}",
            config.sandbox_dir.display()
        )
    })?;
    let executor = SandboxExecutor::new(languages, config.sandbox_timeout_ms, &config.sandbox_dir);

    // Ensure the interpreter works; fail fast otherwise
    executor.ensure_runtime_available().await?;
    info!(
        "Sandbox ready: timeout={}ms, scratch dir={}",
        executor.timeout_ms(),
        config.sandbox_dir.display()
    );

    let mut redis = RedisManager::with_url(&config.redis_url).await?;
    let store: Arc<dyn ProblemStore> = Arc::new(RedisProblemStore::connect(redis.client()).await?);

    let generator: Option<Arc<dyn TextGenerator>> = match &config.generator_command {
        Some(command) => Some(Arc::new(CommandGenerator::new(
            command,
            config.generator_timeout_secs,
        )?)),
        None => {
            info!("GENERATOR_COMMAND not set, generation uses the preset catalog");
            None
        }
    };

    let services = Services {
        evaluation: EvaluationService::new(
            store.clone(),
            Judge::new(Arc::new(executor), config.hidden_sample_size),
        ),
        generation: GenerationService::new(
            store,
            generator,
            PresetCatalog::builtin()?,
            config.min_test_cases,
        ),
    };

    info!("Waiting for jobs...");

    loop {
        let response = match redis.pop_job().await? {
            QueueEntry::Job(job) => {
                info!("Dequeued job {}", job.request_id());
                services.handle(job).await
            }
            QueueEntry::Invalid { request_id, reason } => {
                JobResponse::error(&request_id, "invalid_job", reason)
            }
        };

        if let Err(e) = redis.store_response(&response).await {
            error!(
                "Failed to store response for request {}: {:#}",
                response.request_id, e
            );
        }
    }
}
