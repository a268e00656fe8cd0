//! Redis Manager - Centralized Redis connection and operations
//!
//! This module handles the worker's queue traffic:
//! - Job queue operations (BLPOP)
//! - Response storage and publishing

use std::time::Duration;

use anyhow::{Context, Result};
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tracing::{info, warn};

use crate::jobs::{JobResponse, WorkerJob};

/// Redis key constants
pub mod keys {
    /// Job queue key
    pub const JOB_QUEUE: &str = "forge:queue";

    /// Job response key prefix (for polling)
    pub const RESULT_PREFIX: &str = "forge:result:";

    /// Job response channel (for pub/sub)
    pub const RESULT_CHANNEL: &str = "forge:results";
}

const RESULT_EXPIRY_SECS: u64 = 3600; // 1 hour
const RECONNECT_DELAY_SECS: u64 = 3;

/// A popped queue entry
#[derive(Debug)]
pub enum QueueEntry {
    Job(WorkerJob),
    /// Payload that is not a valid job but names a request to answer
    Invalid { request_id: String, reason: String },
}

/// Centralized Redis manager for queue operations
pub struct RedisManager {
    client: redis::Client,
    conn: MultiplexedConnection,
}

impl RedisManager {
    pub async fn with_url(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url).context("Failed to create Redis client")?;

        let conn = get_connection_with_retry(&client).await?;
        info!("Connected to Redis at {}", redis_url);

        Ok(Self { client, conn })
    }

    /// Client handle for other Redis consumers (the problem store)
    pub fn client(&self) -> redis::Client {
        self.client.clone()
    }

    /// Block and wait for the next job from the queue.
    ///
    /// This uses BLPOP to efficiently wait for jobs without polling.
    /// Automatically reconnects on connection failure. Payloads that do not
    /// parse are dropped unless they carry a `request_id`.
    pub async fn pop_job(&mut self) -> Result<QueueEntry> {
        loop {
            let result: Option<(String, String)> =
                match self.conn.blpop(keys::JOB_QUEUE, 0.0).await {
                    Ok(res) => res,
                    Err(e) => {
                        warn!("Redis BLPOP failed: {}. Reconnecting...", e);
                        self.reconnect().await?;
                        continue;
                    }
                };

            let Some((_, job_data)) = result else {
                continue;
            };

            match serde_json::from_str::<WorkerJob>(&job_data) {
                Ok(job) => return Ok(QueueEntry::Job(job)),
                Err(e) => {
                    warn!("Failed to parse job data: {}. Data: {}", e, job_data);
                    if let Some(request_id) = request_id_of(&job_data) {
                        return Ok(QueueEntry::Invalid {
                            request_id,
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }
    }

    /// Store a job response in Redis.
    ///
    /// The response is stored with a 1-hour expiration and also published
    /// to a channel for real-time subscribers.
    pub async fn store_response(&mut self, response: &JobResponse) -> Result<()> {
        let key = format!("{}{}", keys::RESULT_PREFIX, response.request_id);
        let json = serde_json::to_string(response)?;

        // Try to store, reconnect on failure
        if let Err(e) = self
            .conn
            .set_ex::<_, _, ()>(&key, &json, RESULT_EXPIRY_SECS)
            .await
        {
            warn!("Failed to store response: {}. Reconnecting...", e);
            self.reconnect().await?;
            self.conn
                .set_ex::<_, _, ()>(&key, &json, RESULT_EXPIRY_SECS)
                .await
                .with_context(|| format!("Failed to store response {}", key))?;
        }

        // Publish to channel (ignore errors as there may be no subscribers)
        if let Err(e) = self
            .conn
            .publish::<_, _, ()>(keys::RESULT_CHANNEL, &json)
            .await
        {
            warn!("Failed to publish response {}: {}", response.request_id, e);
        }

        Ok(())
    }

    async fn reconnect(&mut self) -> Result<()> {
        self.conn = get_connection_with_retry(&self.client).await?;
        Ok(())
    }
}

/// `request_id` of a JSON object payload, if present
fn request_id_of(job_data: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(job_data).ok()?;
    value.get("request_id")?.as_str().map(String::from)
}

/// Get a Redis connection with retry logic
async fn get_connection_with_retry(client: &redis::Client) -> Result<MultiplexedConnection> {
    loop {
        match client.get_multiplexed_async_connection().await {
            Ok(conn) => return Ok(conn),
            Err(e) => {
                warn!(
                    "Failed to connect to Redis: {}. Retrying in {} seconds...",
                    e, RECONNECT_DELAY_SECS
                );
                tokio::time::sleep(Duration::from_secs(RECONNECT_DELAY_SECS)).await;
            }
        }
    }
}
