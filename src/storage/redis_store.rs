use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{debug, warn};

use super::ProblemStore;
use crate::problem::Problem;

/// Redis key constants
pub mod keys {
    /// Problem JSON key prefix
    pub const PROBLEM_PREFIX: &str = "forge:problem:";

    /// Set of all stored problem ids
    pub const PROBLEM_INDEX: &str = "forge:problems";
}

fn problem_key(id: &str) -> String {
    format!("{}{}", keys::PROBLEM_PREFIX, id)
}

/// Problem store backed by Redis, one JSON document per problem
#[derive(Clone)]
pub struct RedisProblemStore {
    conn: ConnectionManager,
}

impl RedisProblemStore {
    pub async fn connect(client: redis::Client) -> Result<Self> {
        let conn = ConnectionManager::new(client)
            .await
            .context("Failed to create Redis connection manager for problem store")?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl ProblemStore for RedisProblemStore {
    async fn get(&self, id: &str) -> Result<Option<Problem>> {
        let mut conn = self.conn.clone();
        let json: Option<String> = conn
            .get(problem_key(id))
            .await
            .with_context(|| format!("Failed to read problem {}", id))?;

        json.map(|json| {
            serde_json::from_str(&json).with_context(|| format!("Corrupt problem record {}", id))
        })
        .transpose()
    }

    async fn insert(&self, problem: Problem) -> Result<()> {
        let mut conn = self.conn.clone();
        let json = serde_json::to_string(&problem)?;
        redis::pipe()
            .atomic()
            .set(problem_key(&problem.id), json)
            .sadd(keys::PROBLEM_INDEX, &problem.id)
            .query_async::<()>(&mut conn)
            .await
            .with_context(|| format!("Failed to store problem {}", problem.id))?;
        debug!("Stored problem {}", problem.id);
        Ok(())
    }

    async fn update(&self, problem: Problem) -> Result<bool> {
        let mut conn = self.conn.clone();
        let json = serde_json::to_string(&problem)?;
        // SET XX only writes when the key already exists
        let written: Option<String> = redis::cmd("SET")
            .arg(problem_key(&problem.id))
            .arg(json)
            .arg("XX")
            .query_async(&mut conn)
            .await
            .with_context(|| format!("Failed to update problem {}", problem.id))?;
        Ok(written.is_some())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let (removed, _): (u64, u64) = redis::pipe()
            .atomic()
            .del(problem_key(id))
            .srem(keys::PROBLEM_INDEX, id)
            .query_async(&mut conn)
            .await
            .with_context(|| format!("Failed to delete problem {}", id))?;
        Ok(removed > 0)
    }

    async fn list(&self) -> Result<Vec<Problem>> {
        let mut conn = self.conn.clone();
        let mut ids: Vec<String> = conn
            .smembers(keys::PROBLEM_INDEX)
            .await
            .context("Failed to read problem index")?;
        ids.sort();

        let mut problems = Vec::with_capacity(ids.len());
        for id in ids {
            match self.get(&id).await? {
                Some(problem) => problems.push(problem),
                None => warn!("Problem index references missing problem {}", id),
            }
        }
        Ok(problems)
    }
}
