//! Problem storage
//!
//! The judge only needs a keyed store of `Problem` records. It is always
//! passed around as an explicit handle; there is no global registry.
//! - `RedisProblemStore`: shared by every worker on the same Redis
//! - `MemoryStore`: process-local, used by tests

mod redis_store;

pub use redis_store::RedisProblemStore;

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::problem::{Difficulty, Problem};

#[async_trait]
pub trait ProblemStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Problem>>;

    /// Insert or replace by id
    async fn insert(&self, problem: Problem) -> Result<()>;

    /// Replace an existing problem; `false` when the id is unknown
    async fn update(&self, problem: Problem) -> Result<bool>;

    /// `false` when the id is unknown
    async fn delete(&self, id: &str) -> Result<bool>;

    /// All problems, ordered by id
    async fn list(&self) -> Result<Vec<Problem>>;

    async fn by_topic(&self, topic: &str) -> Result<Vec<Problem>> {
        let problems = self.list().await?;
        Ok(problems.into_iter().filter(|p| p.has_topic(topic)).collect())
    }

    async fn by_difficulty(&self, difficulty: Difficulty) -> Result<Vec<Problem>> {
        let problems = self.list().await?;
        Ok(problems
            .into_iter()
            .filter(|p| p.difficulty == difficulty)
            .collect())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    problems: RwLock<HashMap<String, Problem>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProblemStore for MemoryStore {
    async fn get(&self, id: &str) -> Result<Option<Problem>> {
        Ok(self.problems.read().await.get(id).cloned())
    }

    async fn insert(&self, problem: Problem) -> Result<()> {
        self.problems.write().await.insert(problem.id.clone(), problem);
        Ok(())
    }

    async fn update(&self, problem: Problem) -> Result<bool> {
        let mut problems = self.problems.write().await;
        match problems.get_mut(&problem.id) {
            Some(existing) => {
                *existing = problem;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.problems.write().await.remove(id).is_some())
    }

    async fn list(&self) -> Result<Vec<Problem>> {
        let mut problems: Vec<Problem> = self.problems.read().await.values().cloned().collect();
        problems.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(problems)
    }
}
