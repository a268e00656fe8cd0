//! Built-in problem catalog (`files/presets.toml`)
//!
//! Used for generation requests when no text generator is configured.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::problem::{Difficulty, Problem, TestCase};

#[derive(Debug, Clone, Deserialize)]
struct PresetProblem {
    title: String,
    description: String,
    difficulty: Difficulty,
    topics: BTreeSet<String>,
    #[serde(default)]
    hint: Option<String>,
    constraints: Vec<String>,
    starter_code: BTreeMap<String, String>,
    examples: Vec<TestCase>,
}

impl PresetProblem {
    fn instantiate(&self) -> Problem {
        Problem {
            id: uuid::Uuid::new_v4().to_string(),
            title: self.title.clone(),
            description: self.description.clone(),
            difficulty: self.difficulty,
            topics: self.topics.clone(),
            hint: self.hint.clone(),
            constraints: self.constraints.clone(),
            starter_code: self.starter_code.clone(),
            examples: self.examples.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PresetCatalog {
    two_sum: PresetProblem,
    three_sum: PresetProblem,
    climbing_stairs: PresetProblem,
}

impl PresetCatalog {
    pub fn builtin() -> Result<Self> {
        let content = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/files/presets.toml"));
        toml::from_str(content).context("Invalid built-in preset catalog")
    }

    /// Pick a preset for the request. Requests without a matching preset
    /// get 3Sum.
    pub fn select(&self, topic: &str, difficulty: Difficulty) -> Problem {
        let topic = topic.trim().to_lowercase();
        let preset = match (topic.as_str(), difficulty) {
            ("arrays", Difficulty::Easy) => &self.two_sum,
            ("arrays", Difficulty::Medium) => &self.three_sum,
            ("dynamic programming" | "dp", _) => &self.climbing_stairs,
            _ => &self.three_sum,
        };
        preset.instantiate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_parses() {
        let catalog = PresetCatalog::builtin().unwrap();
        let problem = catalog.select("Arrays", Difficulty::Easy);
        assert_eq!(problem.title, "Two Sum");
        assert_eq!(problem.examples.len(), 3);
        assert_eq!(problem.examples[0].input, "nums = [2,7,11,15], target = 9");
        assert!(problem.starter_code["python"].starts_with("class Solution:"));
        assert!(problem.examples.iter().all(|e| !e.is_hidden));
    }

    #[test]
    fn test_selection() {
        let catalog = PresetCatalog::builtin().unwrap();
        assert_eq!(catalog.select("arrays", Difficulty::Medium).title, "3Sum");
        assert_eq!(catalog.select("DP", Difficulty::Hard).title, "Climbing Stairs");
        assert_eq!(
            catalog.select("dynamic programming", Difficulty::Easy).title,
            "Climbing Stairs"
        );
        assert_eq!(catalog.select("graphs", Difficulty::Easy).title, "3Sum");
        assert_eq!(catalog.select("arrays", Difficulty::Hard).title, "3Sum");
    }

    #[test]
    fn test_each_selection_gets_fresh_id() {
        let catalog = PresetCatalog::builtin().unwrap();
        let a = catalog.select("arrays", Difficulty::Easy);
        let b = catalog.select("arrays", Difficulty::Easy);
        assert_ne!(a.id, b.id);
    }
}
