//! Problem data model
//!
//! A `Problem` is created once (by the response parser or the preset
//! catalog), may get hidden examples appended, and is then handed to the
//! store. Nothing in the judge mutates it afterwards.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Problem difficulty, always one of three values
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    /// Parse a difficulty token, case-insensitively
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    /// Parse a difficulty token, falling back to `Medium` for anything unknown
    pub fn normalize(token: &str) -> Self {
        Self::parse(token).unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One input / expected-output pair
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TestCase {
    pub input: String,
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default)]
    pub is_hidden: bool,
}

impl TestCase {
    pub fn new(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            explanation: None,
            is_hidden: false,
        }
    }

    pub fn hidden(mut self) -> Self {
        self.is_hidden = true;
        self
    }
}

/// A coding-challenge record
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Problem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub topics: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(default)]
    pub constraints: Vec<String>,
    /// Language tag -> boilerplate
    #[serde(default)]
    pub starter_code: BTreeMap<String, String>,
    pub examples: Vec<TestCase>,
}

impl Problem {
    pub fn visible_examples(&self) -> impl Iterator<Item = &TestCase> {
        self.examples.iter().filter(|tc| !tc.is_hidden)
    }

    pub fn hidden_examples(&self) -> impl Iterator<Item = &TestCase> {
        self.examples.iter().filter(|tc| tc.is_hidden)
    }

    /// Append a hidden case after all existing examples
    pub fn push_hidden(&mut self, case: TestCase) {
        self.examples.push(case.hidden());
    }

    /// Case-insensitive topic membership
    pub fn has_topic(&self, topic: &str) -> bool {
        self.topics.iter().any(|t| t.eq_ignore_ascii_case(topic))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_normalize() {
        assert_eq!(Difficulty::normalize("EASY"), Difficulty::Easy);
        assert_eq!(Difficulty::normalize(" hard "), Difficulty::Hard);
        assert_eq!(Difficulty::normalize("impossible"), Difficulty::Medium);
        assert_eq!(Difficulty::parse("impossible"), None);
    }

    #[test]
    fn test_difficulty_serde() {
        let json = serde_json::to_string(&Difficulty::Hard).unwrap();
        assert_eq!(json, "\"hard\"");
    }

    #[test]
    fn test_hidden_cases_keep_order() {
        let mut problem = Problem {
            id: "p".into(),
            title: "t".into(),
            description: "d".into(),
            difficulty: Difficulty::Easy,
            topics: BTreeSet::new(),
            hint: None,
            constraints: vec![],
            starter_code: BTreeMap::new(),
            examples: vec![TestCase::new("1", "1")],
        };
        problem.push_hidden(TestCase::new("2", "2"));
        problem.push_hidden(TestCase::new("3", "3"));

        let hidden: Vec<_> = problem.hidden_examples().map(|tc| tc.input.as_str()).collect();
        assert_eq!(hidden, vec!["2", "3"]);
        assert_eq!(problem.visible_examples().count(), 1);
        assert!(problem.examples[2].is_hidden);
    }
}
