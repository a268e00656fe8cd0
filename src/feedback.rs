//! Advisory feedback for a submission
//!
//! Feedback is a canned critique picked from fixed tables. It does not
//! analyse the submitted code and never affects the verdict.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::parser::defaults::normalize_language;
use crate::problem::{Difficulty, Problem};

const DEFAULT_TECHNIQUE: &str = "algorithmic";
const WELL_OPTIMIZED: &str = "Your solution is well optimized.";

const SPACE_COMPLEXITIES: &[&str] = &["O(1)", "O(n)", "O(log n)"];

const APPROACH_TEMPLATES: &[&str] = &[
    "You approached this problem using a {technique}, which is efficient for this type of problem.",
    "Your solution uses a {technique} approach, which works well here.",
    "The {technique} strategy you implemented is appropriate for this challenge.",
];

/// Topic keyword -> candidate techniques, first match wins
const TECHNIQUES: &[(&[&str], &[&str])] = &[
    (
        &["array"],
        &["two-pointer", "sliding window", "greedy", "divide and conquer"],
    ),
    (
        &["string"],
        &["two-pointer", "sliding window", "dynamic programming"],
    ),
    (
        &["linked list", "linkedlist"],
        &["fast and slow pointer", "recursive", "iterative"],
    ),
    (
        &["tree"],
        &["depth-first search", "breadth-first search", "recursive"],
    ),
    (
        &["dynamic programming", "dp"],
        &[
            "bottom-up dynamic programming",
            "top-down memoization",
            "recursion with memoization",
        ],
    ),
];

const OPTIMIZATIONS: &[&str] = &[
    "Consider using a hash map to improve lookup time.",
    "You could reduce the space complexity by using an in-place algorithm.",
    "Try using a more efficient data structure for this operation.",
    "Consider edge cases like empty inputs or single elements.",
    "The time complexity could be improved by using binary search in this step.",
];

fn time_complexities(difficulty: Difficulty) -> &'static [&'static str] {
    match difficulty {
        Difficulty::Easy => &["O(n)", "O(n log n)", "O(1)"],
        Difficulty::Medium => &["O(n)", "O(n log n)", "O(n²)"],
        Difficulty::Hard => &["O(n log n)", "O(n²)", "O(2^n)"],
    }
}

fn language_notes(language: &str) -> &'static [&'static str] {
    match normalize_language(language).as_str() {
        "cpp" => &[
            "Good use of STL containers.",
            "Consider using references to avoid unnecessary copying.",
            "Using unordered_map instead of map could improve performance here.",
        ],
        "java" => &[
            "Good use of Java collections.",
            "Consider using StringBuilder for string concatenation.",
            "ArrayList operations could be optimized in this context.",
        ],
        "python" => &[
            "Good use of Python's built-in functions.",
            "List comprehensions could make this code more concise.",
            "Consider using defaultdict for this counting operation.",
        ],
        "c" => &[
            "Good memory management.",
            "Consider using a more efficient sorting algorithm.",
            "Array indexing could be optimized to avoid bounds checking.",
        ],
        _ => &[],
    }
}

fn techniques_for(problem: &Problem) -> Option<&'static [&'static str]> {
    problem.topics.iter().find_map(|topic| {
        let topic = topic.to_lowercase();
        TECHNIQUES
            .iter()
            .find(|(keywords, _)| keywords.iter().any(|k| topic.contains(k)))
            .map(|(_, techniques)| *techniques)
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub time_complexity: String,
    pub space_complexity: String,
    pub approach: String,
    pub optimizations: Vec<String>,
    /// Empty for languages without notes
    pub language_note: String,
}

impl Feedback {
    pub fn synthesize<R: Rng + ?Sized>(
        problem: &Problem,
        language: &str,
        passed: usize,
        total: usize,
        rng: &mut R,
    ) -> Self {
        let time_complexity = pick(time_complexities(problem.difficulty), rng);
        let space_complexity = pick(SPACE_COMPLEXITIES, rng);

        let technique = techniques_for(problem)
            .map(|t| pick(t, rng))
            .unwrap_or(DEFAULT_TECHNIQUE);
        let approach = pick(APPROACH_TEMPLATES, rng).replace("{technique}", technique);

        let count = if passed < total {
            rng.gen_range(2..=3)
        } else {
            rng.gen_range(0..=2)
        };
        let optimizations = OPTIMIZATIONS
            .choose_multiple(rng, count)
            .map(|s| s.to_string())
            .collect();

        let language_note = language_notes(language)
            .choose(rng)
            .map(|s| s.to_string())
            .unwrap_or_default();

        Self {
            time_complexity: time_complexity.to_string(),
            space_complexity: space_complexity.to_string(),
            approach,
            optimizations,
            language_note,
        }
    }

    /// Markdown rendering
    pub fn render(&self) -> String {
        let optimizations = if self.optimizations.is_empty() {
            WELL_OPTIMIZED.to_string()
        } else {
            self.optimizations
                .iter()
                .map(|o| format!("- {}", o))
                .collect::<Vec<_>>()
                .join("\n")
        };

        format!(
            "# Solution Analysis\n\n\
             ## Time Complexity: {}\n\
             ## Space Complexity: {}\n\n\
             ### Approach:\n{}\n\n\
             ### Optimizations:\n{}\n\n\
             ### Language-specific notes:\n{}",
            self.time_complexity,
            self.space_complexity,
            self.approach,
            optimizations,
            self.language_note
        )
        .trim_end()
        .to_string()
    }
}

fn pick<R: Rng + ?Sized>(choices: &[&'static str], rng: &mut R) -> &'static str {
    choices.choose(rng).copied().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::{BTreeMap, BTreeSet};

    fn problem(difficulty: Difficulty, topics: &[&str]) -> Problem {
        Problem {
            id: "fb".into(),
            title: "Feedback".into(),
            description: "d".into(),
            difficulty,
            topics: topics.iter().map(|t| t.to_string()).collect::<BTreeSet<_>>(),
            hint: None,
            constraints: vec![],
            starter_code: BTreeMap::new(),
            examples: vec![],
        }
    }

    #[test]
    fn test_failing_gets_two_or_three_distinct_optimizations() {
        let problem = problem(Difficulty::Medium, &["Arrays"]);
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let fb = Feedback::synthesize(&problem, "python", 1, 4, &mut rng);
            assert!((2..=3).contains(&fb.optimizations.len()));
            let unique: BTreeSet<_> = fb.optimizations.iter().collect();
            assert_eq!(unique.len(), fb.optimizations.len());
        }
    }

    #[test]
    fn test_passing_gets_at_most_two_optimizations() {
        let problem = problem(Difficulty::Easy, &[]);
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let fb = Feedback::synthesize(&problem, "python", 4, 4, &mut rng);
            assert!(fb.optimizations.len() <= 2);
            assert!(["O(n)", "O(n log n)", "O(1)"].contains(&fb.time_complexity.as_str()));
        }
    }

    #[test]
    fn test_technique_from_topic() {
        let problem = problem(Difficulty::Hard, &["DP"]);
        let fb = Feedback::synthesize(&problem, "cpp", 1, 1, &mut StdRng::seed_from_u64(9));
        assert!(
            fb.approach.contains("dynamic programming")
                || fb.approach.contains("memoization")
        );

        let problem = self::problem(Difficulty::Hard, &["Graphs"]);
        let fb = Feedback::synthesize(&problem, "cpp", 1, 1, &mut StdRng::seed_from_u64(9));
        assert!(fb.approach.contains("algorithmic"));
    }

    #[test]
    fn test_unknown_language_has_empty_note() {
        let problem = problem(Difficulty::Medium, &[]);
        let fb = Feedback::synthesize(&problem, "haskell", 1, 1, &mut StdRng::seed_from_u64(2));
        assert!(fb.language_note.is_empty());
        let fb = Feedback::synthesize(&problem, "C++", 1, 1, &mut StdRng::seed_from_u64(2));
        assert!(!fb.language_note.is_empty());
    }

    #[test]
    fn test_render() {
        let fb = Feedback {
            time_complexity: "O(n)".into(),
            space_complexity: "O(1)".into(),
            approach: "Your solution uses a greedy approach, which works well here.".into(),
            optimizations: vec![],
            language_note: String::new(),
        };
        let text = fb.render();
        assert!(text.starts_with("# Solution Analysis"));
        assert!(text.contains("## Time Complexity: O(n)"));
        assert!(text.contains(WELL_OPTIMIZED));
        assert!(text.ends_with("### Language-specific notes:"));
    }
}
