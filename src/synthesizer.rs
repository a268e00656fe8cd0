//! Hidden test synthesizer
//!
//! Derives extra hidden cases from the first example of a problem by
//! pattern-matching its input text. Expected outputs are NOT recomputed for
//! the mutated input (only a numeric scalar output is scaled); each
//! synthesized case reports this through [`SynthesisKind::output_recomputed`].

use rand::seq::SliceRandom;
use rand::Rng;
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

use crate::parser::defaults::default_example;
use crate::problem::{Problem, TestCase};

/// Prefix added to inputs no pattern could mutate
pub const HIDDEN_MARKER: &str = "Hidden Test: ";
/// Multiplier applied to a scalar `name = <integer>` input
pub const SCALAR_INPUT_FACTOR: i64 = 10;
/// Multiplier applied to a numeric expected output of a scalar case
pub const SCALAR_OUTPUT_FACTOR: i64 = 100;

fn array_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\w+)\s*=\s*\[([^\[\]]*)\]").expect("valid array pattern"))
}

fn scalar_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\w+)\s*=\s*(-?\d+)(?:[^\d.]|$)").expect("valid scalar pattern"))
}

/// How a hidden case was derived
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisKind {
    /// Array literal concatenated with itself and shuffled
    DoubledArray,
    /// Integer input scaled; `output_scaled` when the output was numeric
    ScaledScalar { output_scaled: bool },
    /// Input prefixed with [`HIDDEN_MARKER`]
    Marked,
    /// Problem had no examples at all
    Placeholder,
}

impl SynthesisKind {
    /// Whether the expected output was adjusted for the new input.
    ///
    /// For doubled arrays and marked inputs the template output is copied
    /// as-is, so it may well be wrong for the new input.
    pub fn output_recomputed(&self) -> bool {
        matches!(self, SynthesisKind::ScaledScalar { output_scaled: true })
    }
}

/// A synthesized case along with how it was made
#[derive(Debug, Clone)]
pub struct HiddenCase {
    pub case: TestCase,
    pub kind: SynthesisKind,
}

fn double_array<R: Rng + ?Sized>(input: &str, rng: &mut R) -> Option<String> {
    let caps = array_re().captures(input)?;
    let body = caps.get(2)?;
    let elements: Vec<&str> = body
        .as_str()
        .split(',')
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .collect();
    if elements.is_empty() {
        return None;
    }

    let mut doubled: Vec<&str> = elements.iter().chain(elements.iter()).copied().collect();
    doubled.shuffle(rng);

    Some(format!(
        "{}{}{}",
        &input[..body.start()],
        doubled.join(","),
        &input[body.end()..]
    ))
}

fn scale_scalar(input: &str) -> Option<String> {
    let caps = scalar_re().captures(input)?;
    let value = caps.get(2)?;
    let scaled = value
        .as_str()
        .parse::<i64>()
        .ok()?
        .checked_mul(SCALAR_INPUT_FACTOR)?;

    Some(format!(
        "{}{}{}",
        &input[..value.start()],
        scaled,
        &input[value.end()..]
    ))
}

fn scale_output(output: &str) -> Option<String> {
    output
        .trim()
        .parse::<i64>()
        .ok()?
        .checked_mul(SCALAR_OUTPUT_FACTOR)
        .map(|v| v.to_string())
}

/// Derive one hidden case from the problem's first example
pub fn synthesize<R: Rng + ?Sized>(problem: &Problem, rng: &mut R) -> HiddenCase {
    let Some(template) = problem.examples.first() else {
        return HiddenCase {
            case: default_example().hidden(),
            kind: SynthesisKind::Placeholder,
        };
    };

    let (input, output, kind) = if let Some(input) = double_array(&template.input, rng) {
        (input, template.output.clone(), SynthesisKind::DoubledArray)
    } else if let Some(input) = scale_scalar(&template.input) {
        match scale_output(&template.output) {
            Some(output) => (input, output, SynthesisKind::ScaledScalar { output_scaled: true }),
            None => (
                input,
                template.output.clone(),
                SynthesisKind::ScaledScalar {
                    output_scaled: false,
                },
            ),
        }
    } else {
        (
            format!("{}{}", HIDDEN_MARKER, template.input),
            template.output.clone(),
            SynthesisKind::Marked,
        )
    };

    if !kind.output_recomputed() {
        debug!(
            "Hidden case ({:?}) copies template output '{}' unchanged",
            kind, output
        );
    }

    HiddenCase {
        case: TestCase::new(input, output).hidden(),
        kind,
    }
}

/// Append hidden cases until the problem has at least `min_total` examples.
/// Returns how many were added.
pub fn fill_hidden<R: Rng + ?Sized>(problem: &mut Problem, min_total: usize, rng: &mut R) -> usize {
    let mut added = 0;
    while problem.examples.len() < min_total {
        let hidden = synthesize(problem, rng);
        problem.push_hidden(hidden.case);
        added += 1;
    }
    if added > 0 {
        debug!(
            "Synthesized {} hidden cases for problem {}",
            added, problem.id
        );
    }
    added
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::Difficulty;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::{BTreeMap, BTreeSet};

    fn problem_with(input: &str, output: &str) -> Problem {
        Problem {
            id: "synth".into(),
            title: "Synth".into(),
            description: "d".into(),
            difficulty: Difficulty::Easy,
            topics: BTreeSet::new(),
            hint: None,
            constraints: vec![],
            starter_code: BTreeMap::new(),
            examples: vec![TestCase::new(input, output)],
        }
    }

    fn array_elements(input: &str) -> Vec<i64> {
        let caps = array_re().captures(input).unwrap();
        caps[2].split(',').map(|e| e.trim().parse().unwrap()).collect()
    }

    #[test]
    fn test_two_sum_array_is_doubled() {
        let problem = problem_with("nums = [2,7,11,15], target = 9", "[0,1]");
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let hidden = synthesize(&problem, &mut rng);

            assert_eq!(hidden.kind, SynthesisKind::DoubledArray);
            assert!(hidden.case.is_hidden);
            assert!(hidden.case.input.starts_with("nums = ["));
            assert!(hidden.case.input.ends_with("], target = 9"));

            let mut elements = array_elements(&hidden.case.input);
            elements.sort();
            assert_eq!(elements, vec![2, 2, 7, 7, 11, 11, 15, 15]);
        }
    }

    #[test]
    fn test_array_case_keeps_template_output_unchanged() {
        let problem = problem_with("nums = [2,7,11,15], target = 9", "[0,1]");
        let hidden = synthesize(&problem, &mut StdRng::seed_from_u64(7));
        assert_eq!(hidden.case.output, "[0,1]");
        assert!(!hidden.kind.output_recomputed());
    }

    #[test]
    fn test_scalar_input_and_numeric_output_scaled() {
        let problem = problem_with("n = 3", "3");
        let hidden = synthesize(&problem, &mut StdRng::seed_from_u64(1));
        assert_eq!(hidden.case.input, "n = 30");
        assert_eq!(hidden.case.output, "300");
        assert_eq!(
            hidden.kind,
            SynthesisKind::ScaledScalar {
                output_scaled: true
            }
        );
    }

    #[test]
    fn test_scalar_with_text_output_copies_output() {
        let problem = problem_with("n = 2, mode = fast", "yes");
        let hidden = synthesize(&problem, &mut StdRng::seed_from_u64(1));
        assert_eq!(hidden.case.input, "n = 20, mode = fast");
        assert_eq!(hidden.case.output, "yes");
        assert!(!hidden.kind.output_recomputed());
    }

    #[test]
    fn test_fallback_marks_input() {
        let problem = problem_with("s = \"abc\"", "3");
        let hidden = synthesize(&problem, &mut StdRng::seed_from_u64(1));
        assert_eq!(hidden.case.input, "Hidden Test: s = \"abc\"");
        assert_eq!(hidden.case.output, "3");
        assert_eq!(hidden.kind, SynthesisKind::Marked);
    }

    #[test]
    fn test_nested_array_falls_back() {
        let problem = problem_with("grid = [[1,2],[3,4]]", "10");
        let hidden = synthesize(&problem, &mut StdRng::seed_from_u64(1));
        assert_eq!(hidden.kind, SynthesisKind::Marked);
    }

    #[test]
    fn test_fill_hidden_reaches_minimum() {
        let mut problem = problem_with("n = 2", "2");
        problem.examples.push(TestCase::new("n = 3", "3"));
        let added = fill_hidden(&mut problem, 10, &mut StdRng::seed_from_u64(3));

        assert_eq!(added, 8);
        assert_eq!(problem.examples.len(), 10);
        assert!(problem.examples[..2].iter().all(|e| !e.is_hidden));
        assert!(problem.examples[2..].iter().all(|e| e.is_hidden));
        // Always derived from the first visible example
        assert!(problem.examples[2..].iter().all(|e| e.input == "n = 20"));

        assert_eq!(fill_hidden(&mut problem, 5, &mut StdRng::seed_from_u64(3)), 0);
    }

    #[test]
    fn test_empty_problem_gets_placeholder() {
        let mut problem = problem_with("x", "y");
        problem.examples.clear();
        let hidden = synthesize(&problem, &mut StdRng::seed_from_u64(0));
        assert_eq!(hidden.kind, SynthesisKind::Placeholder);
        assert!(hidden.case.is_hidden);
    }
}
