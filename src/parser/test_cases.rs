//! Parser for extra test cases returned by the text generator
//!
//! The expected shape is a loose list of `Input:` / `Output:` /
//! `Explanation:` lines, optionally separated by `Example N` or
//! `Test Case N` headers. Anything else is a continuation of the last field.

use tracing::debug;

use super::{strip_keyword, ExampleDraft};
use crate::problem::TestCase;

fn flush(draft: ExampleDraft, cases: &mut Vec<TestCase>) {
    if draft.is_complete() {
        cases.extend(draft.into_test_case());
    }
}

fn is_case_separator(line: &str) -> bool {
    let lower = line.to_lowercase();
    lower.starts_with("example") || lower.starts_with("test case")
}

/// Parse generator output into test cases. Returns an empty list when
/// nothing usable is found; cases missing input or output are dropped.
pub fn parse_test_cases(raw: &str) -> Vec<TestCase> {
    let mut cases = Vec::new();
    let mut draft = ExampleDraft::default();

    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(rest) = strip_keyword(line, "Input:") {
            if draft.has_input() {
                flush(std::mem::take(&mut draft), &mut cases);
            }
            draft.set_input(rest);
        } else if let Some(rest) = strip_keyword(line, "Output:") {
            draft.set_output(rest);
        } else if let Some(rest) = strip_keyword(line, "Explanation:") {
            draft.set_explanation(rest);
        } else if is_case_separator(line) {
            flush(std::mem::take(&mut draft), &mut cases);
        } else {
            draft.extend(line);
        }
    }
    flush(draft, &mut cases);

    debug!("Parsed {} generated test cases", cases.len());
    cases
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_numbered_cases() {
        let raw = "Test Case 1:\nInput: n = 4\nOutput: 5\nExplanation: four steps\nTest Case 2:\nInput: n = 5\nOutput: 8\n";
        let cases = parse_test_cases(raw);
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].input, "n = 4");
        assert_eq!(cases[0].explanation.as_deref(), Some("four steps"));
        assert_eq!(cases[1], TestCase::new("n = 5", "8"));
    }

    #[test]
    fn test_consecutive_inputs_split_cases() {
        let raw = "input: a\noutput: b\ninput: c\noutput: d";
        let cases = parse_test_cases(raw);
        assert_eq!(cases, vec![TestCase::new("a", "b"), TestCase::new("c", "d")]);
    }

    #[test]
    fn test_incomplete_and_garbage() {
        assert!(parse_test_cases("Sure! Here are some tests.\nInput: 1\n").is_empty());
        assert!(parse_test_cases("").is_empty());
    }
}
