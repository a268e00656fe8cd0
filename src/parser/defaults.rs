//! Fallback values for sections the parser could not locate

use crate::problem::TestCase;

pub const DEFAULT_TITLE: &str = "Untitled Problem";
pub const DEFAULT_DESCRIPTION: &str = "No description provided.";
pub const DEFAULT_CONSTRAINT: &str = "No constraints provided";
pub const DEFAULT_EXAMPLE_INPUT: &str = "sample input";
pub const DEFAULT_EXAMPLE_OUTPUT: &str = "sample output";

/// Languages that always get starter code, stubbed when the text has none
pub const STARTER_LANGUAGES: [&str; 4] = ["cpp", "java", "python", "c"];

pub fn default_example() -> TestCase {
    TestCase::new(DEFAULT_EXAMPLE_INPUT, DEFAULT_EXAMPLE_OUTPUT)
}

/// Minimal boilerplate for a starter language
pub fn default_starter_code(language: &str) -> Option<&'static str> {
    match language {
        "cpp" => Some("class Solution {\npublic:\n    // Implement your solution here\n};"),
        "java" => Some("class Solution {\n    // Implement your solution here\n}"),
        "python" => Some("class Solution:\n    # Implement your solution here\n    pass"),
        "c" => Some("// Implement your solution here"),
        _ => None,
    }
}

/// Canonical tag for a language name as it appears in headers and fences
pub fn normalize_language(tag: &str) -> String {
    let tag = tag.trim().to_lowercase();
    match tag.as_str() {
        "c++" | "cpp" | "cc" | "cxx" => "cpp".to_string(),
        "python" | "python3" | "py" => "python".to_string(),
        "javascript" | "js" => "javascript".to_string(),
        _ => tag,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_starter_language_has_a_stub() {
        for lang in STARTER_LANGUAGES {
            assert!(default_starter_code(lang).is_some(), "missing stub for {}", lang);
        }
        assert!(default_starter_code("cobol").is_none());
    }

    #[test]
    fn test_normalize_language() {
        assert_eq!(normalize_language("C++"), "cpp");
        assert_eq!(normalize_language("Python3"), "python");
        assert_eq!(normalize_language("Java"), "java");
        assert_eq!(normalize_language("rust"), "rust");
    }
}
