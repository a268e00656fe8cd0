//! Response parser - turns loosely templated model output into a `Problem`
//!
//! The parser makes a single forward pass over the lines of the raw text.
//! Every line is first classified by [`classify`]: a recognized header maps to
//! a [`Header`], which drives a state transition in [`ResponseParser::apply`];
//! anything else is content for the active section.
//!
//! The parser does NOT:
//! - Fail. Missing or malformed sections are filled from [`defaults`]
//! - Validate that examples are consistent with the description
//! - Assign hidden test cases (see `synthesizer`)

pub mod defaults;
mod test_cases;

use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;
use tracing::debug;

use crate::problem::{Difficulty, Problem, TestCase};
use defaults::{
    default_example, default_starter_code, normalize_language, DEFAULT_CONSTRAINT,
    DEFAULT_DESCRIPTION, DEFAULT_TITLE, STARTER_LANGUAGES,
};

pub use test_cases::parse_test_cases;

/// Language used for a code block that names no language at all
const FALLBACK_CODE_LANGUAGE: &str = "python";

/// Section currently being collected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    None,
    Description,
    Example,
    Constraints,
    StarterCode,
}

/// A recognized header line
#[derive(Debug, Clone, PartialEq)]
pub enum Header {
    Title(String),
    Difficulty(Difficulty),
    Topics(Vec<String>),
    Hint(String),
    /// `Description:` with any text that followed the colon
    Description(String),
    /// `Examples:` section marker
    Examples,
    /// `Example N:` block start
    Example,
    Input(String),
    Output(String),
    Explanation(String),
    Constraints,
    /// `Starter Code:` or a language header such as `Python:`
    StarterCode { language: Option<String> },
    /// Opening or closing ``` marker
    Fence { language: Option<String> },
}

fn numbered_title_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+\.\s+(\S.*)$").expect("valid title pattern"))
}

fn example_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^example(\s*\d+)?\s*:").expect("valid example pattern"))
}

/// Case-insensitive keyword prefix match, returning the trimmed remainder
pub(crate) fn strip_keyword<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    let head = line.get(..keyword.len())?;
    if head.eq_ignore_ascii_case(keyword) {
        Some(line[keyword.len()..].trim())
    } else {
        None
    }
}

/// `Python:`, `C++:` and friends on a line of their own
fn language_header(line: &str) -> Option<String> {
    let name = line.strip_suffix(':')?.trim();
    match name.to_lowercase().as_str() {
        "c++" | "cpp" | "java" | "python" | "python3" | "c" | "javascript" => {
            Some(normalize_language(name))
        }
        _ => None,
    }
}

fn strip_bullet(line: &str) -> &str {
    line.trim()
        .trim_start_matches(&['-', '*', '•'][..])
        .trim()
}

/// Classify one line given the current parser state.
///
/// Inside an open code fence only the closing fence is a header. Inside an
/// unfenced starter-code block only code-related headers are recognized, so
/// source lines are never mistaken for sections.
pub fn classify(line: &str, state: ParseState, fence_open: bool) -> Option<Header> {
    let trimmed = line.trim();

    if let Some(info) = trimmed.strip_prefix("```") {
        let info = info.trim();
        let language = if info.is_empty() {
            None
        } else {
            Some(normalize_language(info))
        };
        return Some(Header::Fence { language });
    }
    if fence_open {
        return None;
    }

    let key = trimmed.trim_start_matches('#').trim();
    if key.is_empty() {
        return None;
    }

    if strip_keyword(key, "Starter Code:").is_some() {
        return Some(Header::StarterCode { language: None });
    }
    if let Some(language) = language_header(key) {
        return Some(Header::StarterCode {
            language: Some(language),
        });
    }
    if state == ParseState::StarterCode {
        return None;
    }

    if let Some(rest) = strip_keyword(key, "Title:") {
        return Some(Header::Title(rest.to_string()));
    }
    if let Some(rest) = strip_keyword(key, "Difficulty:") {
        return Some(Header::Difficulty(Difficulty::normalize(rest)));
    }
    if let Some(rest) = strip_keyword(key, "Topics:") {
        let topics = rest
            .split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        return Some(Header::Topics(topics));
    }
    if let Some(rest) = strip_keyword(key, "Hint:") {
        return Some(Header::Hint(rest.to_string()));
    }
    if let Some(rest) = strip_keyword(key, "Description:") {
        return Some(Header::Description(rest.to_string()));
    }
    if strip_keyword(key, "Examples:").is_some() {
        return Some(Header::Examples);
    }
    if example_header_re().is_match(key) {
        return Some(Header::Example);
    }
    if strip_keyword(key, "Constraints:").is_some() {
        return Some(Header::Constraints);
    }

    if let Some(rest) = strip_keyword(key, "Input:") {
        if matches!(
            state,
            ParseState::Example | ParseState::None | ParseState::Description
        ) {
            return Some(Header::Input(rest.to_string()));
        }
    }
    if state == ParseState::Example {
        if let Some(rest) = strip_keyword(key, "Output:") {
            return Some(Header::Output(rest.to_string()));
        }
        if let Some(rest) = strip_keyword(key, "Explanation:") {
            return Some(Header::Explanation(rest.to_string()));
        }
    }

    if state == ParseState::None {
        if let Some(difficulty) = Difficulty::parse(key) {
            return Some(Header::Difficulty(difficulty));
        }
        if let Some(caps) = numbered_title_re().captures(key) {
            return Some(Header::Title(caps[1].trim().to_string()));
        }
    }

    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExampleField {
    Input,
    Output,
    Explanation,
}

/// Example block under construction
#[derive(Debug, Default)]
pub(crate) struct ExampleDraft {
    input: Option<String>,
    output: Option<String>,
    explanation: Option<String>,
    last: Option<ExampleField>,
}

fn append_line(slot: &mut Option<String>, line: &str, separator: &str) {
    match slot {
        Some(existing) if !existing.is_empty() => {
            existing.push_str(separator);
            existing.push_str(line);
        }
        _ => *slot = Some(line.to_string()),
    }
}

impl ExampleDraft {
    pub(crate) fn set_input(&mut self, value: &str) {
        self.input = Some(value.to_string());
        self.last = Some(ExampleField::Input);
    }

    pub(crate) fn set_output(&mut self, value: &str) {
        self.output = Some(value.to_string());
        self.last = Some(ExampleField::Output);
    }

    pub(crate) fn set_explanation(&mut self, value: &str) {
        self.explanation = Some(value.to_string());
        self.last = Some(ExampleField::Explanation);
    }

    pub(crate) fn has_input(&self) -> bool {
        self.input.is_some()
    }

    /// Continuation line: extends whichever field was set last
    pub(crate) fn extend(&mut self, line: &str) {
        match self.last {
            Some(ExampleField::Input) => append_line(&mut self.input, line, "\n"),
            Some(ExampleField::Output) => append_line(&mut self.output, line, "\n"),
            Some(ExampleField::Explanation) => append_line(&mut self.explanation, line, " "),
            None => {}
        }
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.input.is_some() && self.output.is_some()
    }

    pub(crate) fn into_test_case(self) -> Option<TestCase> {
        let (Some(input), Some(output)) = (self.input, self.output) else {
            return None;
        };
        let mut case = TestCase::new(input.trim(), output.trim());
        case.explanation = self
            .explanation
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());
        Some(case)
    }
}

/// Starter-code block under construction
#[derive(Debug)]
struct CodeDraft {
    language: Option<String>,
    lines: Vec<String>,
    fenced: bool,
}

impl CodeDraft {
    fn is_blank(&self) -> bool {
        self.lines.iter().all(|l| l.trim().is_empty())
    }
}

/// Line-driven state machine over model output
#[derive(Debug)]
pub struct ResponseParser {
    state: ParseState,
    title: Option<String>,
    difficulty: Option<Difficulty>,
    topics: BTreeSet<String>,
    hint: Option<String>,
    description: Option<String>,
    description_buf: Vec<String>,
    examples: Vec<TestCase>,
    current_example: Option<ExampleDraft>,
    constraints: Vec<String>,
    starter_code: BTreeMap<String, String>,
    code: Option<CodeDraft>,
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseParser {
    pub fn new() -> Self {
        Self {
            state: ParseState::None,
            title: None,
            difficulty: None,
            topics: BTreeSet::new(),
            hint: None,
            description: None,
            description_buf: Vec::new(),
            examples: Vec::new(),
            current_example: None,
            constraints: Vec::new(),
            starter_code: BTreeMap::new(),
            code: None,
        }
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    fn fence_open(&self) -> bool {
        self.state == ParseState::StarterCode && self.code.as_ref().is_some_and(|c| c.fenced)
    }

    /// Feed one line of raw text
    pub fn feed_line(&mut self, line: &str) {
        match classify(line, self.state, self.fence_open()) {
            Some(header) => self.apply(header),
            None => self.push_content(line),
        }
    }

    /// Apply a header: transition state and run the matching flush action
    pub fn apply(&mut self, header: Header) {
        match header {
            Header::Title(title) => {
                self.transition(ParseState::None);
                if self.title.is_none() && !title.is_empty() {
                    self.title = Some(title);
                }
            }
            Header::Difficulty(difficulty) => {
                self.transition(ParseState::None);
                self.difficulty.get_or_insert(difficulty);
            }
            Header::Topics(topics) => {
                self.transition(ParseState::None);
                self.topics.extend(topics);
            }
            Header::Hint(hint) => {
                self.transition(ParseState::None);
                if !hint.is_empty() {
                    self.hint = Some(hint);
                }
            }
            Header::Description(rest) => {
                self.transition(ParseState::Description);
                if !rest.is_empty() {
                    self.description_buf.push(rest);
                }
            }
            Header::Examples => self.transition(ParseState::Example),
            Header::Example => {
                self.flush_example();
                self.transition(ParseState::Example);
                self.current_example = Some(ExampleDraft::default());
            }
            Header::Input(rest) => {
                self.transition(ParseState::Example);
                if self.current_example.as_ref().is_some_and(|d| d.has_input()) {
                    self.flush_example();
                }
                self.current_example
                    .get_or_insert_with(ExampleDraft::default)
                    .set_input(&rest);
            }
            Header::Output(rest) => {
                self.current_example
                    .get_or_insert_with(ExampleDraft::default)
                    .set_output(&rest);
            }
            Header::Explanation(rest) => {
                self.current_example
                    .get_or_insert_with(ExampleDraft::default)
                    .set_explanation(&rest);
            }
            Header::Constraints => self.transition(ParseState::Constraints),
            Header::StarterCode { language } => {
                self.flush_code();
                self.transition(ParseState::StarterCode);
                self.code = Some(CodeDraft {
                    language,
                    lines: Vec::new(),
                    fenced: false,
                });
            }
            Header::Fence { language } => {
                if self.fence_open() {
                    self.flush_code();
                    self.transition(ParseState::None);
                    return;
                }
                // An opening fence right after a language header continues that block
                let inherited = match self.code.take() {
                    Some(draft) if draft.is_blank() => draft.language,
                    Some(draft) => {
                        self.code = Some(draft);
                        self.flush_code();
                        None
                    }
                    None => None,
                };
                self.transition(ParseState::StarterCode);
                self.code = Some(CodeDraft {
                    language: language.or(inherited),
                    lines: Vec::new(),
                    fenced: true,
                });
            }
        }
    }

    fn push_content(&mut self, line: &str) {
        match self.state {
            ParseState::None => {}
            ParseState::Description => self.description_buf.push(line.trim_end().to_string()),
            ParseState::Example => {
                let line = line.trim();
                if line.is_empty() {
                    return;
                }
                if let Some(draft) = self.current_example.as_mut() {
                    draft.extend(line);
                }
            }
            ParseState::Constraints => {
                let constraint = strip_bullet(line);
                if !constraint.is_empty() {
                    self.constraints.push(constraint.to_string());
                }
            }
            ParseState::StarterCode => {
                if let Some(code) = self.code.as_mut() {
                    code.lines.push(line.trim_end().to_string());
                }
            }
        }
    }

    fn transition(&mut self, next: ParseState) {
        if self.state != next {
            match self.state {
                ParseState::Description => self.flush_description(),
                ParseState::Example => self.flush_example(),
                ParseState::StarterCode => self.flush_code(),
                ParseState::None | ParseState::Constraints => {}
            }
        }
        self.state = next;
    }

    fn flush_description(&mut self) {
        let text = self.description_buf.join("\n");
        self.description_buf.clear();
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        match self.description.as_mut() {
            Some(existing) => {
                existing.push_str("\n\n");
                existing.push_str(text);
            }
            None => self.description = Some(text.to_string()),
        }
    }

    fn flush_example(&mut self) {
        let Some(draft) = self.current_example.take() else {
            return;
        };
        if !draft.is_complete() {
            debug!("Discarding example without both input and output");
            return;
        }
        if let Some(case) = draft.into_test_case() {
            self.examples.push(case);
        }
    }

    fn flush_code(&mut self) {
        let Some(draft) = self.code.take() else {
            return;
        };
        let text = draft.lines.join("\n");
        let text = text.trim_start_matches('\n').trim_end();
        if text.trim().is_empty() {
            return;
        }
        let language = draft
            .language
            .unwrap_or_else(|| FALLBACK_CODE_LANGUAGE.to_string());
        self.starter_code
            .entry(language)
            .or_insert_with(|| text.to_string());
    }

    /// Close any open section and build the problem, filling defaults
    pub fn finish(mut self) -> Problem {
        self.transition(ParseState::None);

        let mut defaulted = Vec::new();
        let title = self.title.unwrap_or_else(|| {
            defaulted.push("title");
            DEFAULT_TITLE.to_string()
        });
        let difficulty = self.difficulty.unwrap_or_else(|| {
            defaulted.push("difficulty");
            Difficulty::default()
        });
        let description = self.description.unwrap_or_else(|| {
            defaulted.push("description");
            DEFAULT_DESCRIPTION.to_string()
        });
        if self.examples.is_empty() {
            defaulted.push("examples");
            self.examples.push(default_example());
        }
        if self.constraints.is_empty() {
            defaulted.push("constraints");
            self.constraints.push(DEFAULT_CONSTRAINT.to_string());
        }
        for language in STARTER_LANGUAGES {
            if !self.starter_code.contains_key(language) {
                if let Some(stub) = default_starter_code(language) {
                    self.starter_code.insert(language.to_string(), stub.to_string());
                }
            }
        }

        if !defaulted.is_empty() {
            debug!("Sections filled from defaults: {}", defaulted.join(", "));
        }

        Problem {
            id: uuid::Uuid::new_v4().to_string(),
            title,
            description,
            difficulty,
            topics: self.topics,
            hint: self.hint,
            constraints: self.constraints,
            starter_code: self.starter_code,
            examples: self.examples,
        }
    }
}

/// Parse raw generation text into a complete `Problem`. Never fails.
pub fn parse_problem(raw: &str) -> Problem {
    let mut parser = ResponseParser::new();
    for line in raw.lines() {
        parser.feed_line(line);
    }
    let problem = parser.finish();
    debug!(
        "Parsed problem '{}' ({}, {} examples, {} constraints)",
        problem.title,
        problem.difficulty,
        problem.examples.len(),
        problem.constraints.len()
    );
    problem
}
