//! Text generator collaborator
//!
//! The model behind problem generation is an external program. It receives
//! a prompt on stdin and answers with free text on stdout; the response
//! parser turns that text into a `Problem`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, info};

use crate::problem::{Difficulty, Problem};
use crate::runner::{CommandSpec, TrustedRunner};

/// Number of extra cases requested per generated problem
pub const EXTRA_TEST_CASES: usize = 10;

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Raw problem text following the section template
    async fn generate_problem(&self, topic: &str, difficulty: Difficulty) -> Result<String>;

    /// Raw list of additional `Input:`/`Output:` cases for a parsed problem
    async fn generate_test_cases(&self, problem: &Problem) -> Result<String>;
}

pub fn problem_prompt(topic: &str, difficulty: Difficulty) -> String {
    format!(
        r#"Generate a {difficulty} level coding problem about {topic} in LeetCode format.

The problem should include:
1. A problem number (e.g., 3375)
2. A clear title
3. A detailed description with the problem statement
4. 2-3 examples with inputs, outputs, and explanations
5. Constraints on input sizes and values
6. Starter code for C++, Java, Python, and C

Follow this format:

Title: [title]
Difficulty: {difficulty}
Topics: [comma separated topics]

Description:
[detailed problem description]

Examples:
Example 1:
Input: [format exactly as it would appear in LeetCode]
Output: [expected output]
Explanation: [explain the solution]

Example 2:
Input: [another example input]
Output: [expected output]
Explanation: [explanation]

Constraints:
- [constraint 1]
- [constraint 2]

Provide starter code templates for the following languages:

C++:
```cpp
[starter code]
```

Java:
```java
[starter code]
```

Python:
```python
[starter code]
```

C:
```c
[starter code]
```
"#
    )
}

pub fn test_cases_prompt(problem: &Problem) -> Result<String> {
    let examples: Vec<_> = problem.visible_examples().collect();
    let examples = serde_json::to_string_pretty(&examples)?;

    Ok(format!(
        r#"Generate {count} additional test cases for the following coding problem:

Problem: {title}
Description: {description}

Current examples:
{examples}

Generate {count} more test cases in the same format. Each test case should have:
1. Input in the exact same format as the examples
2. Expected output
3. Brief explanation if necessary

Use this layout for every test case:
Test Case N:
Input: ...
Output: ...
Explanation: ...

Make sure the test cases cover edge cases, large inputs, and special scenarios.
"#,
        count = EXTRA_TEST_CASES,
        title = problem.title,
        description = problem.description,
    ))
}

/// Generator backed by an external command, e.g. a local llama runner
pub struct CommandGenerator {
    command: CommandSpec,
    runner: TrustedRunner,
}

impl CommandGenerator {
    pub fn new(command_line: &str, timeout_secs: u64) -> Result<Self> {
        let command = CommandSpec::parse(command_line);
        if command.is_empty() {
            anyhow::bail!("GENERATOR_COMMAND is empty");
        }
        info!("Using text generator command: {}", command.program);
        Ok(Self {
            command,
            runner: TrustedRunner::new(timeout_secs),
        })
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let output = self
            .runner
            .execute(&self.command, prompt)
            .await
            .context("Text generator failed to run")?;

        if !output.success {
            anyhow::bail!(
                "Text generator exited with code {}: {}",
                output.exit_code,
                output.stderr.trim()
            );
        }
        if output.stdout.trim().is_empty() {
            anyhow::bail!("Text generator returned no text");
        }
        debug!("Text generator returned {} bytes", output.stdout.len());
        Ok(output.stdout)
    }
}

#[async_trait]
impl TextGenerator for CommandGenerator {
    async fn generate_problem(&self, topic: &str, difficulty: Difficulty) -> Result<String> {
        self.complete(&problem_prompt(topic, difficulty)).await
    }

    async fn generate_test_cases(&self, problem: &Problem) -> Result<String> {
        let prompt = test_cases_prompt(problem)?;
        self.complete(&prompt).await
    }
}
