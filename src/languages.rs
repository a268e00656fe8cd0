//! Language configuration for sandboxed execution
//!
//! Only languages listed here can be executed. The built-in table
//! (`files/languages.toml`) carries exactly one entry.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::runner::CommandSpec;

/// Configuration for an executable language
#[derive(Debug, Clone)]
pub struct LanguageConfig {
    /// Canonical language name (e.g., "python")
    pub name: String,
    /// Suffix for the temporary source file (e.g., ".py")
    pub source_suffix: String,
    /// Run command template, `{source}` is replaced with the source path
    pub run_command: CommandSpec,
}

impl LanguageConfig {
    /// Resolve the run command for a concrete source file
    pub fn command_for(&self, source: &Path) -> CommandSpec {
        self.run_command.with_source(source)
    }
}

/// Raw TOML configuration for a language
#[derive(Debug, Deserialize)]
struct RawLanguageConfig {
    source_suffix: String,
    run_command: String,
    #[serde(default)]
    aliases: Vec<String>,
}

/// Language table keyed by lowercase name and alias
#[derive(Debug, Clone, Default)]
pub struct LanguageRegistry {
    languages: HashMap<String, LanguageConfig>,
}

impl LanguageRegistry {
    /// Built-in table compiled into the binary
    pub fn builtin() -> anyhow::Result<Self> {
        let content = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/files/languages.toml"));
        Self::from_toml_str(content).context("Invalid built-in language table")
    }

    /// Load a table from a TOML file
    pub fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read language config {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid language config {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let raw_configs: HashMap<String, RawLanguageConfig> = toml::from_str(content)?;

        let mut languages = HashMap::new();
        for (name, raw) in raw_configs {
            let run_command = CommandSpec::parse(&raw.run_command);
            if run_command.is_empty() {
                anyhow::bail!("Empty run command for {}", name);
            }
            if !raw.run_command.contains("{source}") {
                anyhow::bail!("Run command for {} does not reference {{source}}", name);
            }

            let config = LanguageConfig {
                name: name.to_lowercase(),
                source_suffix: raw.source_suffix,
                run_command,
            };

            // Add aliases
            for alias in raw.aliases {
                languages.insert(alias.to_lowercase(), config.clone());
            }
            // Add main language name
            languages.insert(name.to_lowercase(), config);
        }

        Ok(Self { languages })
    }

    /// Get language configuration by language name or alias
    pub fn get(&self, language: &str) -> Option<&LanguageConfig> {
        self.languages.get(&language.trim().to_lowercase())
    }

    /// Canonical names of all executable languages
    pub fn supported_languages(&self) -> Vec<String> {
        let mut names: Vec<String> = self.languages.values().map(|c| c.name.clone()).collect();
        names.sort();
        names.dedup();
        names
    }

    /// One config per canonical language
    pub fn configs(&self) -> impl Iterator<Item = &LanguageConfig> {
        self.languages
            .iter()
            .filter(|(key, config)| **key == config.name)
            .map(|(_, config)| config)
    }
}
