//! Worker configuration
//!
//! Loaded once at start-up from the environment (`.env` is read by `main`
//! before this runs). Malformed numbers abort start-up.

use anyhow::{Context, Result};
use std::path::PathBuf;

pub const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";
pub const DEFAULT_SANDBOX_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_MIN_TEST_CASES: usize = 10;
pub const DEFAULT_HIDDEN_SAMPLE_SIZE: usize = 3;
pub const DEFAULT_GENERATOR_TIMEOUT_SECS: u64 = 120;

/// Worker configuration
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub redis_url: String,
    /// Wall-clock limit per test case run
    pub sandbox_timeout_ms: u64,
    /// Directory for temporary source files
    pub sandbox_dir: PathBuf,
    /// Generated problems are padded with hidden cases up to this count
    pub min_test_cases: usize,
    /// Hidden cases sampled per submission in submit mode
    pub hidden_sample_size: usize,
    /// Optional language table overriding the built-in one
    pub languages_config: Option<PathBuf>,
    /// Optional external text generator command line
    pub generator_command: Option<String>,
    pub generator_timeout_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            redis_url: DEFAULT_REDIS_URL.to_string(),
            sandbox_timeout_ms: DEFAULT_SANDBOX_TIMEOUT_MS,
            sandbox_dir: std::env::temp_dir(),
            min_test_cases: DEFAULT_MIN_TEST_CASES,
            hidden_sample_size: DEFAULT_HIDDEN_SAMPLE_SIZE,
            languages_config: None,
            generator_command: None,
            generator_timeout_secs: DEFAULT_GENERATOR_TIMEOUT_SECS,
        }
    }
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Ok(Self {
            redis_url: get("REDIS_URL").unwrap_or(defaults.redis_url),
            sandbox_timeout_ms: parse_or(
                get("SANDBOX_TIMEOUT_MS"),
                "SANDBOX_TIMEOUT_MS",
                defaults.sandbox_timeout_ms,
            )?,
            sandbox_dir: get("SANDBOX_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.sandbox_dir),
            min_test_cases: parse_or(
                get("MIN_TEST_CASES"),
                "MIN_TEST_CASES",
                defaults.min_test_cases,
            )?,
            hidden_sample_size: parse_or(
                get("HIDDEN_SAMPLE_SIZE"),
                "HIDDEN_SAMPLE_SIZE",
                defaults.hidden_sample_size,
            )?,
            languages_config: get("LANGUAGES_CONFIG").map(PathBuf::from),
            generator_command: get("GENERATOR_COMMAND"),
            generator_timeout_secs: parse_or(
                get("GENERATOR_TIMEOUT_SECS"),
                "GENERATOR_TIMEOUT_SECS",
                defaults.generator_timeout_secs,
            )?,
        })
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: {:?}", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = WorkerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.redis_url, DEFAULT_REDIS_URL);
        assert_eq!(config.sandbox_timeout_ms, 5000);
        assert_eq!(config.min_test_cases, 10);
        assert_eq!(config.hidden_sample_size, 3);
        assert!(config.generator_command.is_none());
        assert!(config.languages_config.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = WorkerConfig::from_lookup(lookup(&[
            ("SANDBOX_TIMEOUT_MS", " 2500 "),
            ("SANDBOX_DIR", "/var/tmp/forge"),
            ("GENERATOR_COMMAND", "llama-cli -m model.gguf"),
            ("HIDDEN_SAMPLE_SIZE", ""),
        ]))
        .unwrap();
        assert_eq!(config.sandbox_timeout_ms, 2500);
        assert_eq!(config.sandbox_dir, PathBuf::from("/var/tmp/forge"));
        assert_eq!(config.generator_command.as_deref(), Some("llama-cli -m model.gguf"));
        assert_eq!(config.hidden_sample_size, 3);
    }

    #[test]
    fn test_invalid_number_is_error() {
        let err = WorkerConfig::from_lookup(lookup(&[("MIN_TEST_CASES", "ten")])).unwrap_err();
        assert!(err.to_string().contains("MIN_TEST_CASES"));
    }
}
