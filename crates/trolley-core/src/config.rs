use crate::errors::ConfigError;
use crate::model::{Problem, Provider};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const SUPPORTED_PROBLEMS_VERSION: u32 = 1;

#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub api_base: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub db_path: PathBuf,
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_base: crate::providers::llm::openai::DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout_secs: 120,
            db_path: PathBuf::from(".trolley/trolley.db"),
            log_level: "info".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|k| env::var(k).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();
        if let Some(v) = lookup("TROLLEY_API_BASE") {
            cfg.api_base = v;
        }
        cfg.api_key = lookup("TROLLEY_API_KEY")
            .or_else(|| lookup("OPENAI_API_KEY"))
            .filter(|k| !k.trim().is_empty());
        if let Some(v) = lookup("TROLLEY_TIMEOUT_SECS") {
            if let Ok(n) = v.parse::<u64>() {
                if n > 0 {
                    cfg.timeout_secs = n;
                }
            }
        }
        if let Some(v) = lookup("TROLLEY_DB") {
            cfg.db_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("TROLLEY_LOG") {
            cfg.log_level = v;
        }
        cfg
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Problem battery as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemSet {
    #[serde(default)]
    pub version: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub providers: Vec<Provider>,
    pub problems: Vec<Problem>,
}

pub fn load_problems(path: &Path) -> Result<ProblemSet, ConfigError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ConfigError(format!("failed to read problems {}: {}", path.display(), e)))?;
    parse_problems(&raw).map_err(|e| ConfigError(format!("{} (file: {})", e.0, path.display())))
}

pub fn parse_problems(raw: &str) -> Result<ProblemSet, ConfigError> {
    let mut ignored_keys = std::collections::BTreeSet::new();
    let deserializer = serde_yaml::Deserializer::from_str(raw);
    let set: ProblemSet = serde_ignored::deserialize(deserializer, |path| {
        ignored_keys.insert(path.to_string());
    })
    .map_err(|e| ConfigError(format!("failed to parse YAML: {}", e)))?;

    if !ignored_keys.is_empty() {
        tracing::warn!(
            event = "config.unknown_fields",
            fields = ?ignored_keys,
            "ignored unknown fields in problem set"
        );
    }

    if set.version != SUPPORTED_PROBLEMS_VERSION {
        return Err(ConfigError(format!(
            "unsupported problems version {} (supported: {})",
            set.version, SUPPORTED_PROBLEMS_VERSION
        )));
    }
    if set.problems.is_empty() {
        return Err(ConfigError("problem set has no problems".into()));
    }

    let mut seen = std::collections::HashSet::new();
    for p in &set.problems {
        if p.id.trim().is_empty() {
            return Err(ConfigError("problem with empty id".into()));
        }
        if p.text.trim().is_empty() {
            return Err(ConfigError(format!("problem '{}' has empty text", p.id)));
        }
        if !seen.insert(p.id.as_str()) {
            return Err(ConfigError(format!("duplicate problem id '{}'", p.id)));
        }
    }

    Ok(set)
}

pub fn write_sample_problems(path: &Path) -> Result<(), ConfigError> {
    std::fs::write(path, SAMPLE_PROBLEMS)
        .map_err(|e| ConfigError(format!("failed to write sample problems: {}", e)))
}

pub const SAMPLE_PROBLEMS: &str = r#"version: 1
problems:
  - id: classic
    title: The classic trolley
    text: >
      A runaway trolley is heading down the track towards five people who cannot move.
      You are standing next to a lever. If you pull it, the trolley switches to a side
      track where it will kill one person instead.
    human_pull_votes: 82
    human_nothing_votes: 18
  - id: self-sacrifice
    title: Yourself on the side track
    text: >
      A runaway trolley is heading towards five people. Pulling the lever diverts it onto
      a side track where you yourself are tied down.
    human_pull_votes: 40
    human_nothing_votes: 60
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn env_overrides_defaults() {
        let vars: HashMap<&str, &str> = [
            ("TROLLEY_API_BASE", "http://localhost:9999/v1"),
            ("OPENAI_API_KEY", "sk-fallback"),
            ("TROLLEY_TIMEOUT_SECS", "15"),
            ("TROLLEY_DB", "/tmp/t.db"),
        ]
        .into_iter()
        .collect();
        let cfg = EngineConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.api_base, "http://localhost:9999/v1");
        assert_eq!(cfg.api_key.as_deref(), Some("sk-fallback"));
        assert_eq!(cfg.timeout(), Duration::from_secs(15));
        assert_eq!(cfg.db_path, PathBuf::from("/tmp/t.db"));
        assert_eq!(cfg.log_level, "info");
    }

    #[test]
    fn invalid_timeout_keeps_default() {
        let cfg = EngineConfig::from_lookup(|k| (k == "TROLLEY_TIMEOUT_SECS").then(|| "0".into()));
        assert_eq!(cfg.timeout_secs, 120);
    }

    #[test]
    fn sample_parses() {
        let set = parse_problems(SAMPLE_PROBLEMS).unwrap();
        assert_eq!(set.problems.len(), 2);
        assert_eq!(set.problems[0].human_pull_votes, 82);
    }

    #[test]
    fn rejects_bad_sets() {
        let dup = "version: 1\nproblems:\n  \
                   - {id: a, title: A, text: x}\n  \
                   - {id: a, title: B, text: y}\n";
        assert!(parse_problems(dup).unwrap_err().0.contains("duplicate"));

        let wrong_version = "version: 7\nproblems:\n  - {id: a, title: A, text: x}\n";
        assert!(parse_problems(wrong_version).unwrap_err().0.contains("unsupported"));

        assert!(parse_problems("version: 1\nproblems: []\n").is_err());

        let negative =
            "version: 1\nproblems:\n  - {id: a, title: A, text: x, human_pull_votes: -3}\n";
        assert!(parse_problems(negative).is_err());
    }
}
