//! Engine configuration loaded from `quizpilot.yml`.
//!
//! Every section defaults, so a partial file (or none at all) is valid:
//!
//! ```yaml
//! bank:
//!   path: master_qa_bank.json
//! retries:
//!   max_rounds: 3
//! delays:
//!   post_submit: 1000
//! stop_at_identity: "Quiz complete"
//! ```

use quizpilot_proto::Letter;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "quizpilot.yml";

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub bank: BankConfig,
    pub retries: RetryConfig,
    pub delays: DelayConfig,
    pub startup: StartupConfig,

    /// Option letters expected on screen, in order.
    pub alphabet: String,

    /// Ends the run cleanly when this question appears.
    pub stop_at_identity: Option<String>,

    /// Parent directory of per-run output directories.
    pub output_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bank: BankConfig::default(),
            retries: RetryConfig::default(),
            delays: DelayConfig::default(),
            startup: StartupConfig::default(),
            alphabet: "ABCD".to_string(),
            stop_at_identity: None,
            output_dir: PathBuf::from("runs"),
        }
    }
}

/// Knowledge bank reuse and persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BankConfig {
    /// Try recorded answers before brute force.
    pub enabled: bool,
    pub path: PathBuf,
    /// Write the in-memory bank back to `path` at shutdown.
    pub save_on_exit: bool,
}

impl Default for BankConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from("master_qa_bank.json"),
            save_on_exit: true,
        }
    }
}

/// Attempt and round bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Full bank-then-brute-force rounds per question.
    pub max_rounds: u32,
    /// Click/verify cycles per desired selection.
    pub verify_attempts: u32,
    /// Scroll gestures tried while looking for the submit control.
    pub max_scroll_attempts: u32,
    /// Consecutive unreadable observations before giving up; unlimited if unset.
    pub max_consecutive_probe_failures: Option<u32>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_rounds: 3,
            verify_attempts: 2,
            max_scroll_attempts: 3,
            max_consecutive_probe_failures: None,
        }
    }
}

/// Settle delays in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelayConfig {
    pub startup_grace: u64,
    pub activation: u64,
    pub post_click: u64,
    pub verify_settle: u64,
    pub post_scroll: u64,
    pub post_submit: u64,
    pub no_change_poll: u64,
    pub probe_retry: u64,
    pub between_rounds: u64,
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            startup_grace: 3000,
            activation: 1000,
            post_click: 600,
            verify_settle: 500,
            post_scroll: 1500,
            post_submit: 1000,
            no_change_poll: 2000,
            probe_retry: 3000,
            between_rounds: 1500,
        }
    }
}

impl DelayConfig {
    /// All delays zero; used by simulations and tests.
    pub fn immediate() -> Self {
        Self {
            startup_grace: 0,
            activation: 0,
            post_click: 0,
            verify_settle: 0,
            post_scroll: 0,
            post_submit: 0,
            no_change_poll: 0,
            probe_retry: 0,
            between_rounds: 0,
        }
    }

    pub fn startup_grace(&self) -> Duration {
        Duration::from_millis(self.startup_grace)
    }

    pub fn activation(&self) -> Duration {
        Duration::from_millis(self.activation)
    }

    pub fn post_click(&self) -> Duration {
        Duration::from_millis(self.post_click)
    }

    pub fn verify_settle(&self) -> Duration {
        Duration::from_millis(self.verify_settle)
    }

    pub fn post_scroll(&self) -> Duration {
        Duration::from_millis(self.post_scroll)
    }

    pub fn post_submit(&self) -> Duration {
        Duration::from_millis(self.post_submit)
    }

    pub fn no_change_poll(&self) -> Duration {
        Duration::from_millis(self.no_change_poll)
    }

    pub fn probe_retry(&self) -> Duration {
        Duration::from_millis(self.probe_retry)
    }

    pub fn between_rounds(&self) -> Duration {
        Duration::from_millis(self.between_rounds)
    }
}

/// Warm-up performed before the first question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StartupConfig {
    /// Click the submit control once to focus the target window.
    pub activate_window: bool,
    /// Require every alphabet marker to be visible before starting.
    pub validate_markers: bool,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            activate_window: true,
            validate_markers: true,
        }
    }
}

impl EngineConfig {
    /// Parses YAML and validates the result.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Reads `path` if it exists, otherwise returns defaults.
    pub fn from_file_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Rejects settings the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retries.max_rounds == 0 {
            return Err(ConfigError::Invalid("retries.max_rounds must be at least 1".into()));
        }
        if self.retries.verify_attempts == 0 {
            return Err(ConfigError::Invalid(
                "retries.verify_attempts must be at least 1".into(),
            ));
        }
        if self.retries.max_consecutive_probe_failures == Some(0) {
            return Err(ConfigError::Invalid(
                "retries.max_consecutive_probe_failures must be at least 1 when set".into(),
            ));
        }
        self.alphabet_letters()?;
        Ok(())
    }

    /// The configured alphabet as letters.
    pub fn alphabet_letters(&self) -> Result<Vec<Letter>, ConfigError> {
        if self.alphabet.is_empty() {
            return Err(ConfigError::Invalid("alphabet must not be empty".into()));
        }
        let letters = Letter::parse_all(&self.alphabet)
            .map_err(|e| ConfigError::Invalid(format!("alphabet: {e}")))?;
        let unique: BTreeSet<_> = letters.iter().collect();
        if unique.len() != letters.len() {
            return Err(ConfigError::Invalid(format!(
                "alphabet {:?} contains duplicate letters",
                self.alphabet
            )));
        }
        Ok(letters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_yields_defaults() {
        let config = EngineConfig::from_yaml("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.retries.max_rounds, 3);
        assert_eq!(config.delays.post_click(), Duration::from_millis(600));
    }

    #[test]
    fn test_partial_yaml_overrides_only_given_fields() {
        let yaml = r#"
bank:
  enabled: false
retries:
  max_rounds: 5
stop_at_identity: "Quiz complete"
"#;
        let config = EngineConfig::from_yaml(yaml).unwrap();
        assert!(!config.bank.enabled);
        assert_eq!(config.bank.path, PathBuf::from("master_qa_bank.json"));
        assert_eq!(config.retries.max_rounds, 5);
        assert_eq!(config.retries.verify_attempts, 2);
        assert_eq!(config.stop_at_identity.as_deref(), Some("Quiz complete"));
    }

    #[test]
    fn test_validate_rejects_zero_rounds() {
        let err = EngineConfig::from_yaml("retries:\n  max_rounds: 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_validate_rejects_bad_alphabet() {
        assert!(EngineConfig::from_yaml("alphabet: \"AB1\"").is_err());
        assert!(EngineConfig::from_yaml("alphabet: \"ABA\"").is_err());
        assert!(EngineConfig::from_yaml("alphabet: \"\"").is_err());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config =
            EngineConfig::from_file_or_default(Path::new("/nonexistent/quizpilot.yml")).unwrap();
        assert_eq!(config, EngineConfig::default());
    }
}
