//! `<RUNLOOP_HOME>/config.toml`
//!
//! ```toml
//! [pipeline]
//! log_dir = "./logs"
//! model = "gpt-4o-2024-08-06"
//! swarm = 1
//!
//! [classifier]
//! command = "classify-artifact"
//! args = ["--effort", "low"]
//!
//! [drift]
//! runs_dir = "./runs"
//! ```
//!
//! Every key is optional. Command-line flags take precedence.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunloopConfig {
    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub classifier: ClassifierConfig,

    #[serde(default)]
    pub drift: DriftConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Root under which each run gets its own directory
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// Model label passed to the classifier and recorded in `final.json`
    #[serde(default = "default_model")]
    pub model: String,

    /// Classifier calls per run
    #[serde(default = "default_swarm")]
    pub swarm: usize,
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("./logs")
}

fn default_model() -> String {
    "gpt-4o-2024-08-06".to_string()
}

fn default_swarm() -> usize {
    1
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            model: default_model(),
            swarm: default_swarm(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// External classifier program
    #[serde(default)]
    pub command: Option<String>,

    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftConfig {
    #[serde(default = "default_runs_dir")]
    pub runs_dir: PathBuf,
}

fn default_runs_dir() -> PathBuf {
    PathBuf::from("./runs")
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            runs_dir: default_runs_dir(),
        }
    }
}

impl RunloopConfig {
    /// Load from a file. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content).map_err(|e| match e {
            ConfigError::ParseError { source, .. } => ConfigError::ParseError {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: RunloopConfig =
            toml::from_str(content).map_err(|source| ConfigError::ParseError {
                path: PathBuf::new(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `<RUNLOOP_HOME>/config.toml`.
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load(&runloop_logging::config_path())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pipeline.swarm == 0 {
            return Err(ConfigError::Invalid("pipeline.swarm must be >= 1".to_string()));
        }
        if self.pipeline.model.trim().is_empty() {
            return Err(ConfigError::Invalid("pipeline.model must not be empty".to_string()));
        }
        if let Some(command) = &self.classifier.command {
            if command.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "classifier.command must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = RunloopConfig::from_toml("").unwrap();
        assert_eq!(config.pipeline.swarm, 1);
        assert_eq!(config.pipeline.log_dir, PathBuf::from("./logs"));
        assert_eq!(config.drift.runs_dir, PathBuf::from("./runs"));
        assert!(config.classifier.command.is_none());
    }

    #[test]
    fn test_partial_sections() {
        let config = RunloopConfig::from_toml(
            r#"
[pipeline]
swarm = 3

[classifier]
command = "classify"
args = ["--fast"]
"#,
        )
        .unwrap();
        assert_eq!(config.pipeline.swarm, 3);
        assert_eq!(config.pipeline.model, "gpt-4o-2024-08-06");
        assert_eq!(config.classifier.command.as_deref(), Some("classify"));
        assert_eq!(config.classifier.args, vec!["--fast"]);
    }

    #[test]
    fn test_zero_swarm_rejected() {
        let err = RunloopConfig::from_toml("[pipeline]\nswarm = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_missing_file_is_default() {
        let tmp = tempfile::tempdir().unwrap();
        let config = RunloopConfig::load(&tmp.path().join("config.toml")).unwrap();
        assert_eq!(config.pipeline.swarm, 1);
    }

    #[test]
    fn test_malformed_file_names_path() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[pipeline\n").unwrap();
        match RunloopConfig::load(&path) {
            Err(ConfigError::ParseError { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected parse error, got {:?}", other),
        }
    }
}
