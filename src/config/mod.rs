//! Configuration module
//!
//! Settings for the blocking runner, loadable from a file or the environment.

pub mod env;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use env::EnvConfig;

/// Runner configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Prefix for worker thread names, suffixed with the task index
    pub thread_name: String,

    /// Stack size of worker threads in bytes, platform default if unset
    pub stack_size: Option<usize>,

    /// Run a lone task on the calling thread instead of spawning one
    pub inline_single: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            thread_name: "conc-worker".to_string(),
            stack_size: None,
            inline_single: true,
        }
    }
}

impl RunnerConfig {
    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content =
            std::fs::read_to_string(path.as_ref()).context("Failed to read config file")?;

        let config: Self = if is_yaml(path.as_ref()) {
            serde_yaml::from_str(&content).context("Failed to parse YAML config")?
        } else {
            serde_json::from_str(&content).context("Failed to parse JSON config")?
        };

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = if is_yaml(path.as_ref()) {
            serde_yaml::to_string(self).context("Failed to serialize config")?
        } else {
            serde_json::to_string_pretty(self).context("Failed to serialize config")?
        };

        std::fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Defaults with environment overrides applied
    pub fn from_env() -> Self {
        Self::default().with_env(&EnvConfig::load())
    }

    /// Apply the overrides that are set
    pub fn with_env(mut self, env: &EnvConfig) -> Self {
        if !env.has_any() {
            return self;
        }
        tracing::debug!("Applying environment overrides: {:?}", env);

        if let Some(name) = &env.thread_name {
            self.thread_name = name.clone();
        }
        if env.stack_size.is_some() {
            self.stack_size = env.stack_size;
        }
        if let Some(inline) = env.inline_single {
            self.inline_single = inline;
        }
        self
    }
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .map(|e| e == "yaml" || e == "yml")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RunnerConfig::default();
        assert_eq!(config.thread_name, "conc-worker");
        assert_eq!(config.stack_size, None);
        assert!(config.inline_single);
    }

    #[test]
    fn test_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conc.json");

        let config = RunnerConfig {
            thread_name: "io".to_string(),
            stack_size: Some(1 << 20),
            inline_single: false,
        };
        config.save(&path).unwrap();

        assert_eq!(RunnerConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conc.yaml");
        std::fs::write(&path, "stack_size: 65536\n").unwrap();

        let config = RunnerConfig::load(&path).unwrap();
        assert_eq!(config.stack_size, Some(65536));
        assert_eq!(config.thread_name, "conc-worker");
        assert!(config.inline_single);
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();

        let missing = RunnerConfig::load(dir.path().join("missing.json")).unwrap_err();
        assert_eq!(missing.to_string(), "Failed to read config file");

        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        let bad = RunnerConfig::load(&path).unwrap_err();
        assert_eq!(bad.to_string(), "Failed to parse JSON config");
    }

    #[test]
    fn test_with_env() {
        let env = EnvConfig {
            thread_name: Some("pool".to_string()),
            inline_single: Some(false),
            ..Default::default()
        };

        let config = RunnerConfig::default().with_env(&env);
        assert_eq!(config.thread_name, "pool");
        assert_eq!(config.stack_size, None);
        assert!(!config.inline_single);

        assert_eq!(
            RunnerConfig::default().with_env(&EnvConfig::default()),
            RunnerConfig::default()
        );
    }
}
