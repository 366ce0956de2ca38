//! Environment variable configuration
//!
//! Provides environment variable overrides for [`RunnerConfig`](super::RunnerConfig).

use std::env;

/// Environment variable prefix
const ENV_PREFIX: &str = "CONC";

/// Overrides read from environment variables
#[derive(Clone, Debug, Default)]
pub struct EnvConfig {
    /// Worker thread name prefix from CONC_THREAD_NAME
    pub thread_name: Option<String>,
    /// Worker stack size in bytes from CONC_STACK_SIZE
    pub stack_size: Option<usize>,
    /// Single-task inlining from CONC_INLINE_SINGLE
    pub inline_single: Option<bool>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self {
            thread_name: get_env("THREAD_NAME"),
            stack_size: get_env_parse("STACK_SIZE"),
            inline_single: get_env_bool("INLINE_SINGLE"),
        }
    }

    /// Check if any environment variables are set
    pub fn has_any(&self) -> bool {
        self.thread_name.is_some() || self.stack_size.is_some() || self.inline_single.is_some()
    }
}

/// Get environment variable with prefix
fn get_env(name: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}_{name}")).ok()
}

/// Get environment variable and parse to type
fn get_env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    get_env(name).and_then(|v| v.parse().ok())
}

/// Get environment variable as boolean
fn get_env_bool(name: &str) -> Option<bool> {
    get_env(name).map(|v| {
        matches!(
            v.to_lowercase().as_str(),
            "1" | "true" | "yes" | "on" | "enabled"
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_config_default() {
        let config = EnvConfig::default();
        assert!(config.thread_name.is_none());
        assert!(!config.has_any());
    }

    #[test]
    fn test_env_load() {
        env::set_var("CONC_THREAD_NAME", "from-env");
        env::set_var("CONC_STACK_SIZE", "not a number");
        env::set_var("CONC_INLINE_SINGLE", "Off");

        let config = EnvConfig::load();
        assert_eq!(config.thread_name, Some("from-env".to_string()));
        assert_eq!(config.stack_size, None);
        assert_eq!(config.inline_single, Some(false));
        assert!(config.has_any());

        let runner = super::super::RunnerConfig::from_env();
        assert_eq!(runner.thread_name, "from-env");
        assert!(!runner.inline_single);

        env::set_var("CONC_STACK_SIZE", "262144");
        env::set_var("CONC_INLINE_SINGLE", "yes");
        let config = EnvConfig::load();
        assert_eq!(config.stack_size, Some(262144));
        assert_eq!(config.inline_single, Some(true));

        env::remove_var("CONC_THREAD_NAME");
        env::remove_var("CONC_STACK_SIZE");
        env::remove_var("CONC_INLINE_SINGLE");
    }
}
