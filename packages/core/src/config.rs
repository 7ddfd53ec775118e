//! Configuration
//!
//! `AppConfig` is read from an optional JSON file and then overridden by
//! environment variables:
//!
//! | Variable                 | Field                    |
//! |--------------------------|--------------------------|
//! | `AGENTBOARD_API_URL`     | `client.base_url`        |
//! | `AGENTBOARD_API_TOKEN`   | `client.token`           |
//! | `AGENTBOARD_DEBOUNCE_MS` | `editor.debounce_ms`     |
//!
//! Every field has a default, so a partial (or older) file still loads. The
//! dev-tools binaries take the file path from `--config` or
//! `AGENTBOARD_CONFIG`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::client::ClientConfig;
use crate::editor::focus::DEFAULT_FOCUS_ATTEMPTS;
use crate::editor::retry::RetryPolicy;
use crate::editor::selection::DRAG_THRESHOLD_PX;
use crate::editor::table_editor::TABLE_DEBOUNCE_MS;
use crate::editor::EDITOR_EVENT_CHANNEL_CAPACITY;

pub const ENV_API_URL: &str = "AGENTBOARD_API_URL";
pub const ENV_API_TOKEN: &str = "AGENTBOARD_API_TOKEN";
pub const ENV_DEBOUNCE_MS: &str = "AGENTBOARD_DEBOUNCE_MS";

pub const DEFAULT_DEBOUNCE_MS: u64 = 1200;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid value for {name}: '{value}'")]
    InvalidEnv { name: String, value: String },
}

impl ConfigError {
    pub fn invalid_env(name: &str, value: &str) -> Self {
        Self::InvalidEnv {
            name: name.to_string(),
            value: value.to_string(),
        }
    }
}

/// Editor timing and interaction settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Quiet period before dirty content is flushed
    pub debounce_ms: u64,
    /// Quiet period before table cell edits commit into the block
    pub table_debounce_ms: u64,
    pub focus_max_attempts: usize,
    pub drag_threshold_px: f32,
    /// Attempts per write, first try included
    pub save_attempts: usize,
    pub retry_base_delay_ms: u64,
    pub event_capacity: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            table_debounce_ms: TABLE_DEBOUNCE_MS,
            focus_max_attempts: DEFAULT_FOCUS_ATTEMPTS,
            drag_threshold_px: DRAG_THRESHOLD_PX,
            save_attempts: 2,
            retry_base_delay_ms: 200,
            event_capacity: EDITOR_EVENT_CHANNEL_CAPACITY,
        }
    }
}

impl EditorConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn table_debounce(&self) -> Duration {
        Duration::from_millis(self.table_debounce_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.save_attempts,
            Duration::from_millis(self.retry_base_delay_ms),
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub client: ClientConfig,
    pub editor: EditorConfig,
}

impl AppConfig {
    /// Load from `path` (if given) and apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(std::env::vars())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Apply overrides from environment-style pairs; unrelated keys are ignored
    pub fn apply_env<I>(&mut self, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .filter(|(name, _)| name.starts_with("AGENTBOARD_"))
            .collect();

        if let Some(url) = vars.get(ENV_API_URL) {
            self.client.base_url = url.trim().to_string();
        }
        if let Some(token) = vars.get(ENV_API_TOKEN) {
            let token = token.trim();
            self.client.token = (!token.is_empty()).then(|| token.to_string());
        }
        if let Some(raw) = vars.get(ENV_DEBOUNCE_MS) {
            self.editor.debounce_ms = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid_env(ENV_DEBOUNCE_MS, raw))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = EditorConfig::default();
        assert_eq!(config.debounce(), Duration::from_millis(1200));
        assert_eq!(config.table_debounce(), Duration::from_millis(600));
        assert_eq!(config.focus_max_attempts, 8);
        assert_eq!(config.drag_threshold_px, 4.0);
        assert_eq!(config.retry_policy(), RetryPolicy::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"client": {{"base_url": "http://localhost:8080"}}, "editor": {{"debounce_ms": 300}}}}"#
        )
        .unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.client.base_url, "http://localhost:8080");
        assert_eq!(config.client.timeout_ms, ClientConfig::default().timeout_ms);
        assert_eq!(config.editor.debounce_ms, 300);
        assert_eq!(config.editor.table_debounce_ms, 600);
    }

    #[test]
    fn test_malformed_file_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(
            AppConfig::from_file(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config
            .apply_env(env(&[
                (ENV_API_URL, " https://api.example.com "),
                (ENV_API_TOKEN, "secret"),
                (ENV_DEBOUNCE_MS, "50"),
                ("HOME", "/root"),
            ]))
            .unwrap();

        assert_eq!(config.client.base_url, "https://api.example.com");
        assert_eq!(config.client.token.as_deref(), Some("secret"));
        assert_eq!(config.editor.debounce_ms, 50);
    }

    #[test]
    fn test_invalid_debounce_env() {
        let mut config = AppConfig::default();
        let err = config
            .apply_env(env(&[(ENV_DEBOUNCE_MS, "soon")]))
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid value for AGENTBOARD_DEBOUNCE_MS: 'soon'");
    }
}
