//! Configuration loader and validator for the back-office client.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::listview::ListSettings;

/// Environment variable that overrides `api.base_url`.
pub const API_URL_ENV: &str = "FURNITURE_API_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub api: Api,
    pub ui: Ui,
}

/// REST endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Api {
    pub base_url: String,
    pub timeout_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Screen behaviour shared by every list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ui {
    pub page_size: usize,
    pub message_clear_ms: u64,
}

fn default_user_agent() -> String {
    "furniture-admin/0.1".to_string()
}

impl Config {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.api.timeout_ms)
    }

    pub fn list_settings(&self) -> ListSettings {
        ListSettings {
            page_size: self.ui.page_size,
            message_delay: Duration::from_millis(self.ui.message_clear_ms),
        }
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
/// - `FURNITURE_API_URL`, when set and non-empty, replaces `api.base_url`.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let mut cfg: Config = serde_yaml::from_str(&content)?;
    if let Ok(url) = std::env::var(API_URL_ENV) {
        if !url.trim().is_empty() {
            cfg.api.base_url = url;
        }
    }
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.api.base_url.trim().is_empty() {
        return Err(ConfigError::Invalid("api.base_url must be non-empty"));
    }
    if reqwest::Url::parse(cfg.api.base_url.trim()).is_err() {
        return Err(ConfigError::Invalid("api.base_url must be an absolute URL"));
    }
    if cfg.api.timeout_ms == 0 {
        return Err(ConfigError::Invalid("api.timeout_ms must be > 0"));
    }
    if cfg.ui.page_size == 0 {
        return Err(ConfigError::Invalid("ui.page_size must be > 0"));
    }
    if !(3_000..=5_000).contains(&cfg.ui.message_clear_ms) {
        return Err(ConfigError::Invalid(
            "ui.message_clear_ms must be between 3000 and 5000",
        ));
    }
    Ok(())
}

/// Returns the sample configuration file.
pub fn example() -> &'static str {
    r#"api:
  base_url: "http://localhost:5000/api/"
  timeout_ms: 10000
  user_agent: "furniture-admin/0.1"

ui:
  page_size: 10
  message_clear_ms: 3000
"#
}
