use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::client::{INBOX_LABEL, UNREAD_QUERY};
use crate::error::{GmailError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub responder: ResponderConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponderConfig {
    /// Existing label applied to every answered message
    #[serde(default = "default_label_name")]
    pub label_name: String,
    /// Label candidates are listed from and removed from once answered
    #[serde(default = "default_source_label")]
    pub source_label: String,
    #[serde(default = "default_query")]
    pub query: String,
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            label_name: default_label_name(),
            source_label: default_source_label(),
            query: default_query(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_min_delay_secs")]
    pub min_delay_secs: u64,
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            min_delay_secs: default_min_delay_secs(),
            max_delay_secs: default_max_delay_secs(),
        }
    }
}

fn default_label_name() -> String {
    "open-in-app-backend".to_string()
}

fn default_source_label() -> String {
    INBOX_LABEL.to_string()
}

fn default_query() -> String {
    UNREAD_QUERY.to_string()
}

fn default_min_delay_secs() -> u64 {
    1
}

fn default_max_delay_secs() -> u64 {
    6
}

impl Config {
    pub async fn load(path: &Path) -> Result<Self> {
        // If file doesn't exist, return default config with warning
        if !path.exists() {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| GmailError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| GmailError::ConfigError(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;

        tracing::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    GmailError::ConfigError(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| GmailError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        tokio::fs::write(path, content)
            .await
            .map_err(|e| GmailError::ConfigError(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.responder.label_name.trim().is_empty() {
            return Err(GmailError::ConfigError(
                "responder.label_name cannot be empty".to_string(),
            ));
        }
        if self.responder.source_label.trim().is_empty() {
            return Err(GmailError::ConfigError(
                "responder.source_label cannot be empty".to_string(),
            ));
        }
        if self.responder.label_name == self.responder.source_label {
            return Err(GmailError::ConfigError(
                "responder.label_name must differ from responder.source_label".to_string(),
            ));
        }

        if self.schedule.min_delay_secs == 0 {
            return Err(GmailError::ConfigError(
                "schedule.min_delay_secs must be at least 1".to_string(),
            ));
        }
        if self.schedule.min_delay_secs > self.schedule.max_delay_secs {
            return Err(GmailError::ConfigError(
                "schedule.min_delay_secs cannot exceed schedule.max_delay_secs".to_string(),
            ));
        }

        tracing::debug!("Configuration validation passed");
        Ok(())
    }

    /// Create an example configuration file
    pub async fn create_example(path: &Path) -> Result<()> {
        let config = Self::default();
        config.save(path).await
    }
}
