//! Configuration management for soilq.
//!
//! Handles loading configuration from a TOML file, with sane defaults for
//! the SDA endpoint and the planner client. Everything here can also run
//! on defaults alone; the file is optional.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, SoilqError};
use crate::exec::{DEFAULT_SDA_TIMEOUT_SECS, DEFAULT_SDA_URL};

/// Main configuration structure for soilq.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Remote backend (Soil Data Access) settings.
    #[serde(default)]
    pub sda: SdaConfig,

    /// Planner client settings.
    #[serde(default)]
    pub planner: PlannerSettings,
}

/// Remote backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SdaConfig {
    /// Tabular endpoint URL.
    #[serde(default = "default_sda_endpoint")]
    pub endpoint: String,

    /// Request timeout in seconds.
    #[serde(default = "default_sda_timeout")]
    pub timeout_secs: u64,
}

fn default_sda_endpoint() -> String {
    DEFAULT_SDA_URL.to_string()
}

fn default_sda_timeout() -> u64 {
    DEFAULT_SDA_TIMEOUT_SECS
}

impl Default for SdaConfig {
    fn default() -> Self {
        Self {
            endpoint: default_sda_endpoint(),
            timeout_secs: default_sda_timeout(),
        }
    }
}

impl SdaConfig {
    /// Returns the request timeout as a Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Planner client settings.
///
/// The API key is deliberately not stored here; it comes from the
/// environment (`OPENAI_API_KEY`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerSettings {
    /// Model name.
    #[serde(default = "default_planner_model")]
    pub model: String,

    /// Base URL override for OpenAI-compatible servers.
    #[serde(default)]
    pub base_url: Option<String>,
}

fn default_planner_model() -> String {
    "gpt-4o-mini".to_string()
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            model: default_planner_model(),
            base_url: None,
        }
    }
}

impl Config {
    /// Loads configuration from a TOML file.
    ///
    /// A missing file yields the defaults; a malformed file is an error.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            SoilqError::config(format!("Cannot read {}: {e}", path.display()))
        })?;
        let config: Config = toml::from_str(&content).map_err(|e| {
            SoilqError::config(format!("Invalid config {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Returns the default config file path for the current platform.
    ///
    /// - Linux/macOS: `~/.config/soilq/config.toml`
    /// - Windows: `%APPDATA%\soilq\config.toml`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("soilq")
            .join("config.toml")
    }

    fn validate(&self) -> Result<()> {
        Url::parse(&self.sda.endpoint).map_err(|e| {
            SoilqError::config(format!(
                "Invalid SDA endpoint '{}': {e}",
                self.sda.endpoint
            ))
        })?;
        if let Some(base_url) = &self.planner.base_url {
            Url::parse(base_url).map_err(|e| {
                SoilqError::config(format!("Invalid planner base_url '{base_url}': {e}"))
            })?;
        }
        Ok(())
    }
}
