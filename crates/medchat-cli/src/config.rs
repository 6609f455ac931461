//! Configuration file support

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for medchat
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend base URL
    pub base_url: Option<String>,
    /// Maximum tokens per reply
    pub max_tokens: Option<u32>,
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// Reasoning phase handling: "auto", "always" or "never"
    pub reasoning: Option<String>,
    /// Overall request timeout in seconds (0 disables it)
    pub request_timeout_secs: Option<u64>,
    /// Seconds between health checks
    pub health_interval_secs: Option<u64>,
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("medchat")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("MEDCHAT_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from file
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), "failed to parse config file: {}", e);
                Self::default()
            }),
            Err(e) => {
                tracing::warn!(path = %path.display(), "failed to read config file: {}", e);
                Self::default()
            }
        }
    }

    /// Parse config from TOML text
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Save config to file
    pub fn save(&self) -> std::io::Result<()> {
        let path = Self::config_path();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let content = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, content)
    }

    /// Create a default config file if it doesn't exist
    pub fn init() -> std::io::Result<PathBuf> {
        let path = Self::config_path();
        if path.exists() {
            return Ok(path);
        }

        let default_config = Config {
            base_url: Some(medchat_ai::client::DEFAULT_BASE_URL.to_string()),
            max_tokens: Some(1024),
            temperature: Some(0.7),
            reasoning: Some("auto".to_string()),
            request_timeout_secs: Some(300),
            health_interval_secs: Some(10),
        };

        default_config.save()?;
        Ok(path)
    }

    /// Request timeout; zero means none
    pub fn request_timeout(&self) -> Option<Duration> {
        match self.request_timeout_secs.unwrap_or(300) {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Health polling interval, at least one second
    pub fn health_interval(&self) -> Duration {
        Duration::from_secs(self.health_interval_secs.unwrap_or(10).max(1))
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# medchat configuration file
# Place at ~/.config/medchat/config.toml (Linux/Mac) or %APPDATA%\medchat\config.toml (Windows)

# MedChat backend address
base_url = "http://localhost:8500"

# Generation parameters
max_tokens = 1024
temperature = 0.7

# How replies are split into reasoning and answer:
#   auto   - text before the model's first empty delta is reasoning
#   always - every reply opens with a reasoning phase
#   never  - show everything as the answer
reasoning = "auto"

# Give up on a request after this many seconds (0 = never)
request_timeout_secs = 300

# How often to check whether the model is ready
health_interval_secs = 10
"#
}
