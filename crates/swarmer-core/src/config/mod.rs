//! Configuration management for Swarmer.
//!
//! Configuration is loaded from multiple sources with the following priority:
//! 1. Environment variables (highest priority)
//! 2. Project-local `swarmer.toml` file
//! 3. User config `~/.config/swarmer/config.toml`
//! 4. Built-in defaults (lowest priority)

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

mod defaults;

pub use defaults::*;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Locust process configuration.
    pub locust: LocustConfig,

    /// Locustfile discovery configuration.
    pub discovery: DiscoveryConfig,

    /// HAR conversion configuration.
    pub convert: ConvertConfig,

    /// Browser/split-view configuration.
    pub ui: UiConfig,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// Searches for config in order:
    /// 1. `./swarmer.toml` (project local)
    /// 2. `~/.config/swarmer/config.toml` (user config)
    /// 3. Falls back to defaults
    pub fn load() -> Result<Self, ConfigError> {
        // Try project-local config first
        if Path::new("swarmer.toml").exists() {
            return Self::from_file("swarmer.toml");
        }

        // Try user config
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("swarmer").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        // Use defaults
        let mut config = Self::default();
        config.apply_env_overrides();
        config.normalize();
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;

        // Apply environment variable overrides
        config.apply_env_overrides();
        config.normalize();

        Ok(config)
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("SWARMER_LOCUST_PATH") {
            self.locust.path = path;
        }
        if let Ok(url) = std::env::var("SWARMER_FALLBACK_URL") {
            self.locust.fallback_web_url = url;
        }
        if let Ok(path) = std::env::var("SWARMER_PYTHON_PATH") {
            self.convert.python_path = path;
        }
        if let Ok(ms) = std::env::var("SWARMER_DEBOUNCE_MS") {
            if let Ok(n) = ms.parse() {
                self.discovery.debounce_ms = n;
            }
        }
    }

    /// Clamp values that have a documented valid range.
    fn normalize(&mut self) {
        self.ui.split_ratio = self
            .ui
            .split_ratio
            .clamp(MIN_SPLIT_RATIO, MAX_SPLIT_RATIO);
    }

    /// Create a default config file content as a string.
    pub fn default_config_string() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Locust process configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocustConfig {
    /// Path or name of the locust executable.
    pub path: String,

    /// URL opened when no web-UI URL appears in the output in time.
    pub fallback_web_url: String,

    /// Seconds to wait for the web-UI URL before opening the fallback.
    pub web_url_timeout_secs: u64,
}

impl Default for LocustConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_LOCUST_PATH.to_string(),
            fallback_web_url: DEFAULT_FALLBACK_WEB_URL.to_string(),
            web_url_timeout_secs: DEFAULT_WEB_URL_TIMEOUT_SECS,
        }
    }
}

/// Locustfile discovery configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Directories to exclude from workspace scanning.
    pub exclude_dirs: Vec<String>,

    /// Quiet period (milliseconds) for coalescing filesystem events.
    pub debounce_ms: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            exclude_dirs: DEFAULT_EXCLUDE_DIRS.iter().map(|s| s.to_string()).collect(),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

/// HAR conversion configuration (flags forwarded to `har2locust`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    /// Python executable used to run `python -m har2locust`.
    pub python_path: String,

    /// Custom jinja2 template path, if any.
    pub template: Option<String>,

    /// Extra plugins to enable.
    pub plugins: Vec<String>,

    /// Default plugins to disable.
    pub disable_plugins: Vec<String>,

    /// Resource-type filter (comma-separated, e.g. "xhr,document").
    pub resource_types: Option<String>,

    /// Log level passed to the converter.
    pub loglevel: Option<String>,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            python_path: DEFAULT_PYTHON_PATH.to_string(),
            template: None,
            plugins: Vec::new(),
            disable_plugins: Vec::new(),
            resource_types: None,
            loglevel: None,
        }
    }
}

/// Browser/split-view configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Size ratio handed to the split-view surface, clamped to 0.2–0.8.
    pub split_ratio: f64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            split_ratio: DEFAULT_SPLIT_RATIO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.locust.path, DEFAULT_LOCUST_PATH);
        assert_eq!(config.locust.web_url_timeout_secs, DEFAULT_WEB_URL_TIMEOUT_SECS);
        assert_eq!(config.discovery.debounce_ms, DEFAULT_DEBOUNCE_MS);
        assert_eq!(config.convert.python_path, DEFAULT_PYTHON_PATH);
    }

    #[test]
    fn test_config_to_toml() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[locust]"));
        assert!(toml_str.contains("[discovery]"));
        assert!(toml_str.contains("[convert]"));
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
[locust]
path = "/opt/venv/bin/locust"
web_url_timeout_secs = 10

[discovery]
debounce_ms = 500

[convert]
python_path = "python"
plugins = ["har2locust.extra_plugins.plugin_example"]
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.locust.path, "/opt/venv/bin/locust");
        assert_eq!(config.locust.web_url_timeout_secs, 10);
        assert_eq!(config.discovery.debounce_ms, 500);
        assert_eq!(config.convert.python_path, "python");
        assert_eq!(config.convert.plugins.len(), 1);
    }

    #[test]
    fn test_split_ratio_clamped() {
        let mut config = Config::default();
        config.ui.split_ratio = 0.95;
        config.normalize();
        assert_eq!(config.ui.split_ratio, MAX_SPLIT_RATIO);

        config.ui.split_ratio = 0.01;
        config.normalize();
        assert_eq!(config.ui.split_ratio, MIN_SPLIT_RATIO);
    }
}
