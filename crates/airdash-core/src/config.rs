//! Configuration management for airdash.
//!
//! Loads configuration from ${AIRDASH_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable overriding `api_base_url`.
pub const API_URL_ENV: &str = "AIRDASH_API_URL";

pub mod paths {
    //! Path resolution for airdash configuration and client state.
    //!
    //! AIRDASH_HOME resolution order:
    //! 1. AIRDASH_HOME environment variable (if set)
    //! 2. ~/.config/airdash (default)
    //! 3. ./.airdash when no home directory can be determined

    use std::path::PathBuf;

    /// Returns the airdash home directory.
    pub fn airdash_home() -> PathBuf {
        if let Ok(home) = std::env::var("AIRDASH_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir().map_or_else(
            || PathBuf::from(".airdash"),
            |h| h.join(".config").join("airdash"),
        )
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        airdash_home().join("config.toml")
    }

    /// Returns the path of the persisted credential.
    pub fn session_path() -> PathBuf {
        airdash_home().join("session.json")
    }

    /// Returns the path of the persisted recently viewed list.
    pub fn recent_cities_path() -> PathBuf {
        airdash_home().join("recent_cities.json")
    }
}

/// Logging output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directives used when `RUST_LOG` is not set.
    pub filter: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

/// Account status polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Interval of the global status check (any screen).
    pub global_interval_secs: u64,
    /// Interval of the status check while on dashboard/admin screens.
    pub protected_interval_secs: u64,
    /// Minimum gap between two activity-triggered checks.
    pub activity_gap_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            global_interval_secs: 5,
            protected_interval_secs: 15,
            activity_gap_secs: 5,
        }
    }
}

/// Account notification modal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModalConfig {
    /// Seconds before the forced redirect to the login screen.
    pub countdown_secs: u8,
}

impl Default for ModalConfig {
    fn default() -> Self {
        Self { countdown_secs: 10 }
    }
}

/// Recently viewed cities.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecentConfig {
    pub capacity: usize,
    /// How often relative times ("5 phút trước") are recomputed.
    pub refresh_interval_secs: u64,
}

impl Default for RecentConfig {
    fn default() -> Self {
        Self {
            capacity: 10,
            refresh_interval_secs: 60,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the dashboard REST API (e.g. `http://localhost:5000/api`).
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub monitor: MonitorConfig,
    pub modal: ModalConfig,
    pub recent: RecentConfig,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: Self::DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: 10,
            monitor: MonitorConfig::default(),
            modal: ModalConfig::default(),
            recent: RecentConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

impl Config {
    const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";

    /// Loads configuration from the default config path.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Creates a default config file at the given path.
    /// Returns an error if the file already exists.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    /// Resolves the API base URL with precedence: env > config.
    pub fn resolved_api_base_url(&self) -> Result<String> {
        let from_env = std::env::var(API_URL_ENV).ok();
        let candidate = from_env
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .unwrap_or(self.api_base_url.trim());

        url::Url::parse(candidate)
            .with_context(|| format!("Invalid API base URL: {candidate}"))?;
        Ok(candidate.trim_end_matches('/').to_string())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }
}

impl MonitorConfig {
    pub fn global_interval(&self) -> Duration {
        Duration::from_secs(self.global_interval_secs.max(1))
    }

    pub fn protected_interval(&self) -> Duration {
        Duration::from_secs(self.protected_interval_secs.max(1))
    }

    pub fn activity_gap(&self) -> Duration {
        Duration::from_secs(self.activity_gap_secs)
    }
}

impl RecentConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }
}
