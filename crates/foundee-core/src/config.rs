//! Configuration management for Foundee.
//!
//! Loads configuration from ${FOUNDEE_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default backend base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

/// Default public origin for viewer URLs.
pub const DEFAULT_ORIGIN: &str = "http://localhost:3000";

/// Returns the default config template with comments.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

pub mod paths {
    //! Path resolution for Foundee configuration and session files.
    //!
    //! FOUNDEE_HOME resolution order:
    //! 1. FOUNDEE_HOME environment variable (if set)
    //! 2. ~/.config/foundee (default)

    use std::path::PathBuf;

    /// Returns the Foundee home directory.
    pub fn foundee_home() -> PathBuf {
        if let Ok(home) = std::env::var("FOUNDEE_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir().map_or_else(
            || PathBuf::from(".foundee"),
            |h| h.join(".config").join("foundee"),
        )
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        foundee_home().join("config.toml")
    }

    /// Returns the path to the persisted session.
    pub fn session_path() -> PathBuf {
        foundee_home().join("session.json")
    }
}

/// Geolocation settings used by the scan flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeolocationConfig {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub lookup_url: Option<String>,
    pub timeout_ms: u64,
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        Self {
            latitude: None,
            longitude: None,
            lookup_url: None,
            timeout_ms: Config::DEFAULT_GEOLOCATION_TIMEOUT_MS,
        }
    }
}

impl GeolocationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_url: Option<String>,
    pub origin: Option<String>,
    pub request_timeout_secs: u64,
    pub geolocation: GeolocationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: None,
            origin: None,
            request_timeout_secs: Self::DEFAULT_REQUEST_TIMEOUT_SECS,
            geolocation: GeolocationConfig::default(),
        }
    }
}

impl Config {
    const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
    const DEFAULT_GEOLOCATION_TIMEOUT_MS: u64 = 3000;

    /// Loads configuration from the default config path.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
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

    /// Writes the commented default config to `path`.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be written.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        fs::write(path, default_config_template())
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }

    /// Backend base URL with precedence: env > config > default.
    ///
    /// # Errors
    /// Returns an error if the resolved value is not a valid URL.
    pub fn effective_api_url(&self) -> Result<String> {
        resolve_url(
            self.api_url.as_deref(),
            "FOUNDEE_API_URL",
            DEFAULT_API_URL,
            "api_url",
        )
    }

    /// Public web origin with precedence: env > config > default.
    ///
    /// # Errors
    /// Returns an error if the resolved value is not a valid URL.
    pub fn effective_origin(&self) -> Result<String> {
        let origin = resolve_url(
            self.origin.as_deref(),
            "FOUNDEE_ORIGIN",
            DEFAULT_ORIGIN,
            "origin",
        )?;
        Ok(origin.trim_end_matches('/').to_string())
    }

    /// Per-request timeout; `None` when set to zero.
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }
}

fn resolve_url(
    config_value: Option<&str>,
    env_var: &str,
    default_url: &str,
    key: &str,
) -> Result<String> {
    let from_env = std::env::var(env_var).ok();
    let candidates = [from_env.as_deref(), config_value];
    for candidate in candidates.into_iter().flatten() {
        let trimmed = candidate.trim();
        if !trimmed.is_empty() {
            url::Url::parse(trimmed).with_context(|| format!("Invalid {key}: {trimmed}"))?;
            return Ok(trimmed.to_string());
        }
    }
    Ok(default_url.to_string())
}
