//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! The API bearer token is referenced by env-var name in the config and
//! resolved at runtime via `std::env::var`.

use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::fs;
use std::time::Duration;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub api: ApiConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    /// Name of the env var holding the bearer token.
    pub token_env: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MonitorConfig {
    #[serde(default = "default_interval")]
    pub interval: String,
    #[serde(default = "default_strategy")]
    pub strategy: String,
    /// Grace period after each minute boundary so the server can finalise
    /// the just-closed candle.
    #[serde(default = "default_buffer_ms")]
    pub buffer_ms: u64,
    #[serde(default = "default_true")]
    pub sound_enabled: bool,
    #[serde(default)]
    pub autostart: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            strategy: default_strategy(),
            buffer_ms: default_buffer_ms(),
            sound_enabled: true,
            autostart: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnalyticsConfig {
    #[serde(default = "default_starting_capital")]
    pub starting_capital: f64,
    #[serde(default = "default_strategy")]
    pub strategy: String,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            starting_capital: default_starting_capital(),
            strategy: default_strategy(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 8080,
        }
    }
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_interval() -> String {
    "15min".to_string()
}

fn default_strategy() -> String {
    crate::types::DEFAULT_STRATEGY.to_string()
}

fn default_buffer_ms() -> u64 {
    2000
}

fn default_starting_capital() -> f64 {
    10_000.0
}

fn default_true() -> bool {
    true
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::from_toml(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        Ok(config)
    }

    /// Resolve an environment variable name to its value.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }

    /// Resolve the API bearer token, if one is configured in the environment.
    pub fn api_token(&self) -> Option<SecretString> {
        Self::resolve_env(&self.api.token_env)
            .ok()
            .filter(|t| !t.is_empty())
            .map(SecretString::new)
    }
}
