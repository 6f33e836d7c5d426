//! warden-config - layered configuration loading
//!
//! Configuration is merged from `config/default.toml`, an environment
//! specific `config/{APP_ENV}.toml`, and `WARDEN_`-prefixed environment
//! variables (`__` separates nesting levels, e.g. `WARDEN_SSO__ADDRESS`).

use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Load(#[from] figment::Error),
}

/// SSO client configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SsoConfig {
    /// Address of the SSO service, e.g. `http://localhost:44044`.
    pub address: String,
    /// Bound on connection setup and on each validation call.
    #[serde(default = "default_sso_timeout_secs")]
    pub timeout_secs: u64,
    /// Connect attempts at startup before giving up.
    #[serde(default = "default_sso_retries")]
    pub retries_count: u32,
    /// Plaintext transport. TLS with system roots when false.
    #[serde(default = "default_true")]
    pub insecure: bool,
    /// Refuse to start without a working SSO connection. The default is to
    /// warn and serve with authentication disabled.
    #[serde(default)]
    pub required: bool,
}

impl SsoConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_sso_timeout_secs() -> u64 {
    5
}

fn default_sso_retries() -> u32 {
    5
}

fn default_true() -> bool {
    true
}

/// Rate limiter configuration. Zero values fall back to the limiter's own
/// defaults (10 rps, burst 20, 5 minute cleanup).
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub rate: u32,
    #[serde(default)]
    pub capacity: u32,
    #[serde(default)]
    pub cleanup_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rate: 0,
            capacity: 0,
            cleanup_interval_secs: 0,
        }
    }
}

/// Telemetry configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_app_name")]
    pub app_name: String,
    #[serde(default = "default_app_env")]
    pub app_env: String,
    pub sso: SsoConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    /// Fully-qualified gRPC methods exempt from authentication and rate
    /// limiting, e.g. `/management.Management/ListPlans`.
    #[serde(default)]
    pub public_methods: Vec<String>,
}

fn default_app_name() -> String {
    "warden".to_string()
}

fn default_app_env() -> String {
    "development".to_string()
}

impl AppConfig {
    /// Loads configuration from config files and environment variables.
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let mut config: Self = Figment::new()
            .merge(Toml::file(format!("{config_dir}/default.toml")))
            .merge(Toml::file(format!("{config_dir}/{env}.toml")))
            .merge(Env::prefixed("WARDEN_").split("__"))
            .extract()?;

        // APP_ENV selected the file layer, keep the field consistent with it
        config.app_env = env;

        Ok(config)
    }

    pub fn is_production(&self) -> bool {
        self.app_env == "production"
    }

    pub fn is_development(&self) -> bool {
        self.app_env == "development"
    }
}

#[cfg(test)]
mod tests;
