//! Configuration surface for the call layer.
//!
//! Settings types are plain serde structs with field-level defaults;
//! [`ConfigLoader`] merges three layers: built-in defaults, an optional
//! config file, then `BACKSTOP_`-prefixed environment variables
//! (double underscore for nesting, e.g. `BACKSTOP_RETRY__MAX_RETRIES=5`).

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::breaker::CircuitBreakerConfig;
use crate::policy::RetryPolicy;
use crate::registry::ServiceRoute;

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadError(String),

    #[error("configuration file not found at path: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    #[error("invalid configuration value: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// Root configuration for the call layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResilienceConfig {
    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub breaker: BreakerSettings,

    /// Ordered prefix-to-service table; first match wins.
    #[serde(default = "default_routes")]
    pub services: Vec<ServiceRoute>,
}

/// Retry budget and backoff settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Backoff multiplier per attempt; must be >= 1.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Additive jitter fraction; must be in [0, 1].
    #[serde(default = "default_jitter_ratio")]
    pub jitter_ratio: f64,

    #[serde(default = "default_per_attempt_timeout_ms")]
    pub per_attempt_timeout_ms: u64,
}

/// Circuit breaker settings, applied to every service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerSettings {
    /// Consecutive failures that trip a breaker; must be >= 1.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    #[serde(default = "default_reset_timeout_ms")]
    pub reset_timeout_ms: u64,

    /// Reserved: accepted and stored, currently unused.
    #[serde(default = "default_monitoring_period_ms")]
    pub monitoring_period_ms: u64,
}

// Default value functions
fn default_max_retries() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    1000
}
fn default_max_delay_ms() -> u64 {
    10_000
}
fn default_backoff_multiplier() -> f64 {
    2.0
}
fn default_jitter_ratio() -> f64 {
    0.1
}
fn default_per_attempt_timeout_ms() -> u64 {
    30_000
}
fn default_failure_threshold() -> u32 {
    5
}
fn default_reset_timeout_ms() -> u64 {
    30_000
}
fn default_monitoring_period_ms() -> u64 {
    60_000
}
fn default_routes() -> Vec<ServiceRoute> {
    vec![
        ServiceRoute::new("/api/upload", "upload"),
        ServiceRoute::new("/api/strategy", "strategy"),
        ServiceRoute::new("/api/matching", "matching"),
    ]
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter_ratio: default_jitter_ratio(),
            per_attempt_timeout_ms: default_per_attempt_timeout_ms(),
        }
    }
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            reset_timeout_ms: default_reset_timeout_ms(),
            monitoring_period_ms: default_monitoring_period_ms(),
        }
    }
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            retry: RetrySettings::default(),
            breaker: BreakerSettings::default(),
            services: default_routes(),
        }
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        RetryPolicy {
            max_retries: settings.max_retries,
            base_delay: Duration::from_millis(settings.base_delay_ms),
            max_delay: Duration::from_millis(settings.max_delay_ms),
            backoff_multiplier: settings.backoff_multiplier,
            jitter_ratio: settings.jitter_ratio,
            per_attempt_timeout: Duration::from_millis(settings.per_attempt_timeout_ms),
        }
    }
}

impl From<&BreakerSettings> for CircuitBreakerConfig {
    fn from(settings: &BreakerSettings) -> Self {
        CircuitBreakerConfig {
            failure_threshold: settings.failure_threshold,
            reset_timeout: Duration::from_millis(settings.reset_timeout_ms),
            monitoring_period: Duration::from_millis(settings.monitoring_period_ms),
        }
    }
}

impl ResilienceConfig {
    /// Range-check every field that has one.
    pub fn validate(&self) -> Result<()> {
        if self.retry.backoff_multiplier < 1.0 {
            return Err(ConfigError::ValidationError(format!(
                "retry.backoff_multiplier must be >= 1, got {}",
                self.retry.backoff_multiplier
            )));
        }
        if !(0.0..=1.0).contains(&self.retry.jitter_ratio) {
            return Err(ConfigError::ValidationError(format!(
                "retry.jitter_ratio must be within [0, 1], got {}",
                self.retry.jitter_ratio
            )));
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(ConfigError::ValidationError(format!(
                "retry.base_delay_ms ({}) exceeds retry.max_delay_ms ({})",
                self.retry.base_delay_ms, self.retry.max_delay_ms
            )));
        }
        if self.breaker.failure_threshold == 0 {
            return Err(ConfigError::ValidationError(
                "breaker.failure_threshold must be >= 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from(&self.retry)
    }

    pub fn breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig::from(&self.breaker)
    }

    /// Build the registry this configuration describes.
    pub fn build_registry(&self) -> crate::registry::ServiceRegistry {
        crate::registry::ServiceRegistry::new(self.services.clone(), self.breaker_config())
    }
}

/// Configuration loader with layered merging support.
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Set the configuration file path.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Load configuration with layered merging:
    /// 1. Built-in defaults
    /// 2. Config file, if provided
    /// 3. Environment variables (`BACKSTOP_` prefix)
    pub fn load(&self) -> Result<ResilienceConfig> {
        let mut builder = Config::builder();

        let defaults = ResilienceConfig::default();
        let defaults_json = serde_json::to_string(&defaults)?;
        builder = builder.add_source(config::File::from_str(
            &defaults_json,
            config::FileFormat::Json,
        ));

        if let Some(ref path) = self.config_path {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_ref()));
            } else {
                return Err(ConfigError::FileNotFound(path.clone()));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("BACKSTOP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let merged = builder.build()?;
        let config: ResilienceConfig = merged.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
