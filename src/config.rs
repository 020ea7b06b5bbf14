//! Configuration management for Turnstile.

use serde::{Deserialize, Serialize};

use crate::policy::PolicyTable;

/// Main configuration for the Turnstile limiter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LimiterConfig {
    /// Bucket store connection configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Rate limit policies per endpoint class
    #[serde(default)]
    pub policies: PolicyTable,
}

/// Bucket store connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store address, e.g. `redis://127.0.0.1:6379/0`.
    ///
    /// When absent the limiter starts disabled and admits everything.
    pub url: Option<String>,

    /// Upper bound on a single store round-trip, in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    250
}

impl StoreConfig {
    /// Build a store configuration from the `REDIS_URL` environment
    /// variable, with the default round-trip timeout.
    pub fn from_env() -> Self {
        Self {
            url: std::env::var("REDIS_URL").ok(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl LimiterConfig {
    /// Load configuration from a YAML file path.
    pub fn from_file(path: &str) -> crate::error::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: LimiterConfig = serde_yaml::from_str(&contents)
            .map_err(|e| crate::error::TurnstileError::Config(e.to_string()))?;
        Ok(config)
    }
}
