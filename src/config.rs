//! # Configuration Module
//!
//! Runtime settings for the recipe API client, the local store and the
//! optional Postgres store. Values come from the environment (a `.env` file
//! is loaded by the binary first); anything missing or unparsable falls back
//! to the defaults below.

use std::path::PathBuf;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

// Constants for configuration defaults
pub const DEFAULT_MEALDB_BASE_URL: &str = "https://www.themealdb.com/api/json/v1/1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_STORE_PATH: &str = "recetas.json";
pub const DEFAULT_USER_ID: &str = "local";

/// Retry and circuit breaker settings for remote calls
#[derive(Debug, Clone, PartialEq)]
pub struct RecoveryConfig {
    /// Maximum number of retry attempts after the first try
    pub max_retries: u32,
    /// Base delay between retries in milliseconds
    pub base_retry_delay_ms: u64,
    /// Maximum delay between retries in milliseconds
    pub max_retry_delay_ms: u64,
    /// Circuit breaker failure threshold
    pub circuit_breaker_threshold: u32,
    /// Circuit breaker reset timeout in seconds
    pub circuit_breaker_reset_secs: u64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_retry_delay_ms: 500,  // 0.5 seconds
            max_retry_delay_ms: 5000,  // 5 seconds
            circuit_breaker_threshold: 5,
            circuit_breaker_reset_secs: 60, // 1 minute
        }
    }
}

impl RecoveryConfig {
    /// Delay before retry number `attempt` (0-based)
    ///
    /// Exponential backoff capped at `max_retry_delay_ms`, plus up to half
    /// the base delay of random jitter.
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let backoff = self
            .base_retry_delay_ms
            .saturating_mul(1u64 << attempt.min(16))
            .min(self.max_retry_delay_ms);
        let jitter = if self.base_retry_delay_ms >= 2 {
            rand::thread_rng().gen_range(0..=self.base_retry_delay_ms / 2)
        } else {
            0
        };
        Duration::from_millis(backoff + jitter)
    }
}

/// Settings for the TheMealDB client
#[derive(Debug, Clone, PartialEq)]
pub struct MealDbConfig {
    /// Base URL without trailing slash
    pub base_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    pub recovery: RecoveryConfig,
}

impl Default for MealDbConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_MEALDB_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            recovery: RecoveryConfig::default(),
        }
    }
}

/// Top-level application configuration
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub mealdb: MealDbConfig,
    /// Path of the local JSON store
    pub store_path: PathBuf,
    /// Postgres connection string; the Postgres store is disabled when unset
    pub database_url: Option<String>,
    /// Identifier of the current user, passed explicitly to per-user storage
    pub user_id: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mealdb: MealDbConfig::default(),
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            database_url: None,
            user_id: DEFAULT_USER_ID.to_string(),
        }
    }
}

impl AppConfig {
    /// Build the configuration from process environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    ///
    /// Recognized keys: `MEALDB_BASE_URL`, `MEALDB_TIMEOUT_SECS`,
    /// `RECETAS_STORE_PATH`, `DATABASE_URL`, `RECETAS_USER_ID`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let timeout_secs = match non_empty("MEALDB_TIMEOUT_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    warn!(value = %raw, "Invalid MEALDB_TIMEOUT_SECS, using default");
                    DEFAULT_TIMEOUT_SECS
                }
            },
            None => DEFAULT_TIMEOUT_SECS,
        };

        Self {
            mealdb: MealDbConfig {
                base_url: non_empty("MEALDB_BASE_URL")
                    .map(|url| url.trim_end_matches('/').to_string())
                    .unwrap_or(defaults.mealdb.base_url),
                timeout_secs,
                recovery: defaults.mealdb.recovery,
            },
            store_path: non_empty("RECETAS_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.store_path),
            database_url: non_empty("DATABASE_URL"),
            user_id: non_empty("RECETAS_USER_ID").unwrap_or(defaults.user_id),
        }
    }
}
