//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP and request pacing settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Synchronization bounds
    #[serde(default)]
    pub sync: SyncConfig,

    /// Storage location and aggregate windows
    #[serde(default)]
    pub storage: StorageConfig,

    /// Prediction defaults and budgets
    #[serde(default)]
    pub predict: PredictConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.max_delay_ms < self.crawler.min_delay_ms {
            return Err(AppError::validation(
                "crawler.max_delay_ms must be >= crawler.min_delay_ms",
            ));
        }
        if self.sync.full_batch_size == 0 {
            return Err(AppError::validation("sync.full_batch_size must be > 0"));
        }
        if self.sync.max_consecutive_not_found == 0 {
            return Err(AppError::validation(
                "sync.max_consecutive_not_found must be > 0",
            ));
        }
        if self.sync.max_new_records == 0 {
            return Err(AppError::validation("sync.max_new_records must be > 0"));
        }
        if self.storage.frequency_window == 0 || self.storage.history_window == 0 {
            return Err(AppError::validation("storage windows must be > 0"));
        }
        if self.predict.default_count == 0 {
            return Err(AppError::validation("predict.default_count must be > 0"));
        }
        if self.predict.default_strategies.is_empty() {
            return Err(AppError::validation("No default strategies defined"));
        }
        Ok(())
    }
}

/// HTTP client and request pacing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Minimum spacing between two requests from one fetcher
    #[serde(default = "defaults::min_delay")]
    pub min_delay_ms: u64,

    /// Upper end of the random spacing
    #[serde(default = "defaults::max_delay")]
    pub max_delay_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            min_delay_ms: defaults::min_delay(),
            max_delay_ms: defaults::max_delay(),
        }
    }
}

/// Bounds on a single sync invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Records fetched per full-backfill invocation
    #[serde(default = "defaults::full_batch_size")]
    pub full_batch_size: usize,

    /// Consecutive misses that end a backward walk
    #[serde(default = "defaults::max_consecutive_not_found")]
    pub max_consecutive_not_found: usize,

    /// Cap on records collected by one backward walk
    #[serde(default = "defaults::max_new_records")]
    pub max_new_records: usize,

    /// Extra misses tolerated right after crossing into the previous year
    #[serde(default = "defaults::rollover_slack")]
    pub rollover_slack: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            full_batch_size: defaults::full_batch_size(),
            max_consecutive_not_found: defaults::max_consecutive_not_found(),
            max_new_records: defaults::max_new_records(),
            rollover_slack: defaults::rollover_slack(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding one JSON document per game
    #[serde(default = "defaults::root_dir")]
    pub root_dir: String,

    /// Draws counted by the frequency table
    #[serde(default = "defaults::frequency_window")]
    pub frequency_window: usize,

    /// Draws whose keys are excluded from candidates
    #[serde(default = "defaults::combination_window")]
    pub combination_window: usize,

    /// Draws handed to strategies as recent history
    #[serde(default = "defaults::history_window")]
    pub history_window: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root_dir: defaults::root_dir(),
            frequency_window: defaults::frequency_window(),
            combination_window: defaults::combination_window(),
            history_window: defaults::history_window(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictConfig {
    #[serde(default = "defaults::default_count")]
    pub default_count: usize,

    #[serde(default = "defaults::default_strategies")]
    pub default_strategies: Vec<String>,

    /// Attempts allowed per requested candidate
    #[serde(default = "defaults::attempts_per_candidate")]
    pub attempts_per_candidate: usize,

    /// Hard cap on attempts per strategy
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: usize,

    /// Wall-clock budget per strategy
    #[serde(default = "defaults::time_budget")]
    pub time_budget_ms: u64,
}

impl Default for PredictConfig {
    fn default() -> Self {
        Self {
            default_count: defaults::default_count(),
            default_strategies: defaults::default_strategies(),
            attempts_per_candidate: defaults::attempts_per_candidate(),
            max_attempts: defaults::max_attempts(),
            time_budget_ms: defaults::time_budget(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn min_delay() -> u64 {
        500
    }
    pub fn max_delay() -> u64 {
        2000
    }

    // Sync defaults
    pub fn full_batch_size() -> usize {
        100
    }
    pub fn max_consecutive_not_found() -> usize {
        3
    }
    pub fn max_new_records() -> usize {
        100
    }
    pub fn rollover_slack() -> usize {
        10
    }

    // Storage defaults
    pub fn root_dir() -> String {
        "storage".into()
    }
    pub fn frequency_window() -> usize {
        100
    }
    pub fn combination_window() -> usize {
        50
    }
    pub fn history_window() -> usize {
        100
    }

    // Predict defaults
    pub fn default_count() -> usize {
        5
    }
    pub fn default_strategies() -> Vec<String> {
        vec!["frequency".into()]
    }
    pub fn attempts_per_candidate() -> usize {
        20
    }
    pub fn max_attempts() -> usize {
        200
    }
    pub fn time_budget() -> u64 {
        500
    }

    pub fn log_level() -> String {
        "info".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.crawler.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_inverted_delays() {
        let mut config = Config::default();
        config.crawler.min_delay_ms = 3000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_not_found_threshold() {
        let mut config = Config::default();
        config.sync.max_consecutive_not_found = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [sync]
            full_batch_size = 150

            [predict]
            default_strategies = ["frequency", "balanced"]
            "#,
        )
        .unwrap();
        assert_eq!(config.sync.full_batch_size, 150);
        assert_eq!(config.sync.max_consecutive_not_found, 3);
        assert_eq!(config.predict.default_strategies.len(), 2);
        assert_eq!(config.crawler.min_delay_ms, 500);
        assert_eq!(config.storage.combination_window, 50);
    }

    #[test]
    fn load_or_default_falls_back() {
        let config = Config::load_or_default("/definitely/not/here.toml");
        assert_eq!(config.predict.default_count, 5);
    }
}
