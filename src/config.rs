// src/config.rs

//! Key-value configuration lookup for credentials and runtime overrides.
//!
//! Secrets and per-deployment defaults are read through [`ConfigStore`]:
//! a flat TOML table of strings first, process environment last.

use std::collections::HashMap;
use std::path::Path;

use crate::error::{AppError, Result};
use crate::models::Config;

pub const TELEGRAM_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
pub const TELEGRAM_CHAT_ID: &str = "TELEGRAM_CHAT_ID";
pub const API_KEY: &str = "API_KEY";
pub const DEFAULT_STRATEGIES: &str = "DEFAULT_STRATEGIES";
pub const DEFAULT_PREDICTION_COUNT: &str = "DEFAULT_PREDICTION_COUNT";

/// Read-only string lookup.
pub trait ConfigStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

/// Values loaded from a flat `KEY = "value"` TOML file.
#[derive(Debug, Clone, Default)]
pub struct FileConfigStore {
    values: HashMap<String, String>,
}

impl FileConfigStore {
    pub fn from_map(values: HashMap<String, String>) -> Self {
        Self { values }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Load the file if present; a missing file is an empty store.
    pub fn load_optional(path: impl AsRef<Path>) -> Result<Self> {
        match std::fs::read_to_string(path.as_ref()) {
            Ok(content) => Self::parse(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    fn parse(content: &str) -> Result<Self> {
        let table: toml::Table = toml::from_str(content)?;
        let values = table
            .into_iter()
            .filter_map(|(key, value)| {
                let text = match value {
                    toml::Value::String(s) => s,
                    toml::Value::Integer(i) => i.to_string(),
                    toml::Value::Boolean(b) => b.to_string(),
                    toml::Value::Array(items) => items
                        .iter()
                        .filter_map(|v| v.as_str())
                        .collect::<Vec<_>>()
                        .join(","),
                    other => {
                        log::warn!("Ignoring non-scalar config value for {}: {}", key, other);
                        return None;
                    }
                };
                Some((key, text))
            })
            .collect();
        Ok(Self { values })
    }
}

impl ConfigStore for FileConfigStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvConfigStore;

impl ConfigStore for EnvConfigStore {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Ordered chain of stores; the first non-empty value wins.
#[derive(Default)]
pub struct LayeredConfigStore {
    layers: Vec<Box<dyn ConfigStore>>,
}

impl LayeredConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, store: impl ConfigStore + 'static) -> Self {
        self.layers.push(Box::new(store));
        self
    }

    /// File values first, environment as fallback.
    pub fn file_then_env(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new()
            .with(FileConfigStore::load_optional(path)?)
            .with(EnvConfigStore))
    }
}

impl ConfigStore for LayeredConfigStore {
    fn get(&self, key: &str) -> Option<String> {
        self.layers
            .iter()
            .filter_map(|store| store.get(key))
            .find(|value| !value.trim().is_empty())
    }
}

/// Credentials resolved from a config store.
#[derive(Debug, Clone, Default)]
pub struct Secrets {
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub api_key: Option<String>,
}

impl Secrets {
    pub fn resolve(store: &dyn ConfigStore) -> Self {
        Self {
            telegram_bot_token: store.get(TELEGRAM_BOT_TOKEN),
            telegram_chat_id: store.get(TELEGRAM_CHAT_ID),
            api_key: store.get(API_KEY),
        }
    }
}

impl Config {
    /// Apply prediction defaults from the config store.
    pub fn apply_overrides(&mut self, store: &dyn ConfigStore) {
        if let Some(list) = store.get(DEFAULT_STRATEGIES) {
            let names: Vec<String> = list
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if !names.is_empty() {
                self.predict.default_strategies = names;
            }
        }
        if let Some(count) = store.get(DEFAULT_PREDICTION_COUNT) {
            match count.trim().parse::<usize>() {
                Ok(n) if n > 0 => self.predict.default_count = n,
                _ => log::warn!("Ignoring invalid {}: {:?}", DEFAULT_PREDICTION_COUNT, count),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn store(pairs: &[(&str, &str)]) -> FileConfigStore {
        FileConfigStore::from_map(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn file_store_reads_scalars_and_lists() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "API_KEY = \"secret\"\nDEFAULT_PREDICTION_COUNT = 8\nDEFAULT_STRATEGIES = [\"random\", \"balanced\"]"
        )
        .unwrap();

        let store = FileConfigStore::load(file.path()).unwrap();
        assert_eq!(store.get(API_KEY).as_deref(), Some("secret"));
        assert_eq!(store.get(DEFAULT_PREDICTION_COUNT).as_deref(), Some("8"));
        assert_eq!(
            store.get(DEFAULT_STRATEGIES).as_deref(),
            Some("random,balanced")
        );
    }

    #[test]
    fn missing_file_is_empty_store() {
        let store = FileConfigStore::load_optional("/no/such/secrets.toml").unwrap();
        assert!(store.get(API_KEY).is_none());
    }

    #[test]
    fn layered_store_prefers_first_non_empty() {
        let layered = LayeredConfigStore::new()
            .with(store(&[(API_KEY, " "), (TELEGRAM_CHAT_ID, "42")]))
            .with(store(&[(API_KEY, "fallback"), (TELEGRAM_CHAT_ID, "7")]));
        assert_eq!(layered.get(API_KEY).as_deref(), Some("fallback"));
        assert_eq!(layered.get(TELEGRAM_CHAT_ID).as_deref(), Some("42"));
        assert!(layered.get(TELEGRAM_BOT_TOKEN).is_none());
    }

    #[test]
    fn env_store_reads_process_environment() {
        // SAFETY: the variable name is unique to this test.
        unsafe { std::env::set_var("LOTTERY_CRAWLER_TEST_ENV_KEY", "from-env") };
        assert_eq!(
            EnvConfigStore.get("LOTTERY_CRAWLER_TEST_ENV_KEY").as_deref(),
            Some("from-env")
        );
    }

    #[test]
    fn overrides_apply_to_predict_defaults() {
        let mut config = Config::default();
        config.apply_overrides(&store(&[
            (DEFAULT_STRATEGIES, "frequency, cold_hot ,"),
            (DEFAULT_PREDICTION_COUNT, "10"),
        ]));
        assert_eq!(config.predict.default_strategies, vec!["frequency", "cold_hot"]);
        assert_eq!(config.predict.default_count, 10);
    }

    #[test]
    fn invalid_count_override_is_ignored() {
        let mut config = Config::default();
        config.apply_overrides(&store(&[(DEFAULT_PREDICTION_COUNT, "zero")]));
        assert_eq!(config.predict.default_count, 5);
    }

    #[test]
    fn secrets_resolve() {
        let secrets = Secrets::resolve(&store(&[(TELEGRAM_BOT_TOKEN, "t"), (API_KEY, "k")]));
        assert_eq!(secrets.telegram_bot_token.as_deref(), Some("t"));
        assert!(secrets.telegram_chat_id.is_none());
        assert_eq!(secrets.api_key.as_deref(), Some("k"));
    }
}
