// src/app.rs

//! Application wiring shared by the CLI and the request handler.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::config::{LayeredConfigStore, Secrets};
use crate::error::{AppError, Result};
use crate::models::{Candidate, Config, DrawRecord, FrequencySummary, GameKind, IssueId};
use crate::pipeline::{BackfillOutcome, SyncController, SyncOutcome};
use crate::services::fetcher::{Fetch, HttpFetcher};
use crate::services::notifier::{ErrorNotifier, Notifier, TelegramNotifier};
use crate::services::predictor::Predictor;
use crate::services::strategies::{StrategyInfo, StrategyRegistry};
use crate::storage::{DrawStore, LocalStorage, UpsertSummary};

/// Top values listed per zone in the daily report.
const REPORT_TOP_PRIMARY: usize = 5;
const REPORT_TOP_SECONDARY: usize = 3;

/// Result of the daily job for one game.
#[derive(Debug, Clone, Serialize)]
pub struct DailyOutcome {
    pub sync: SyncOutcome,
    pub candidates: Vec<Candidate>,
    pub report_sent: bool,
}

pub struct App {
    config: Config,
    secrets: Secrets,
    store: Arc<dyn DrawStore>,
    sync: SyncController,
    predictor: Predictor,
    registry: Arc<StrategyRegistry>,
    notifier: Arc<dyn Notifier>,
    errors: ErrorNotifier,
    rng: Mutex<StdRng>,
}

impl App {
    pub fn new(
        config: Config,
        secrets: Secrets,
        store: Arc<dyn DrawStore>,
        sync: SyncController,
        notifier: Arc<dyn Notifier>,
        rng: StdRng,
    ) -> Self {
        let registry = Arc::new(StrategyRegistry::new());
        let predictor = Predictor::new(
            Arc::clone(&store),
            Arc::clone(&registry),
            config.predict.clone(),
            config.storage.clone(),
        );
        Self {
            errors: ErrorNotifier::new(Arc::clone(&notifier)),
            config,
            secrets,
            store,
            sync,
            predictor,
            registry,
            notifier,
            rng: Mutex::new(rng),
        }
    }

    /// Production wiring: local storage, HTTP sources and Telegram.
    ///
    /// Secrets come from `{root}/secrets.toml` when present, then the environment.
    pub fn bootstrap(config_path: impl AsRef<Path>, storage_root: Option<PathBuf>) -> Result<Self> {
        let config_path = config_path.as_ref();
        let mut config = if config_path.exists() {
            Config::load(config_path)?
        } else {
            log::info!("No config at {:?}, using defaults", config_path);
            Config::default()
        };
        if let Some(root) = storage_root {
            config.storage.root_dir = root.to_string_lossy().into_owned();
        }

        let root = PathBuf::from(&config.storage.root_dir);
        let store_path = root.join("secrets.toml");
        let config_store = LayeredConfigStore::file_then_env(&store_path)?;
        config.apply_overrides(&config_store);
        config.validate()?;
        let secrets = Secrets::resolve(&config_store);

        let store: Arc<dyn DrawStore> = Arc::new(LocalStorage::new(root.clone()));
        let fetch: Arc<dyn Fetch> = Arc::new(HttpFetcher::new(&config.crawler)?);
        let sync = SyncController::for_all_games(Arc::clone(&store), config.sync.clone(), fetch)?;
        let notifier: Arc<dyn Notifier> =
            Arc::new(TelegramNotifier::from_config(&config.crawler, &secrets)?);

        Ok(Self::new(config, secrets, store, sync, notifier, StdRng::from_entropy()))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn api_key(&self) -> Option<&str> {
        self.secrets.api_key.as_deref()
    }

    pub async fn sync(&self, game: GameKind) -> Result<SyncOutcome> {
        self.sync.run(game).await
    }

    pub async fn backfill(&self, game: GameKind) -> Result<BackfillOutcome> {
        let outcome = self.sync.backfill(game).await?;
        if outcome.inserted > 0 {
            self.notifier
                .send_backfill_progress(game, outcome.inserted, outcome.total)
                .await;
        }
        Ok(outcome)
    }

    pub async fn import_range(&self, game: GameKind, start: &IssueId, end: &IssueId) -> Result<UpsertSummary> {
        self.sync.import_range(game, start, end).await
    }

    pub async fn import_dates(&self, game: GameKind, from: NaiveDate, to: NaiveDate) -> Result<UpsertSummary> {
        self.sync.import_dates(game, from, to).await
    }

    /// Sync, then predict and send the report when new draws arrived.
    pub async fn daily(&self, game: GameKind) -> Result<DailyOutcome> {
        let sync = self.sync.run(game).await?;
        if sync.inserted == 0 {
            log::info!("[{}] no new draws, skipping daily report", game);
            return Ok(DailyOutcome {
                sync,
                candidates: Vec::new(),
                report_sent: false,
            });
        }

        let Some(latest) = self.store.latest(game).await? else {
            return Err(AppError::EmptyHistory(game.to_string()));
        };
        let candidates = self.predict(game, None, &[]).await?;
        let stats = self.summary(game, REPORT_TOP_PRIMARY, REPORT_TOP_SECONDARY).await?;
        let report_sent = self
            .notifier
            .send_daily_report(&latest, &candidates, &stats)
            .await;
        if !report_sent {
            log::warn!("[{}] daily report was not delivered", game);
        }
        Ok(DailyOutcome {
            sync,
            candidates,
            report_sent,
        })
    }

    pub async fn latest(&self, game: GameKind) -> Result<Option<DrawRecord>> {
        self.store.latest(game).await
    }

    /// Candidates from the named strategies, or the configured defaults.
    pub async fn predict(
        &self,
        game: GameKind,
        count: Option<usize>,
        strategies: &[String],
    ) -> Result<Vec<Candidate>> {
        let count = count.unwrap_or(self.config.predict.default_count);
        let mut rng = self.rng.lock().await;
        self.predictor
            .predict(game, count, strategies, &mut *rng)
            .await
    }

    pub async fn stats(&self, game: GameKind, top: usize) -> Result<FrequencySummary> {
        self.summary(game, top, top).await
    }

    async fn summary(&self, game: GameKind, primary_n: usize, secondary_n: usize) -> Result<FrequencySummary> {
        let total = self.store.count(game).await?;
        let table = self
            .store
            .frequency(game, self.config.storage.frequency_window)
            .await?;
        Ok(FrequencySummary::new(&table, total, primary_n, secondary_n))
    }

    pub fn strategies(&self) -> Vec<StrategyInfo> {
        self.registry.list()
    }

    pub async fn test_notifier(&self) -> bool {
        if !self.notifier.test_connection().await {
            return false;
        }
        self.notifier
            .send_message("✅ Lottery crawler notifier is connected")
            .await
    }

    /// Report an error through the deduplicating notifier.
    pub async fn report_error(&self, error: &AppError) -> bool {
        self.errors.notify(error).await
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::services::resolver::Resolver;
    use crate::storage::MemoryStorage;
    use crate::testing::{RecordingNotifier, ScriptedSource};

    /// App over memory storage and a scripted SSQ source.
    pub fn app(
        store: MemoryStorage,
        source: ScriptedSource,
        notifier: Arc<RecordingNotifier>,
        api_key: Option<&str>,
    ) -> App {
        let store: Arc<dyn DrawStore> = Arc::new(store);
        let sync = SyncController::new(Arc::clone(&store), Default::default())
            .with_resolver(Resolver::new(GameKind::Ssq, Box::new(source), None));
        let secrets = Secrets {
            api_key: api_key.map(str::to_string),
            ..Secrets::default()
        };
        App::new(
            Config::default(),
            secrets,
            store,
            sync,
            notifier,
            StdRng::seed_from_u64(17),
        )
    }
}
