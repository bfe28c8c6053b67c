// src/pipeline/sync.rs

//! Synchronization of stored draws with the online sources.
//!
//! The mode is re-derived from the stored count on every run:
//!
//! - **Full** (nothing stored): store one bounded batch of the newest
//!   history; [`SyncController::backfill`] continues from there.
//! - **Incremental**: fetch the newest draw and, if it is not stored yet,
//!   walk backwards issue by issue until reaching stored data, too many
//!   consecutive misses, or the per-run cap.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::{DrawRecord, GameKind, IssueId, SyncConfig};
use crate::services::fetcher::Fetch;
use crate::services::resolver::Resolver;
use crate::storage::{DrawStore, UpsertSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    Full,
    Incremental,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Newest online issue is already stored
    AlreadyCurrent,
    /// New draws were stored
    Updated,
    /// A full-mode batch was stored; older history remains
    Partial,
    /// Sources have no more history to offer
    Complete,
}

/// Why a backward walk ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WalkStop {
    /// Reached an issue that is already stored
    Converged,
    /// Too many consecutive issues were missing or failed
    NotFoundLimit,
    /// Collected the maximum number of records for one run
    Cap,
    /// No earlier issue exists for the game
    StartBoundary,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncOutcome {
    pub game: GameKind,
    pub mode: SyncMode,
    pub status: SyncStatus,
    pub inserted: usize,
    pub skipped: usize,
    /// Newest issue seen online, if any
    pub latest_issue: Option<IssueId>,
    /// Newly stored issues, oldest first
    pub new_issues: Vec<IssueId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub walk_stop: Option<WalkStop>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackfillStatus {
    Partial,
    Complete,
}

#[derive(Debug, Clone, Serialize)]
pub struct BackfillOutcome {
    pub game: GameKind,
    pub status: BackfillStatus,
    pub inserted: usize,
    pub skipped: usize,
    /// Stored draws after this batch
    pub total: usize,
    pub oldest_issue: Option<IssueId>,
}

/// Drives full and incremental synchronization per game.
pub struct SyncController {
    store: Arc<dyn DrawStore>,
    config: SyncConfig,
    resolvers: HashMap<GameKind, Resolver>,
}

impl SyncController {
    pub fn new(store: Arc<dyn DrawStore>, config: SyncConfig) -> Self {
        Self {
            store,
            config,
            resolvers: HashMap::new(),
        }
    }

    /// Controller with the standard source wiring for every game.
    pub fn for_all_games(
        store: Arc<dyn DrawStore>,
        config: SyncConfig,
        fetch: Arc<dyn Fetch>,
    ) -> Result<Self> {
        GameKind::ALL
            .into_iter()
            .try_fold(Self::new(store, config), |controller, game| {
                Ok(controller.with_resolver(Resolver::for_game(game, Arc::clone(&fetch))?))
            })
    }

    pub fn with_resolver(mut self, resolver: Resolver) -> Self {
        self.resolvers.insert(resolver.game(), resolver);
        self
    }

    fn resolver(&self, game: GameKind) -> Result<&Resolver> {
        self.resolvers
            .get(&game)
            .ok_or_else(|| AppError::config(format!("No sources configured for {game}")))
    }

    /// Bring the stored draws of `game` up to date.
    pub async fn run(&self, game: GameKind) -> Result<SyncOutcome> {
        let resolver = self.resolver(game)?;
        let stored = self.store.count(game).await?;

        if stored == 0 {
            log::info!("[{}] no stored draws, starting full sync", game);
            return self.full_sync(game, resolver).await;
        }
        log::info!("[{}] {} stored draws, running incremental sync", game, stored);
        self.incremental_sync(game, resolver).await
    }

    async fn full_sync(&self, game: GameKind, resolver: &Resolver) -> Result<SyncOutcome> {
        let records = resolver
            .fetch_all(self.config.full_batch_size, None)
            .await?;
        let latest_issue = records.iter().map(|r| r.issue.clone()).max();
        let (summary, new_issues) = self.persist(game, records).await?;

        let reached_start = new_issues
            .first()
            .is_none_or(|oldest| oldest.is_at_start_boundary(game));
        Ok(SyncOutcome {
            game,
            mode: SyncMode::Full,
            status: if reached_start {
                SyncStatus::Complete
            } else {
                SyncStatus::Partial
            },
            inserted: summary.inserted,
            skipped: summary.skipped,
            latest_issue,
            new_issues,
            walk_stop: None,
        })
    }

    async fn incremental_sync(&self, game: GameKind, resolver: &Resolver) -> Result<SyncOutcome> {
        let online = resolver.fetch_latest().await?;
        let stored_latest = self.store.latest(game).await?;

        let already_stored = stored_latest
            .as_ref()
            .is_some_and(|r| r.issue == online.issue)
            || self.store.exists(game, &online.issue).await?;
        if already_stored {
            log::info!("[{}] already current at {}", game, online.issue);
            return Ok(SyncOutcome {
                game,
                mode: SyncMode::Incremental,
                status: SyncStatus::AlreadyCurrent,
                inserted: 0,
                skipped: 0,
                latest_issue: Some(online.issue),
                new_issues: Vec::new(),
                walk_stop: None,
            });
        }

        log::info!(
            "[{}] online {} is ahead of stored {}",
            game,
            online.issue,
            stored_latest
                .as_ref()
                .map(|r| r.issue.as_str())
                .unwrap_or("-")
        );
        let latest_issue = online.issue.clone();
        let (collected, stop) = self.walk_back(game, resolver, online).await?;
        log::info!(
            "[{}] backward walk collected {} draws ({:?})",
            game,
            collected.len(),
            stop
        );
        let (summary, new_issues) = self.persist(game, collected).await?;

        Ok(SyncOutcome {
            game,
            mode: SyncMode::Incremental,
            status: SyncStatus::Updated,
            inserted: summary.inserted,
            skipped: summary.skipped,
            latest_issue: Some(latest_issue),
            new_issues,
            walk_stop: Some(stop),
        })
    }

    /// Collect draws older than `newest` until convergence or a limit.
    ///
    /// Fetch errors count as misses. Right after crossing into the previous
    /// year the walk starts from an upper bound, so extra misses are allowed
    /// until the first hit.
    async fn walk_back(
        &self,
        game: GameKind,
        resolver: &Resolver,
        newest: DrawRecord,
    ) -> Result<(Vec<DrawRecord>, WalkStop)> {
        let mut current = newest.issue.clone();
        let mut collected = vec![newest];
        let mut misses = 0;
        let mut allowed_misses = self.config.max_consecutive_not_found;

        let stop = loop {
            if collected.len() >= self.config.max_new_records {
                break WalkStop::Cap;
            }
            let Some(step) = current.predecessor(game) else {
                break WalkStop::StartBoundary;
            };
            if step.crossed_year {
                log::debug!("[{}] crossing into {} at {}", game, step.issue.year(), step.issue);
                misses = 0;
                allowed_misses = self.config.max_consecutive_not_found + self.config.rollover_slack;
            }
            current = step.issue;

            if self.store.exists(game, &current).await? {
                break WalkStop::Converged;
            }

            match resolver.fetch_issue(&current).await {
                Ok(Some(record)) => {
                    log::debug!("[{}] fetched {}", game, record.issue);
                    collected.push(record);
                    misses = 0;
                    allowed_misses = self.config.max_consecutive_not_found;
                }
                Ok(None) => {
                    misses += 1;
                    log::warn!("[{}] issue {} not found ({} in a row)", game, current, misses);
                }
                Err(e) => {
                    misses += 1;
                    log::warn!("[{}] fetching {} failed: {}", game, current, e);
                }
            }
            if misses >= allowed_misses {
                break WalkStop::NotFoundLimit;
            }
        };
        Ok((collected, stop))
    }

    /// Continue a full backfill from the oldest stored issue.
    pub async fn backfill(&self, game: GameKind) -> Result<BackfillOutcome> {
        let resolver = self.resolver(game)?;
        let oldest = self.store.oldest(game).await?;

        if let Some(oldest) = &oldest
            && oldest.issue.is_at_start_boundary(game)
        {
            log::info!("[{}] backfill already reached {}", game, oldest.issue);
            return self
                .backfill_outcome(game, BackfillStatus::Complete, UpsertSummary::default())
                .await;
        }

        let before = oldest.as_ref().map(|r| &r.issue);
        log::info!(
            "[{}] backfilling {} draws before {}",
            game,
            self.config.full_batch_size,
            before.map(|i| i.as_str()).unwrap_or("latest")
        );
        let records = resolver
            .fetch_all(self.config.full_batch_size, before)
            .await?;
        if records.is_empty() {
            log::info!("[{}] sources report no older draws", game);
            return self
                .backfill_outcome(game, BackfillStatus::Complete, UpsertSummary::default())
                .await;
        }

        let (summary, new_issues) = self.persist(game, records).await?;
        let status = match new_issues.first() {
            Some(oldest) if oldest.is_at_start_boundary(game) => BackfillStatus::Complete,
            _ => BackfillStatus::Partial,
        };
        self.backfill_outcome(game, status, summary).await
    }

    async fn backfill_outcome(
        &self,
        game: GameKind,
        status: BackfillStatus,
        summary: UpsertSummary,
    ) -> Result<BackfillOutcome> {
        Ok(BackfillOutcome {
            game,
            status,
            inserted: summary.inserted,
            skipped: summary.skipped,
            total: self.store.count(game).await?,
            oldest_issue: self.store.oldest(game).await?.map(|r| r.issue),
        })
    }

    /// Fetch and store the draws between two issues.
    pub async fn import_range(
        &self,
        game: GameKind,
        start: &IssueId,
        end: &IssueId,
    ) -> Result<UpsertSummary> {
        let records = self.resolver(game)?.fetch_range(start, end).await?;
        log::info!("[{}] importing {} draws from {} to {}", game, records.len(), start, end);
        Ok(self.persist(game, records).await?.0)
    }

    /// Fetch and store the draws between two dates.
    pub async fn import_dates(
        &self,
        game: GameKind,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<UpsertSummary> {
        let records = self.resolver(game)?.fetch_dates(from, to).await?;
        log::info!("[{}] importing {} draws from {} to {}", game, records.len(), from, to);
        Ok(self.persist(game, records).await?.0)
    }

    /// Store records oldest first; returns the summary and the stored issues.
    ///
    /// The batch is written as one unit. A failed write stores none of its
    /// records and fails the sync with the storage error.
    pub async fn persist(
        &self,
        game: GameKind,
        mut records: Vec<DrawRecord>,
    ) -> Result<(UpsertSummary, Vec<IssueId>)> {
        records.sort_by(|a, b| a.issue.cmp(&b.issue));
        records.dedup_by(|a, b| a.issue == b.issue);

        let mut new_issues = Vec::with_capacity(records.len());
        for record in &records {
            if !self.store.exists(game, &record.issue).await? {
                new_issues.push(record.issue.clone());
            }
        }
        let summary = self.store.upsert_batch(game, &records).await?;
        Ok((summary, new_issues))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::sources::DrawSource;
    use crate::storage::{LocalStorage, MemoryStorage};
    use crate::testing::{ScriptedSource, ssq_record};

    fn config() -> SyncConfig {
        SyncConfig::default()
    }

    fn controller(store: &MemoryStorage, primary: ScriptedSource, config: SyncConfig) -> SyncController {
        SyncController::new(Arc::new(store.clone()), config)
            .with_resolver(Resolver::new(GameKind::Ssq, Box::new(primary), None))
    }

    async fn seed(store: &MemoryStorage, issues: &[&str]) {
        let records: Vec<_> = issues
            .iter()
            .enumerate()
            .map(|(i, issue)| ssq_record(issue, i as u8))
            .collect();
        store.upsert_batch(GameKind::Ssq, &records).await.unwrap();
    }

    async fn stored_issues(store: &MemoryStorage) -> Vec<String> {
        let mut issues: Vec<String> = store
            .recent(GameKind::Ssq, 1000)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.issue.to_string())
            .collect();
        issues.sort();
        issues
    }

    #[tokio::test]
    async fn backward_walk_fills_gap_until_stored_issue() {
        let store = MemoryStorage::new();
        seed(&store, &["2024149", "2024150"]).await;
        let source = ScriptedSource::new("primary")
            .with(ssq_record("2024151", 5))
            .with(ssq_record("2024152", 6));

        let outcome = controller(&store, source, config())
            .run(GameKind::Ssq)
            .await
            .unwrap();

        assert_eq!(outcome.mode, SyncMode::Incremental);
        assert_eq!(outcome.status, SyncStatus::Updated);
        assert_eq!(outcome.walk_stop, Some(WalkStop::Converged));
        assert_eq!(outcome.inserted, 2);
        let new: Vec<_> = outcome.new_issues.iter().map(|i| i.to_string()).collect();
        assert_eq!(new, vec!["2024151", "2024152"]);
    }

    #[tokio::test]
    async fn walk_fetches_each_missing_issue_once() {
        let store = MemoryStorage::new();
        seed(&store, &["2024150"]).await;
        let source = Arc::new(
            ScriptedSource::new("primary")
                .with(ssq_record("2024151", 5))
                .with(ssq_record("2024152", 6)),
        );
        let controller = SyncController::new(Arc::new(store.clone()), config()).with_resolver(
            Resolver::new(GameKind::Ssq, Box::new(Shared(Arc::clone(&source))), None),
        );

        controller.run(GameKind::Ssq).await.unwrap();
        assert_eq!(source.calls(), vec!["latest", "issue:2024151"]);
    }

    #[tokio::test]
    async fn already_current_writes_nothing() {
        let store = MemoryStorage::new();
        seed(&store, &["2024151", "2024152"]).await;
        let source = ScriptedSource::new("primary").with(ssq_record("2024152", 1));

        let outcome = controller(&store, source, config())
            .run(GameKind::Ssq)
            .await
            .unwrap();

        assert_eq!(outcome.status, SyncStatus::AlreadyCurrent);
        assert_eq!(outcome.inserted, 0);
        assert_eq!(store.count(GameKind::Ssq).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn walk_stops_after_consecutive_misses() {
        let store = MemoryStorage::new();
        seed(&store, &["2024100"]).await;
        // 2024151..2024159 are unknown to the source
        let source = ScriptedSource::new("primary").with(ssq_record("2024160", 1));

        let outcome = controller(&store, source, config())
            .run(GameKind::Ssq)
            .await
            .unwrap();

        assert_eq!(outcome.walk_stop, Some(WalkStop::NotFoundLimit));
        assert_eq!(outcome.inserted, 1);
        assert_eq!(stored_issues(&store).await, vec!["2024100", "2024160"]);
    }

    #[tokio::test]
    async fn walk_respects_record_cap() {
        let store = MemoryStorage::new();
        seed(&store, &["2024001"]).await;
        let mut source = ScriptedSource::new("primary");
        for seq in 2..=40 {
            source = source.with(ssq_record(&format!("2024{seq:03}"), seq as u8));
        }
        let config = SyncConfig {
            max_new_records: 5,
            ..SyncConfig::default()
        };

        let outcome = controller(&store, source, config)
            .run(GameKind::Ssq)
            .await
            .unwrap();

        assert_eq!(outcome.walk_stop, Some(WalkStop::Cap));
        assert_eq!(outcome.inserted, 5);
        let new: Vec<_> = outcome.new_issues.iter().map(|i| i.to_string()).collect();
        assert_eq!(new, vec!["2024036", "2024037", "2024038", "2024039", "2024040"]);
    }

    #[tokio::test]
    async fn walk_crosses_year_boundary() {
        let store = MemoryStorage::new();
        seed(&store, &["2023150"]).await;
        // last real issue of 2023 is 151, six below the calendar bound
        let source = ScriptedSource::new("primary")
            .with(ssq_record("2023151", 2))
            .with(ssq_record("2024001", 3))
            .with(ssq_record("2024002", 4));

        let outcome = controller(&store, source, config())
            .run(GameKind::Ssq)
            .await
            .unwrap();

        assert_eq!(outcome.walk_stop, Some(WalkStop::Converged));
        let new: Vec<_> = outcome.new_issues.iter().map(|i| i.to_string()).collect();
        assert_eq!(new, vec!["2023151", "2024001", "2024002"]);
    }

    #[tokio::test]
    async fn total_source_failure_aborts_sync() {
        let store = MemoryStorage::new();
        seed(&store, &["2024150"]).await;
        let err = controller(&store, ScriptedSource::new("primary").failing(), config())
            .run(GameKind::Ssq)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AllSourcesFailed { .. }));
        assert_eq!(store.count(GameKind::Ssq).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn empty_store_runs_bounded_full_batch() {
        let store = MemoryStorage::new();
        let mut source = ScriptedSource::new("primary");
        for seq in 1..=30 {
            source = source.with(ssq_record(&format!("2024{seq:03}"), seq as u8));
        }
        let config = SyncConfig {
            full_batch_size: 10,
            ..SyncConfig::default()
        };

        let outcome = controller(&store, source, config)
            .run(GameKind::Ssq)
            .await
            .unwrap();

        assert_eq!(outcome.mode, SyncMode::Full);
        assert_eq!(outcome.status, SyncStatus::Partial);
        assert_eq!(outcome.inserted, 10);
        assert_eq!(outcome.latest_issue.unwrap().as_str(), "2024030");
        assert_eq!(outcome.new_issues.first().unwrap().as_str(), "2024021");
    }

    #[tokio::test]
    async fn backfill_continues_from_oldest_until_exhausted() {
        let store = MemoryStorage::new();
        let mut source = ScriptedSource::new("primary");
        for seq in 1..=25 {
            source = source.with(ssq_record(&format!("2024{seq:03}"), seq as u8));
        }
        let source = Arc::new(source);
        let config = SyncConfig {
            full_batch_size: 10,
            ..SyncConfig::default()
        };
        let controller = SyncController::new(Arc::new(store.clone()), config).with_resolver(
            Resolver::new(GameKind::Ssq, Box::new(Shared(Arc::clone(&source))), None),
        );

        let first = controller.backfill(GameKind::Ssq).await.unwrap();
        assert_eq!(first.status, BackfillStatus::Partial);
        assert_eq!(first.total, 10);

        let second = controller.backfill(GameKind::Ssq).await.unwrap();
        assert_eq!(second.status, BackfillStatus::Partial);
        assert_eq!(second.oldest_issue.unwrap().as_str(), "2024006");

        let third = controller.backfill(GameKind::Ssq).await.unwrap();
        assert_eq!(third.inserted, 5);
        assert_eq!(third.total, 25);

        let fourth = controller.backfill(GameKind::Ssq).await.unwrap();
        assert_eq!(fourth.status, BackfillStatus::Complete);
        assert_eq!(fourth.inserted, 0);
        assert!(source.calls().contains(&"history:10:2024006".to_string()));
    }

    #[tokio::test]
    async fn backfill_at_start_boundary_is_complete() {
        let store = MemoryStorage::new();
        seed(&store, &["2003001"]).await;
        let outcome = controller(&store, ScriptedSource::new("primary").failing(), config())
            .backfill(GameKind::Ssq)
            .await
            .unwrap();
        assert_eq!(outcome.status, BackfillStatus::Complete);
    }

    #[tokio::test]
    async fn import_range_skips_stored_issues() {
        let store = MemoryStorage::new();
        seed(&store, &["2024011"]).await;
        let mut source = ScriptedSource::new("primary");
        for seq in 10..=12 {
            source = source.with(ssq_record(&format!("2024{seq:03}"), seq as u8));
        }
        let start = IssueId::normalize("2024010").unwrap();
        let end = IssueId::normalize("2024012").unwrap();

        let summary = controller(&store, source, config())
            .import_range(GameKind::Ssq, &start, &end)
            .await
            .unwrap();
        assert_eq!(summary, UpsertSummary { inserted: 2, skipped: 1 });
    }

    #[tokio::test]
    async fn failed_write_stores_nothing() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("draws/ssq.tmp")).unwrap();
        let store: Arc<dyn DrawStore> = Arc::new(LocalStorage::new(tmp.path()));
        let source = ScriptedSource::new("primary")
            .with(ssq_record("2024001", 1))
            .with(ssq_record("2024002", 2));
        let controller = SyncController::new(Arc::clone(&store), config())
            .with_resolver(Resolver::new(GameKind::Ssq, Box::new(source), None));

        let err = controller.run(GameKind::Ssq).await.unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
        assert_eq!(store.count(GameKind::Ssq).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn unknown_game_is_config_error() {
        let store = MemoryStorage::new();
        let err = controller(&store, ScriptedSource::new("primary"), config())
            .run(GameKind::Dlt)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    /// Lets a test keep a handle on a source owned by the resolver.
    struct Shared(Arc<ScriptedSource>);

    #[async_trait::async_trait]
    impl DrawSource for Shared {
        fn name(&self) -> &'static str {
            self.0.name()
        }

        fn game(&self) -> GameKind {
            self.0.game()
        }

        async fn latest(&self) -> Result<DrawRecord> {
            self.0.latest().await
        }

        async fn issue(&self, issue: &IssueId) -> Result<Option<DrawRecord>> {
            self.0.issue(issue).await
        }

        async fn range(&self, start: &IssueId, end: &IssueId) -> Result<Vec<DrawRecord>> {
            self.0.range(start, end).await
        }

        async fn history(
            &self,
            max_count: usize,
            before: Option<&IssueId>,
        ) -> Result<Vec<DrawRecord>> {
            self.0.history(max_count, before).await
        }
    }
}
