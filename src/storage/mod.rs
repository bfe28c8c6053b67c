//! Storage abstractions for draw persistence.
//!
//! Each game is one table of draws keyed by issue. Writes are
//! insert-if-absent; aggregates read only a bounded recent window.
//!
//! ## Directory Structure
//!
//! ```text
//! storage/
//! ├── config.toml           # Application configuration
//! ├── secrets.toml          # Credentials (optional, env fallback)
//! └── draws/
//!     ├── ssq.json
//!     ├── dlt.json
//!     ├── qlc.json
//!     └── qxc.json
//! ```

pub mod local;
pub mod memory;

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{DrawRecord, FrequencyTable, GameKind, HistoricalCombinationSet, IssueId};

// Re-export for convenience
pub use local::LocalStorage;
pub use memory::MemoryStorage;

/// Outcome of a batch write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpsertSummary {
    pub inserted: usize,
    pub skipped: usize,
}

/// A persisted draw with its insertion sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredDraw {
    /// Monotonic per game, follows issue order within a batch
    pub seq: u64,
    pub created_at: DateTime<Utc>,
    pub record: DrawRecord,
}

/// All stored draws of one game.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameTable {
    pub next_seq: u64,
    pub draws: Vec<StoredDraw>,
}

impl GameTable {
    /// Insert records whose issue is not stored yet.
    ///
    /// The batch is sorted by issue first so sequence numbers follow issue
    /// order. Records for another game count as skipped.
    pub fn merge(&mut self, game: GameKind, records: &[DrawRecord]) -> UpsertSummary {
        let mut batch: Vec<&DrawRecord> = records.iter().collect();
        batch.sort_by(|a, b| a.issue.cmp(&b.issue));

        let mut known: HashSet<IssueId> = self.draws.iter().map(|d| d.record.issue.clone()).collect();
        let mut summary = UpsertSummary::default();
        let now = Utc::now();

        for record in batch {
            if record.game != game {
                log::warn!(
                    "Skipping {} record {} in {} batch",
                    record.game,
                    record.issue,
                    game
                );
                summary.skipped += 1;
                continue;
            }
            if !known.insert(record.issue.clone()) {
                summary.skipped += 1;
                continue;
            }
            self.draws.push(StoredDraw {
                seq: self.next_seq,
                created_at: now,
                record: record.clone(),
            });
            self.next_seq += 1;
            summary.inserted += 1;
        }
        summary
    }

    pub fn contains(&self, issue: &IssueId) -> bool {
        self.draws.iter().any(|d| &d.record.issue == issue)
    }

    /// Draws ordered newest first by draw date, then issue.
    pub fn newest_first(&self) -> Vec<&DrawRecord> {
        let mut records: Vec<&DrawRecord> = self.draws.iter().map(|d| &d.record).collect();
        records.sort_by(|a, b| {
            b.draw_date
                .cmp(&a.draw_date)
                .then_with(|| b.issue.cmp(&a.issue))
        });
        records
    }

    pub fn latest(&self) -> Option<&DrawRecord> {
        self.draws.iter().map(|d| &d.record).max_by(|a, b| {
            a.draw_date
                .cmp(&b.draw_date)
                .then_with(|| a.issue.cmp(&b.issue))
        })
    }

    pub fn oldest(&self) -> Option<&DrawRecord> {
        self.draws.iter().map(|d| &d.record).min_by(|a, b| {
            a.draw_date
                .cmp(&b.draw_date)
                .then_with(|| a.issue.cmp(&b.issue))
        })
    }

    pub fn recent(&self, limit: usize) -> Vec<DrawRecord> {
        self.newest_first().into_iter().take(limit).cloned().collect()
    }
}

/// Trait for draw storage backends.
#[async_trait]
pub trait DrawStore: Send + Sync {
    async fn count(&self, game: GameKind) -> Result<usize>;

    async fn exists(&self, game: GameKind, issue: &IssueId) -> Result<bool>;

    /// Insert-if-absent by issue, reporting inserted and skipped counts.
    async fn upsert_batch(&self, game: GameKind, records: &[DrawRecord]) -> Result<UpsertSummary>;

    /// Newest draw by date, ties broken by issue.
    async fn latest(&self, game: GameKind) -> Result<Option<DrawRecord>>;

    /// Oldest draw by date, ties broken by issue.
    async fn oldest(&self, game: GameKind) -> Result<Option<DrawRecord>>;

    /// Up to `limit` draws, newest first.
    async fn recent(&self, game: GameKind, limit: usize) -> Result<Vec<DrawRecord>>;

    /// Counts over the `window` most recent draws only.
    async fn frequency(&self, game: GameKind, window: usize) -> Result<FrequencyTable> {
        let records = self.recent(game, window).await?;
        Ok(FrequencyTable::from_records(game, &records))
    }

    /// Keys of the `window` most recent draws.
    async fn historical_combinations(
        &self,
        game: GameKind,
        window: usize,
    ) -> Result<HistoricalCombinationSet> {
        let records = self.recent(game, window).await?;
        Ok(records.into_iter().map(|r| r.sorted_key).collect())
    }
}
