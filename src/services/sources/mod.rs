// src/services/sources/mod.rs

//! Upstream draw providers.
//!
//! Each provider exposes its own query shape (issue list plus per-issue
//! detail, or a single range query); [`DrawSource`] normalizes them.

mod five_hundred;
mod zhcw;

pub use five_hundred::FiveHundredSource;
pub use zhcw::ZhcwSource;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::{AppError, Result};
use crate::models::{DrawRecord, GameKind, IssueId};

/// One provider for one game.
#[async_trait]
pub trait DrawSource: Send + Sync {
    /// Short provider name used in logs and error messages.
    fn name(&self) -> &'static str;

    fn game(&self) -> GameKind;

    /// Most recent published draw.
    async fn latest(&self) -> Result<DrawRecord>;

    /// Detail for one issue; `Ok(None)` when the provider does not know it.
    async fn issue(&self, issue: &IssueId) -> Result<Option<DrawRecord>>;

    /// Draws with `start <= issue <= end`.
    async fn range(&self, start: &IssueId, end: &IssueId) -> Result<Vec<DrawRecord>>;

    /// Up to `max_count` draws older than `before` (or the newest ones), newest first.
    async fn history(&self, max_count: usize, before: Option<&IssueId>)
    -> Result<Vec<DrawRecord>>;

    /// Draws between two calendar dates, inclusive.
    async fn dates(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<DrawRecord>> {
        let _ = (from, to);
        Err(AppError::config(format!(
            "{} does not support date queries",
            self.name()
        )))
    }
}

/// Keep records inside `[start, end]`, newest first, without duplicates.
pub(crate) fn clamp_range(
    mut records: Vec<DrawRecord>,
    start: &IssueId,
    end: &IssueId,
) -> Vec<DrawRecord> {
    records.retain(|r| &r.issue >= start && &r.issue <= end);
    records.sort_by(|a, b| b.issue.cmp(&a.issue));
    records.dedup_by(|a, b| a.issue == b.issue);
    records
}
