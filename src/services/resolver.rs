// src/services/resolver.rs

//! Primary/backup source resolution per game.
//!
//! The primary source is always tried first. Any error, or an empty answer
//! where records are required, falls through to the backup. When both fail
//! the error carries both messages.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::error::{AppError, Result};
use crate::models::{DrawRecord, GameKind, IssueId};
use crate::services::fetcher::Fetch;
use crate::services::sources::{DrawSource, FiveHundredSource, ZhcwSource};

const NO_BACKUP: &str = "no backup source configured";

pub struct Resolver {
    game: GameKind,
    primary: Box<dyn DrawSource>,
    backup: Option<Box<dyn DrawSource>>,
}

/// Why an attempt did not produce data.
fn describe<T>(name: &str, outcome: &Result<Vec<T>>) -> String {
    match outcome {
        Ok(_) => format!("{name}: no records"),
        Err(e) => format!("{name}: {e}"),
    }
}

impl Resolver {
    pub fn new(
        game: GameKind,
        primary: Box<dyn DrawSource>,
        backup: Option<Box<dyn DrawSource>>,
    ) -> Self {
        Self {
            game,
            primary,
            backup,
        }
    }

    /// Standard wiring: zhcw first where it publishes the game, 500.com otherwise.
    pub fn for_game(game: GameKind, fetch: Arc<dyn Fetch>) -> Result<Self> {
        let five_hundred = Box::new(FiveHundredSource::new(game, Arc::clone(&fetch)));
        if ZhcwSource::supports(game) {
            let zhcw = Box::new(ZhcwSource::new(game, fetch)?);
            Ok(Self::new(game, zhcw, Some(five_hundred)))
        } else {
            Ok(Self::new(game, five_hundred, None))
        }
    }

    pub fn game(&self) -> GameKind {
        self.game
    }

    fn fallback_notice(&self, operation: &str, reason: &str) {
        match &self.backup {
            Some(backup) => log::warn!(
                "[{}] {} failed ({}); trying {}",
                self.game,
                operation,
                reason,
                backup.name()
            ),
            None => log::warn!("[{}] {} failed ({})", self.game, operation, reason),
        }
    }

    /// Newest published draw.
    pub async fn fetch_latest(&self) -> Result<DrawRecord> {
        let primary_error = match self.primary.latest().await {
            Ok(record) => return Ok(record),
            Err(e) => format!("{}: {}", self.primary.name(), e),
        };
        self.fallback_notice("fetch_latest", &primary_error);

        let Some(backup) = &self.backup else {
            return Err(AppError::all_sources_failed(primary_error, NO_BACKUP));
        };
        backup
            .latest()
            .await
            .map_err(|e| AppError::all_sources_failed(primary_error, format!("{}: {}", backup.name(), e)))
    }

    /// Draws between two issues, newest first.
    pub async fn fetch_range(&self, start: &IssueId, end: &IssueId) -> Result<Vec<DrawRecord>> {
        let primary = self.primary.range(start, end).await;
        if let Ok(records) = &primary
            && !records.is_empty()
        {
            return primary;
        }
        let primary_error = describe(self.primary.name(), &primary);
        self.fallback_notice("fetch_range", &primary_error);

        let Some(backup) = &self.backup else {
            return Err(AppError::all_sources_failed(primary_error, NO_BACKUP));
        };
        let secondary = backup.range(start, end).await;
        match secondary {
            Ok(records) if !records.is_empty() => Ok(records),
            other => Err(AppError::all_sources_failed(
                primary_error,
                describe(backup.name(), &other),
            )),
        }
    }

    /// Up to `max_count` draws older than `after` (or the newest), newest first.
    ///
    /// Returns an empty list when every source answered but had nothing
    /// older; that is how a finished backfill shows up.
    pub async fn fetch_all(
        &self,
        max_count: usize,
        after: Option<&IssueId>,
    ) -> Result<Vec<DrawRecord>> {
        let primary = self.primary.history(max_count, after).await;
        if let Ok(records) = &primary
            && !records.is_empty()
        {
            return primary;
        }
        let primary_error = describe(self.primary.name(), &primary);
        self.fallback_notice("fetch_all", &primary_error);

        let Some(backup) = &self.backup else {
            return match primary {
                Ok(empty) => Ok(empty),
                Err(_) => Err(AppError::all_sources_failed(primary_error, NO_BACKUP)),
            };
        };
        let secondary = backup.history(max_count, after).await;
        match (&primary, secondary) {
            (_, Ok(records)) if !records.is_empty() => Ok(records),
            (Ok(_), Ok(empty)) => Ok(empty),
            (_, other) => Err(AppError::all_sources_failed(
                primary_error,
                describe(backup.name(), &other),
            )),
        }
    }

    /// Detail for a single issue. Errors only when every source errored.
    pub async fn fetch_issue(&self, issue: &IssueId) -> Result<Option<DrawRecord>> {
        let primary_error = match self.primary.issue(issue).await {
            Ok(Some(record)) => return Ok(Some(record)),
            Ok(None) => None,
            Err(e) => Some(format!("{}: {}", self.primary.name(), e)),
        };

        let Some(backup) = &self.backup else {
            return match primary_error {
                Some(error) => Err(AppError::all_sources_failed(error, NO_BACKUP)),
                None => Ok(None),
            };
        };
        match (backup.issue(issue).await, primary_error) {
            (Ok(found), _) => Ok(found),
            (Err(_), None) => Ok(None),
            (Err(e), Some(primary_error)) => Err(AppError::all_sources_failed(
                primary_error,
                format!("{}: {}", backup.name(), e),
            )),
        }
    }

    /// Draws between two dates from whichever source supports date queries.
    pub async fn fetch_dates(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<DrawRecord>> {
        let primary = self.primary.dates(from, to).await;
        if let Ok(records) = &primary
            && !records.is_empty()
        {
            return primary;
        }
        let primary_error = describe(self.primary.name(), &primary);

        let Some(backup) = &self.backup else {
            return match primary {
                Ok(empty) => Ok(empty),
                Err(_) => Err(AppError::all_sources_failed(primary_error, NO_BACKUP)),
            };
        };
        self.fallback_notice("fetch_dates", &primary_error);
        match backup.dates(from, to).await {
            Ok(records) if !records.is_empty() => Ok(records),
            Ok(empty) if primary.is_ok() => Ok(empty),
            other => Err(AppError::all_sources_failed(
                primary_error,
                describe(backup.name(), &other),
            )),
        }
    }
}
