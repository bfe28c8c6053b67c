// src/services/sources/five_hundred.rs

//! datachart.500.com history pages: one range query per request.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::{DrawRecord, GameKind, IssueId};
use crate::services::fetcher::{Fetch, SourceRequest};
use crate::services::parsers::{DrawParser, five_hundred_parser};
use crate::services::sources::{DrawSource, clamp_range};
use crate::utils::build_url;
use crate::utils::http::ACCEPT_HTML;

const REFERER: &str = "https://www.500.com/";
const NAME: &str = "500.com";

/// Range windows requested by one `history` call before giving up.
const MAX_WINDOWS: usize = 10;

pub struct FiveHundredSource {
    game: GameKind,
    fetch: Arc<dyn Fetch>,
    parser: Box<dyn DrawParser>,
}

impl FiveHundredSource {
    pub fn new(game: GameKind, fetch: Arc<dyn Fetch>) -> Self {
        Self {
            game,
            fetch,
            parser: five_hundred_parser(game),
        }
    }

    fn base_url(&self) -> &'static str {
        match self.game {
            GameKind::Ssq => "https://datachart.500.com/ssq/history/newinc/history.php",
            GameKind::Dlt => "https://datachart.500.com/dlt/history/newinc/history.php",
            GameKind::Qlc => "https://datachart.500.com/qlc/history/newinc/history.php",
            GameKind::Qxc => "https://datachart.500.com/qxc/history/inc/history.php",
        }
    }

    async fn page(&self, window: Option<(&IssueId, &IssueId)>) -> Result<Vec<DrawRecord>> {
        let params = match window {
            Some((start, end)) => vec![
                ("start", start.short_form().to_string()),
                ("end", end.short_form().to_string()),
            ],
            None => Vec::new(),
        };
        let request = SourceRequest {
            url: build_url(self.base_url(), &params)?,
            referer: REFERER,
            accept: ACCEPT_HTML,
        };
        let body = self.fetch.fetch(&request).await?;
        Ok(self.parser.parse(&body))
    }
}

#[async_trait]
impl DrawSource for FiveHundredSource {
    fn name(&self) -> &'static str {
        NAME
    }

    fn game(&self) -> GameKind {
        self.game
    }

    async fn latest(&self) -> Result<DrawRecord> {
        // Without parameters the page lists the most recent draws.
        self.page(None)
            .await?
            .into_iter()
            .max_by(|a, b| a.issue.cmp(&b.issue))
            .ok_or_else(|| AppError::parse(NAME, format!("no {} rows on latest page", self.game)))
    }

    async fn issue(&self, issue: &IssueId) -> Result<Option<DrawRecord>> {
        Ok(self
            .page(Some((issue, issue)))
            .await?
            .into_iter()
            .find(|r| &r.issue == issue))
    }

    async fn range(&self, start: &IssueId, end: &IssueId) -> Result<Vec<DrawRecord>> {
        let records = self.page(Some((start, end))).await?;
        Ok(clamp_range(records, start, end))
    }

    /// Walks backwards one year-bounded window at a time.
    async fn history(
        &self,
        max_count: usize,
        before: Option<&IssueId>,
    ) -> Result<Vec<DrawRecord>> {
        let mut end = match before {
            Some(cursor) => match cursor.predecessor(self.game) {
                Some(step) => step.issue,
                None => return Ok(Vec::new()),
            },
            None => self.latest().await?.issue,
        };

        let mut collected: Vec<DrawRecord> = Vec::new();
        for _ in 0..MAX_WINDOWS {
            let remaining = max_count.saturating_sub(collected.len());
            if remaining == 0 {
                break;
            }
            let span = u32::try_from(remaining).unwrap_or(u32::MAX).saturating_sub(1);
            let first_sequence = end.sequence().saturating_sub(span).max(1);
            let start = IssueId::from_parts(end.year(), first_sequence);

            let window = self.range(&start, &end).await?;
            log::debug!(
                "[{}] {} window {}..={} gave {} rows",
                NAME,
                self.game,
                start,
                end,
                window.len()
            );
            collected.extend(window);

            match start.predecessor(self.game) {
                Some(step) => end = step.issue,
                None => break,
            }
        }

        collected.sort_by(|a, b| b.issue.cmp(&a.issue));
        collected.dedup_by(|a, b| a.issue == b.issue);
        collected.truncate(max_count);
        Ok(collected)
    }
}
