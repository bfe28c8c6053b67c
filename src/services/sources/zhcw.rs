// src/services/sources/zhcw.rs

//! zhcw.com JSON API: issue listing plus per-issue detail.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};

use crate::error::{AppError, Result};
use crate::models::{DrawRecord, GameKind, IssueId};
use crate::services::fetcher::{Fetch, SourceRequest};
use crate::services::parsers::{DrawParser, ZhcwDetailParser, ZhcwPageParser, parse_issue_list};
use crate::services::sources::{DrawSource, clamp_range};
use crate::utils::build_url;
use crate::utils::http::ACCEPT_JSON;

const API_URL: &str = "https://jc.zhcw.com/port/client_json.php";
const REFERER: &str = "https://www.zhcw.com/";
const NAME: &str = "zhcw";

const TX_DATE_RANGE: &str = "10001001";
const TX_DETAIL: &str = "10001002";
const TX_ISSUE_LIST: &str = "10001003";

/// Largest listing the API serves in one call.
const MAX_LIST: usize = 1000;
const PAGE_SIZE: usize = 100;
const MAX_PAGES: usize = 10;

pub struct ZhcwSource {
    game: GameKind,
    lottery_id: &'static str,
    fetch: Arc<dyn Fetch>,
    detail: ZhcwDetailParser,
    page: ZhcwPageParser,
}

impl ZhcwSource {
    /// zhcw only publishes the welfare-lottery games.
    pub fn supports(game: GameKind) -> bool {
        Self::lottery_id(game).is_some()
    }

    fn lottery_id(game: GameKind) -> Option<&'static str> {
        match game {
            GameKind::Ssq => Some("1"),
            GameKind::Qlc => Some("3"),
            GameKind::Dlt | GameKind::Qxc => None,
        }
    }

    pub fn new(game: GameKind, fetch: Arc<dyn Fetch>) -> Result<Self> {
        let lottery_id = Self::lottery_id(game)
            .ok_or_else(|| AppError::config(format!("zhcw does not publish {game}")))?;
        Ok(Self {
            game,
            lottery_id,
            fetch,
            detail: ZhcwDetailParser::new(game),
            page: ZhcwPageParser::new(game),
        })
    }

    async fn call(&self, transaction: &str, extra: Vec<(&str, String)>) -> Result<String> {
        let mut params = vec![
            ("transactionType", transaction.to_string()),
            ("lotteryId", self.lottery_id.to_string()),
        ];
        params.extend(extra);
        params.push(("tt", Utc::now().timestamp_millis().to_string()));

        let request = SourceRequest {
            url: build_url(API_URL, &params)?,
            referer: REFERER,
            accept: ACCEPT_JSON,
        };
        let body = self.fetch.fetch(&request).await?;
        if body.trim().is_empty() {
            return Err(AppError::parse(NAME, "empty response"));
        }
        Ok(body)
    }

    /// Newest-first issue numbers, at most `count`.
    async fn list_issues(&self, count: usize) -> Result<Vec<IssueId>> {
        let body = self
            .call(TX_ISSUE_LIST, vec![("count", count.min(MAX_LIST).to_string())])
            .await?;
        let raw = parse_issue_list(&body)
            .ok_or_else(|| AppError::parse(NAME, "issue list request was rejected"))?;
        let issues: Vec<IssueId> = raw.iter().filter_map(|s| IssueId::normalize(s)).collect();
        if issues.is_empty() {
            return Err(AppError::parse(NAME, "issue list is empty"));
        }
        Ok(issues)
    }

    /// Fetch details one by one, skipping issues that fail.
    async fn details(&self, issues: &[IssueId]) -> Vec<DrawRecord> {
        let mut records = Vec::with_capacity(issues.len());
        for issue in issues {
            match self.issue(issue).await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => log::warn!("[{}] no detail for {} {}", NAME, self.game, issue),
                Err(e) => log::warn!("[{}] detail {} {} failed: {}", NAME, self.game, issue, e),
            }
        }
        records
    }
}

#[async_trait]
impl DrawSource for ZhcwSource {
    fn name(&self) -> &'static str {
        NAME
    }

    fn game(&self) -> GameKind {
        self.game
    }

    async fn latest(&self) -> Result<DrawRecord> {
        let issues = self.list_issues(1).await?;
        let newest = issues
            .first()
            .ok_or_else(|| AppError::parse(NAME, "issue list is empty"))?;
        self.issue(newest)
            .await?
            .ok_or_else(|| AppError::parse(NAME, format!("no detail for latest issue {newest}")))
    }

    async fn issue(&self, issue: &IssueId) -> Result<Option<DrawRecord>> {
        let body = self
            .call(TX_DETAIL, vec![("issue", issue.to_string())])
            .await?;
        Ok(self
            .detail
            .parse(&body)
            .into_iter()
            .find(|r| &r.issue == issue))
    }

    async fn range(&self, start: &IssueId, end: &IssueId) -> Result<Vec<DrawRecord>> {
        let wanted: Vec<IssueId> = self
            .list_issues(MAX_LIST)
            .await?
            .into_iter()
            .filter(|i| i >= start && i <= end)
            .collect();
        Ok(clamp_range(self.details(&wanted).await, start, end))
    }

    async fn history(
        &self,
        max_count: usize,
        before: Option<&IssueId>,
    ) -> Result<Vec<DrawRecord>> {
        let listed = self.list_issues(MAX_LIST).await?;
        if let (Some(before), Some(oldest)) = (before, listed.last())
            && before <= oldest
        {
            log::info!(
                "[{}] {} listing ends at {}; nothing older than {}",
                NAME,
                self.game,
                oldest,
                before
            );
            return Ok(Vec::new());
        }

        let wanted: Vec<IssueId> = listed
            .into_iter()
            .filter(|i| before.is_none_or(|b| i < b))
            .take(max_count)
            .collect();
        log::info!("[{}] fetching {} {} details", NAME, wanted.len(), self.game);
        Ok(self.details(&wanted).await)
    }

    async fn dates(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<DrawRecord>> {
        let mut records = Vec::new();
        for page in 1..=MAX_PAGES {
            let body = self
                .call(
                    TX_DATE_RANGE,
                    vec![
                        ("startDate", from.to_string()),
                        ("endDate", to.to_string()),
                        ("pageNum", page.to_string()),
                        ("pageSize", PAGE_SIZE.to_string()),
                        ("type", "2".to_string()),
                    ],
                )
                .await?;
            let rows = self.page.parse(&body);
            let done = rows.len() < PAGE_SIZE;
            records.extend(rows);
            if done {
                break;
            }
        }
        Ok(records)
    }
}
