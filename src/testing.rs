// src/testing.rs

//! Scripted collaborators shared by unit tests.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Days, NaiveDate};

use crate::error::{AppError, Result};
use crate::models::{Balls, Candidate, DrawRecord, FrequencySummary, GameKind, IssueId};
use crate::services::fetcher::{Fetch, SourceRequest};
use crate::services::notifier::Notifier;
use crate::services::sources::DrawSource;

/// Valid SSQ draw whose numbers are derived from `seed`.
pub fn ssq_record(issue: &str, seed: u8) -> DrawRecord {
    let base = seed % 20;
    let primary = vec![base + 1, base + 3, base + 5, base + 8, base + 11, base + 14];
    let secondary = vec![seed % 16 + 1];
    record(GameKind::Ssq, issue, Balls::new(primary, secondary))
}

/// Record with a draw date derived from the issue sequence.
pub fn record(game: GameKind, issue: &str, balls: Balls) -> DrawRecord {
    let issue = IssueId::normalize(issue).unwrap();
    let date = NaiveDate::from_ymd_opt(issue.year(), 1, 1)
        .unwrap()
        .checked_add_days(Days::new(u64::from(issue.sequence()) * 2))
        .unwrap();
    DrawRecord::new(game, issue, date, balls).unwrap()
}

/// Fetcher answering from a list of (URL substring, body) rules; unmatched URLs get a 404.
#[derive(Default)]
pub struct ScriptedFetcher {
    rules: Vec<(String, String)>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, pattern: &str, body: &str) -> Self {
        self.rules.push((pattern.to_string(), body.to_string()));
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetch for ScriptedFetcher {
    async fn fetch(&self, request: &SourceRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.url.clone());
        self.rules
            .iter()
            .find(|(pattern, _)| request.url.contains(pattern.as_str()))
            .map(|(_, body)| body.clone())
            .ok_or_else(|| AppError::network(&request.url, "HTTP 404 Not Found"))
    }
}

/// In-memory source serving a fixed set of draws.
pub struct ScriptedSource {
    name: &'static str,
    draws: BTreeMap<IssueId, DrawRecord>,
    failing: bool,
    calls: Mutex<Vec<String>>,
}

impl ScriptedSource {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            draws: BTreeMap::new(),
            failing: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with(mut self, record: DrawRecord) -> Self {
        self.draws.insert(record.issue.clone(), record);
        self
    }

    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn log(&self, call: String) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        if self.failing {
            return Err(AppError::network(self.name, "connection refused"));
        }
        Ok(())
    }
}

#[async_trait]
impl DrawSource for ScriptedSource {
    fn name(&self) -> &'static str {
        self.name
    }

    fn game(&self) -> GameKind {
        GameKind::Ssq
    }

    async fn latest(&self) -> Result<DrawRecord> {
        self.log("latest".into())?;
        self.draws
            .values()
            .next_back()
            .cloned()
            .ok_or_else(|| AppError::parse(self.name, "no rows"))
    }

    async fn issue(&self, issue: &IssueId) -> Result<Option<DrawRecord>> {
        self.log(format!("issue:{issue}"))?;
        Ok(self.draws.get(issue).cloned())
    }

    async fn range(&self, start: &IssueId, end: &IssueId) -> Result<Vec<DrawRecord>> {
        self.log(format!("range:{start}-{end}"))?;
        Ok(self
            .draws
            .range(start.clone()..=end.clone())
            .rev()
            .map(|(_, r)| r.clone())
            .collect())
    }

    async fn history(
        &self,
        max_count: usize,
        before: Option<&IssueId>,
    ) -> Result<Vec<DrawRecord>> {
        self.log(format!(
            "history:{max_count}:{}",
            before.map(|b| b.to_string()).unwrap_or_default()
        ))?;
        Ok(self
            .draws
            .values()
            .rev()
            .filter(|r| before.is_none_or(|b| &r.issue < b))
            .take(max_count)
            .cloned()
            .collect())
    }
}

/// Notifier that records what it was asked to send.
#[derive(Default)]
pub struct RecordingNotifier {
    pub messages: Mutex<Vec<String>>,
    pub fail: bool,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    fn push(&self, message: String) -> bool {
        self.messages.lock().unwrap().push(message);
        !self.fail
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_message(&self, text: &str) -> bool {
        self.push(text.to_string())
    }

    async fn send_daily_report(
        &self,
        latest: &DrawRecord,
        candidates: &[Candidate],
        _stats: &FrequencySummary,
    ) -> bool {
        self.push(format!("report:{}:{}", latest.issue, candidates.len()))
    }

    async fn send_error(&self, error: &AppError) -> bool {
        self.push(format!("error:{}", error.kind()))
    }

    async fn send_backfill_progress(&self, game: GameKind, inserted: usize, total: usize) -> bool {
        self.push(format!("backfill:{game}:{inserted}:{total}"))
    }

    async fn test_connection(&self) -> bool {
        !self.fail
    }
}
