// src/services/parsers/mod.rs

//! Payload parsers, one per (source, game) layout.
//!
//! Parsers never fail: rows that do not validate are logged at debug level
//! and dropped. Records come back in document order, which is usually
//! newest first; callers sort when order matters.

mod five_hundred;
mod zhcw;

pub use five_hundred::{PlainTableParser, TdataParser, five_hundred_parser};
pub use zhcw::{ZhcwDetailParser, ZhcwPageParser, parse_issue_list};

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::models::{Balls, DrawRecord, GameKind, IssueId};

/// Turns a raw payload into validated draw records.
pub trait DrawParser: Send + Sync {
    fn game(&self) -> GameKind;

    fn parse(&self, payload: &str) -> Vec<DrawRecord>;
}

static DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date pattern is valid"));

/// Shared per-row validation.
pub(crate) struct RowBuilder {
    game: GameKind,
    source: &'static str,
}

impl RowBuilder {
    pub(crate) fn new(game: GameKind, source: &'static str) -> Self {
        Self { game, source }
    }

    /// Build a record from raw cell values, or `None` when any field is off.
    pub(crate) fn build(
        &self,
        raw_issue: &str,
        raw_date: &str,
        primary: Vec<u8>,
        secondary: Vec<u8>,
    ) -> Option<DrawRecord> {
        let Some(issue) = IssueId::normalize(raw_issue) else {
            log::debug!("[{}] skipping row with issue {:?}", self.source, raw_issue);
            return None;
        };
        let raw_date = raw_date.trim();
        let date = DATE_PATTERN
            .is_match(raw_date)
            .then(|| NaiveDate::parse_from_str(raw_date, "%Y-%m-%d").ok())
            .flatten();
        let Some(date) = date else {
            log::debug!("[{}] {} has bad date {:?}", self.source, issue, raw_date);
            return None;
        };
        match DrawRecord::new(self.game, issue, date, Balls::new(primary, secondary)) {
            Ok(record) => Some(record),
            Err(e) => {
                log::debug!("[{}] {} rejected: {}", self.source, raw_issue, e);
                None
            }
        }
    }
}

/// Split whitespace-separated numbers; glued tokens are cut into `width`-digit chunks.
///
/// `"04 09 2721"` with width 2 gives `[4, 9, 27, 21]`.
pub(crate) fn split_numbers(text: &str, width: usize) -> Option<Vec<u8>> {
    let mut numbers = Vec::new();
    for token in text.split_whitespace() {
        if !token.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        if token.len() > width && token.len() % width == 0 {
            for chunk in token.as_bytes().chunks(width) {
                numbers.push(std::str::from_utf8(chunk).ok()?.parse().ok()?);
            }
        } else {
            numbers.push(token.parse().ok()?);
        }
    }
    Some(numbers)
}

/// All digit runs in `text`, as numbers.
pub(crate) fn digit_runs(text: &str) -> Option<Vec<u8>> {
    text.split(|c: char| !c.is_ascii_digit())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_numbers_handles_glued_tokens() {
        assert_eq!(split_numbers("04 09 2721", 2), Some(vec![4, 9, 27, 21]));
        assert_eq!(split_numbers("1 2 3 4567", 1), Some(vec![1, 2, 3, 4, 5, 6, 7]));
        assert_eq!(split_numbers("7\u{a0}8", 2), Some(vec![7, 8]));
        assert_eq!(split_numbers("04 x9", 2), None);
    }

    #[test]
    fn digit_runs_extracts_numbers() {
        assert_eq!(digit_runs("01 05,12|20"), Some(vec![1, 5, 12, 20]));
        assert_eq!(digit_runs(""), Some(vec![]));
        assert_eq!(digit_runs("999"), None);
    }

    #[test]
    fn row_builder_validates_fields() {
        let builder = RowBuilder::new(GameKind::Ssq, "test");
        let primary = vec![1, 5, 12, 20, 28, 33];

        let ok = builder.build("24138", "2024-12-01", primary.clone(), vec![7]);
        assert_eq!(ok.unwrap().issue.as_str(), "2024138");

        assert!(builder.build("241", "2024-12-01", primary.clone(), vec![7]).is_none());
        assert!(builder.build("2024138", "2024/12/01", primary.clone(), vec![7]).is_none());
        assert!(builder.build("2024138", "2024-13-01", primary.clone(), vec![7]).is_none());
        assert!(builder.build("2024138", "2024-12-01", primary, vec![]).is_none());
    }
}
