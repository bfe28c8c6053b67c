// src/models/issue.rs

//! Issue identifiers (`YYYYNNN`) and the per-game calendar used to walk them backwards.

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::GameKind;

/// Draw identifier: four-digit year followed by a three-digit sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IssueId(String);

/// Result of stepping one issue back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueStep {
    pub issue: IssueId,
    /// The step moved into the previous year; the issue is an upper bound
    pub crossed_year: bool,
}

impl IssueId {
    /// Accept a full 7-digit identifier or a 5-digit short form (`24001` -> `2024001`).
    pub fn normalize(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        match raw.len() {
            7 => Some(Self(raw.to_string())),
            5 => Some(Self(format!("20{raw}"))),
            _ => None,
        }
    }

    pub fn from_parts(year: i32, sequence: u32) -> Self {
        Self(format!("{year:04}{sequence:03}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn year(&self) -> i32 {
        digits_value(&self.0[..4]) as i32
    }

    pub fn sequence(&self) -> u32 {
        digits_value(&self.0[4..])
    }

    /// Five-digit form used by range queries (`2024001` -> `24001`).
    pub fn short_form(&self) -> &str {
        &self.0[2..]
    }

    /// Previous issue for `game`.
    ///
    /// Sequence numbers restart every year, so stepping back from `001`
    /// lands on the previous year's upper bound (see [`last_issue_bound`]).
    /// Returns `None` once the step would leave the game's history.
    pub fn predecessor(&self, game: GameKind) -> Option<IssueStep> {
        let (year, sequence) = (self.year(), self.sequence());
        if sequence > 1 {
            return Some(IssueStep {
                issue: Self::from_parts(year, sequence - 1),
                crossed_year: false,
            });
        }

        let previous_year = year - 1;
        if previous_year < game.start_year() {
            return None;
        }
        Some(IssueStep {
            issue: Self::from_parts(previous_year, last_issue_bound(game, previous_year)),
            crossed_year: true,
        })
    }

    /// True when no older issue can exist for `game`.
    pub fn is_at_start_boundary(&self, game: GameKind) -> bool {
        self.year() < game.start_year() || (self.year() == game.start_year() && self.sequence() <= 1)
    }
}

/// Upper bound for the final issue number of `year`.
///
/// Counts the game's draw weekdays in that year. Holiday breaks only
/// remove draws, so the real final issue is never above this bound.
pub fn last_issue_bound(game: GameKind, year: i32) -> u32 {
    let Some(first) = NaiveDate::from_ymd_opt(year, 1, 1) else {
        return 0;
    };
    let weekdays = game.draw_weekdays();
    first
        .iter_days()
        .take_while(|d| d.year() == year)
        .filter(|d| weekdays.contains(&d.weekday()))
        .count() as u32
}

fn digits_value(digits: &str) -> u32 {
    digits
        .bytes()
        .fold(0, |acc, b| acc * 10 + u32::from(b - b'0'))
}

impl fmt::Display for IssueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for IssueId {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::normalize(&value)
            .ok_or_else(|| AppError::validation(format!("Invalid issue id '{value}'")))
    }
}

impl From<IssueId> for String {
    fn from(value: IssueId) -> Self {
        value.0
    }
}
