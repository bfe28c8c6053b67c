// src/services/parsers/zhcw.rs

//! zhcw.com JSON API payloads.

use serde::Deserialize;
use serde_json::Value;

use crate::models::{DrawRecord, GameKind};
use crate::services::parsers::{DrawParser, RowBuilder, digit_runs};

const SOURCE: &str = "zhcw";
const OK_CODE: &str = "000000";

/// Fields shared by the detail response and each `pageList` entry.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ZhcwDraw {
    res_code: Option<String>,
    issue: Option<Value>,
    open_time: Option<String>,
    front_winning_num: Option<String>,
    seq_front_winning_num: Option<String>,
    back_winning_num: Option<String>,
    seq_back_winning_num: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ZhcwPage {
    res_code: Option<String>,
    page_list: Vec<ZhcwDraw>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ZhcwIssueList {
    res_code: Option<String>,
    message: Option<String>,
    issue: Vec<Value>,
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn is_ok(code: &Option<String>) -> bool {
    code.as_deref() == Some(OK_CODE)
}

impl ZhcwDraw {
    fn into_record(self, builder: &RowBuilder) -> Option<DrawRecord> {
        let issue = self.issue.as_ref().and_then(value_text)?;
        let front = self
            .front_winning_num
            .filter(|s| !s.trim().is_empty())
            .or(self.seq_front_winning_num)?;
        let back = self
            .back_winning_num
            .filter(|s| !s.trim().is_empty())
            .or(self.seq_back_winning_num)?;
        let date: String = self.open_time?.chars().take(10).collect();
        builder.build(&issue, &date, digit_runs(&front)?, digit_runs(&back)?)
    }
}

/// Issue numbers from a listing response (`transactionType=10001003`), newest first.
///
/// Returns `None` when the payload is not a successful listing.
pub fn parse_issue_list(payload: &str) -> Option<Vec<String>> {
    let list: ZhcwIssueList = serde_json::from_str(payload.trim()).ok()?;
    if !is_ok(&list.res_code) {
        log::warn!(
            "[{}] issue list returned {:?} {}",
            SOURCE,
            list.res_code,
            list.message.unwrap_or_default()
        );
        return None;
    }
    Some(list.issue.iter().filter_map(value_text).collect())
}

/// Single-issue detail (`transactionType=10001002`).
pub struct ZhcwDetailParser {
    game: GameKind,
}

impl ZhcwDetailParser {
    pub fn new(game: GameKind) -> Self {
        Self { game }
    }
}

impl DrawParser for ZhcwDetailParser {
    fn game(&self) -> GameKind {
        self.game
    }

    fn parse(&self, payload: &str) -> Vec<DrawRecord> {
        let builder = RowBuilder::new(self.game, SOURCE);
        let Ok(draw) = serde_json::from_str::<ZhcwDraw>(payload.trim()) else {
            log::debug!("[{}] detail payload is not JSON", SOURCE);
            return Vec::new();
        };
        if !is_ok(&draw.res_code) {
            log::debug!("[{}] detail returned {:?}", SOURCE, draw.res_code);
            return Vec::new();
        }
        draw.into_record(&builder).into_iter().collect()
    }
}

/// Date-range page (`transactionType=10001001`).
pub struct ZhcwPageParser {
    game: GameKind,
}

impl ZhcwPageParser {
    pub fn new(game: GameKind) -> Self {
        Self { game }
    }
}

impl DrawParser for ZhcwPageParser {
    fn game(&self) -> GameKind {
        self.game
    }

    fn parse(&self, payload: &str) -> Vec<DrawRecord> {
        let builder = RowBuilder::new(self.game, SOURCE);
        let Ok(page) = serde_json::from_str::<ZhcwPage>(payload.trim()) else {
            log::debug!("[{}] page payload is not JSON", SOURCE);
            return Vec::new();
        };
        if !is_ok(&page.res_code) {
            return Vec::new();
        }
        page.page_list
            .into_iter()
            .filter_map(|draw| draw.into_record(&builder))
            .collect()
    }
}
