// src/models/draw.rs

//! Normalized draw records and their canonical combination key.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{GameKind, IssueId, ZoneSpec};

/// Number tuples of one draw or candidate, in draw order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balls {
    pub primary: Vec<u8>,
    #[serde(default)]
    pub secondary: Vec<u8>,
}

impl Balls {
    pub fn new(primary: Vec<u8>, secondary: Vec<u8>) -> Self {
        Self { primary, secondary }
    }

    /// Zones in draw order, skipping an empty secondary zone.
    pub fn zones(&self) -> Vec<&[u8]> {
        let mut zones = vec![self.primary.as_slice()];
        if !self.secondary.is_empty() {
            zones.push(self.secondary.as_slice());
        }
        zones
    }

    /// Canonical key: each zone sorted and zero-padded, zones joined by `-`.
    ///
    /// `[12, 5, 33, 1, 20, 28] + [7]` becomes `01,05,12,20,28,33-07`.
    pub fn sorted_key(&self) -> String {
        self.zones()
            .into_iter()
            .map(|zone| {
                let mut sorted = zone.to_vec();
                sorted.sort_unstable();
                sorted
                    .iter()
                    .map(|n| format!("{n:02}"))
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .collect::<Vec<_>>()
            .join("-")
    }

    /// Check arity, ranges and uniqueness for `game`.
    pub fn check(&self, game: GameKind) -> Result<()> {
        let spec = game.spec();
        check_zone(&spec.primary, &self.primary)?;
        match &spec.secondary {
            Some(zone) => check_zone(zone, &self.secondary)?,
            None if !self.secondary.is_empty() => {
                return Err(AppError::validation(format!(
                    "{} has no secondary zone, got {:?}",
                    game, self.secondary
                )));
            }
            None => {}
        }
        if spec.secondary_excludes_primary
            && let Some(n) = self.secondary.iter().find(|n| self.primary.contains(n))
        {
            return Err(AppError::validation(format!(
                "secondary value {n:02} repeats a primary value"
            )));
        }
        Ok(())
    }
}

fn check_zone(zone: &ZoneSpec, values: &[u8]) -> Result<()> {
    if values.len() != zone.count {
        return Err(AppError::validation(format!(
            "{} zone needs {} values, got {}",
            zone.label,
            zone.count,
            values.len()
        )));
    }
    if let Some(n) = values.iter().find(|n| !zone.contains(**n)) {
        return Err(AppError::validation(format!(
            "{} value {} outside {}..={}",
            zone.label, n, zone.min, zone.max
        )));
    }
    if zone.unique {
        let distinct: HashSet<_> = values.iter().collect();
        if distinct.len() != values.len() {
            return Err(AppError::validation(format!(
                "{} zone has duplicate values {:?}",
                zone.label, values
            )));
        }
    }
    Ok(())
}

/// One published draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDrawRecord")]
pub struct DrawRecord {
    pub game: GameKind,
    pub issue: IssueId,
    pub draw_date: NaiveDate,
    pub balls: Balls,
    /// Derived from `balls`; recomputed whenever a record is built
    pub sorted_key: String,
}

impl DrawRecord {
    /// Validate and build a record. `sorted_key` is always derived here.
    pub fn new(game: GameKind, issue: IssueId, draw_date: NaiveDate, balls: Balls) -> Result<Self> {
        balls.check(game)?;
        let sorted_key = balls.sorted_key();
        Ok(Self {
            game,
            issue,
            draw_date,
            balls,
            sorted_key,
        })
    }
}

/// Wire shape accepted on deserialization; any stored key is ignored.
#[derive(Deserialize)]
struct RawDrawRecord {
    game: GameKind,
    issue: IssueId,
    draw_date: NaiveDate,
    balls: Balls,
    #[serde(default, rename = "sorted_key")]
    _sorted_key: Option<String>,
}

impl TryFrom<RawDrawRecord> for DrawRecord {
    type Error = AppError;

    fn try_from(raw: RawDrawRecord) -> Result<Self> {
        DrawRecord::new(raw.game, raw.issue, raw.draw_date, raw.balls)
    }
}
