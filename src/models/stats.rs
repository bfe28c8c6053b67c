// src/models/stats.rs

//! Frequency aggregates over a recent window of draws.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::models::{DrawRecord, GameKind, ZoneSpec};

/// Set of `sorted_key` values seen in a recent window.
pub type HistoricalCombinationSet = HashSet<String>;

/// Occurrence counts per zone, built from a bounded window of draws.
///
/// Rebuilt on every read; it is only as fresh as the window it was built from.
#[derive(Debug, Clone, Serialize)]
pub struct FrequencyTable {
    pub game: GameKind,
    /// Number of draws the counts were taken from
    pub window: usize,
    /// Zone index -> (value -> count)
    pub zones: Vec<BTreeMap<u8, u32>>,
}

impl FrequencyTable {
    pub fn from_records(game: GameKind, records: &[DrawRecord]) -> Self {
        let mut zones = vec![BTreeMap::new(); game.spec().zones().len()];
        for record in records.iter().filter(|r| r.game == game) {
            for (index, values) in record.balls.zones().into_iter().enumerate() {
                if let Some(counts) = zones.get_mut(index) {
                    for &value in values {
                        *counts.entry(value).or_insert(0) += 1;
                    }
                }
            }
        }
        Self {
            game,
            window: records.len(),
            zones,
        }
    }

    pub fn count(&self, zone: usize, value: u8) -> u32 {
        self.zones
            .get(zone)
            .and_then(|counts| counts.get(&value))
            .copied()
            .unwrap_or(0)
    }

    /// Every value of the zone, most frequent first; ties go to the smaller value.
    ///
    /// Values never drawn in the window are included with a count of zero.
    pub fn ranked(&self, zone_index: usize, zone: &ZoneSpec) -> Vec<(u8, u32)> {
        let mut ranked: Vec<(u8, u32)> = zone
            .values()
            .map(|v| (v, self.count(zone_index, v)))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked
    }

    /// The `n` most frequent values that were actually drawn.
    pub fn top(&self, zone_index: usize, n: usize) -> Vec<(u8, u32)> {
        let Some(zone) = self.game.spec().zones().get(zone_index).copied() else {
            return Vec::new();
        };
        self.ranked(zone_index, &zone)
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .take(n)
            .collect()
    }
}

/// Summary returned by the stats query and the daily report.
#[derive(Debug, Clone, Serialize)]
pub struct FrequencySummary {
    pub game: GameKind,
    pub total_draws: usize,
    pub window: usize,
    pub top_primary: Vec<(u8, u32)>,
    pub top_secondary: Vec<(u8, u32)>,
}

impl FrequencySummary {
    pub fn new(table: &FrequencyTable, total_draws: usize, primary_n: usize, secondary_n: usize) -> Self {
        Self {
            game: table.game,
            total_draws,
            window: table.window,
            top_primary: table.top(0, primary_n),
            top_secondary: table.top(1, secondary_n),
        }
    }
}
