// src/services/strategies/mod.rs

//! Candidate generation strategies.
//!
//! A strategy picks the values of one zone at a time from the ranked
//! frequency of the recent window. Strategies are looked up by key in the
//! [`StrategyRegistry`].

mod balanced;
mod cold_hot;
mod frequency;
mod random;

use std::collections::HashMap;

use rand::RngCore;
use rand::seq::SliceRandom;
use serde::Serialize;

use crate::models::{Balls, DrawRecord, FrequencyTable, GameKind, HistoricalCombinationSet, ZoneSpec};

pub use balanced::BalancedStrategy;
pub use cold_hot::ColdHotStrategy;
pub use frequency::FrequencyStrategy;
pub use random::RandomStrategy;

/// Read-only inputs shared by all strategies during one prediction.
pub struct StrategyContext<'a> {
    pub game: GameKind,
    /// Recent draws, newest first
    pub history: &'a [DrawRecord],
    pub frequency: &'a FrequencyTable,
    pub historical: &'a HistoricalCombinationSet,
}

impl StrategyContext<'_> {
    /// Ranked values of a zone with `exclude` removed.
    pub fn ranked_values(&self, zone_index: usize, zone: &ZoneSpec, exclude: &[u8]) -> Vec<u8> {
        self.frequency
            .ranked(zone_index, zone)
            .into_iter()
            .map(|(value, _)| value)
            .filter(|value| !exclude.contains(value))
            .collect()
    }
}

pub trait Strategy: Send + Sync {
    /// Registry key
    fn key(&self) -> &'static str;

    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Values for one zone. `ranked` holds the allowed values, most frequent first.
    fn pick_zone(&self, zone: &ZoneSpec, ranked: &[u8], rng: &mut dyn RngCore) -> Vec<u8>;

    /// One candidate combination for the context's game.
    fn generate(&self, ctx: &StrategyContext<'_>, rng: &mut dyn RngCore) -> Balls {
        let spec = ctx.game.spec();
        let ranked = ctx.ranked_values(0, &spec.primary, &[]);
        let primary = finish_zone(&spec.primary, self.pick_zone(&spec.primary, &ranked, rng));

        let secondary = match &spec.secondary {
            Some(zone) => {
                let exclude: &[u8] = if spec.secondary_excludes_primary {
                    &primary
                } else {
                    &[]
                };
                let ranked = ctx.ranked_values(1, zone, exclude);
                finish_zone(zone, self.pick_zone(zone, &ranked, rng))
            }
            None => Vec::new(),
        };
        Balls::new(primary, secondary)
    }

    /// Structural check: arity, ranges, uniqueness and no run of three
    /// consecutive values in run-restricted zones.
    fn validate(&self, game: GameKind, balls: &Balls) -> bool {
        if balls.check(game).is_err() {
            return false;
        }
        game.spec()
            .zones()
            .iter()
            .zip(balls.zones())
            .all(|(zone, values)| !zone.run_restricted || !has_run(values, 3))
    }
}

/// Unique zones are reported in ascending order; positional zones keep theirs.
fn finish_zone(zone: &ZoneSpec, mut values: Vec<u8>) -> Vec<u8> {
    if zone.unique {
        values.sort_unstable();
    }
    values
}

/// True when `values` contains `len` or more consecutive integers.
pub fn has_run(values: &[u8], len: usize) -> bool {
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    let mut run = 1;
    for pair in sorted.windows(2) {
        if pair[1] == pair[0] + 1 {
            run += 1;
            if run >= len {
                return true;
            }
        } else {
            run = 1;
        }
    }
    false
}

/// Draw `n` distinct values from `pool`, skipping ones already in `chosen`.
pub(crate) fn take_distinct(chosen: &mut Vec<u8>, pool: &[u8], n: usize, rng: &mut dyn RngCore) {
    let available: Vec<u8> = pool.iter().copied().filter(|v| !chosen.contains(v)).collect();
    chosen.extend(available.choose_multiple(rng, n).copied());
}

/// Top `round(len × ratio)` entries of `ranked`, at least one.
pub(crate) fn top_share(ranked: &[u8], ratio: f64) -> &[u8] {
    let n = ((ranked.len() as f64) * ratio).round() as usize;
    &ranked[..n.max(1).min(ranked.len())]
}

/// One registry entry as shown to users.
#[derive(Debug, Clone, Serialize)]
pub struct StrategyInfo {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

type Factory = fn() -> Box<dyn Strategy>;

/// Name → factory mapping of the available strategies.
pub struct StrategyRegistry {
    factories: HashMap<&'static str, Factory>,
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };
        registry.register("random", || Box::new(RandomStrategy));
        registry.register("frequency", || Box::new(FrequencyStrategy));
        registry.register("cold_hot", || Box::new(ColdHotStrategy));
        registry.register("balanced", || Box::new(BalancedStrategy));
        registry
    }
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, key: &'static str, factory: Factory) {
        self.factories.insert(key, factory);
    }

    pub fn get(&self, key: &str) -> Option<Box<dyn Strategy>> {
        self.factories.get(key).map(|factory| factory())
    }

    /// Registered keys in alphabetical order.
    pub fn keys(&self) -> Vec<&'static str> {
        let mut keys: Vec<_> = self.factories.keys().copied().collect();
        keys.sort_unstable();
        keys
    }

    pub fn list(&self) -> Vec<StrategyInfo> {
        self.keys()
            .into_iter()
            .filter_map(|key| self.get(key))
            .map(|s| StrategyInfo {
                key: s.key(),
                name: s.name(),
                description: s.description(),
            })
            .collect()
    }
}
