//! Frequency-weighted selection.
//!
//! Unique zones take a fixed share of their picks from the most frequent
//! values and fill the rest uniformly. Small and positional zones decide per
//! pick whether to draw from the frequent pool.

use rand::seq::SliceRandom;
use rand::{Rng, RngCore};

use super::{Strategy, take_distinct, top_share};
use crate::models::ZoneSpec;

/// Share of the range treated as frequent.
const TOP_POOL_RATIO: f64 = 0.45;
/// Share of a unique zone's picks taken from the frequent pool.
const HOT_PICK_RATIO: f64 = 0.7;
/// Per-pick chance of using the frequent pool in small zones.
const HOT_PICK_CHANCE: f64 = 0.8;

pub struct FrequencyStrategy;

impl Strategy for FrequencyStrategy {
    fn key(&self) -> &'static str {
        "frequency"
    }

    fn name(&self) -> &'static str {
        "Frequency weighted"
    }

    fn description(&self) -> &'static str {
        "Favours the most frequently drawn numbers of the recent window"
    }

    fn pick_zone(&self, zone: &ZoneSpec, ranked: &[u8], rng: &mut dyn RngCore) -> Vec<u8> {
        let top = top_share(ranked, TOP_POOL_RATIO);
        let mut chosen = Vec::with_capacity(zone.count);

        if zone.unique && zone.count > 2 {
            let hot = ((zone.count as f64) * HOT_PICK_RATIO).round() as usize;
            take_distinct(&mut chosen, top, hot, rng);
            let rest = zone.count.saturating_sub(chosen.len());
            take_distinct(&mut chosen, ranked, rest, rng);
            return chosen;
        }

        while chosen.len() < zone.count {
            let pool = if rng.gen_bool(HOT_PICK_CHANCE) { top } else { ranked };
            if zone.unique {
                let before = chosen.len();
                take_distinct(&mut chosen, pool, 1, rng);
                if chosen.len() == before {
                    take_distinct(&mut chosen, ranked, 1, rng);
                }
                if chosen.len() == before {
                    break;
                }
            } else {
                let Some(&value) = pool.choose(rng) else {
                    break;
                };
                chosen.push(value);
            }
        }
        chosen
    }
}
