//! Hot, warm and cold tier sampling.

use rand::seq::SliceRandom;
use rand::{Rng, RngCore};

use super::{Strategy, take_distinct};
use crate::models::ZoneSpec;

/// Ranked values split into frequency tiers: top 30%, next 40%, rest.
struct Tiers<'a> {
    hot: &'a [u8],
    warm: &'a [u8],
    cold: &'a [u8],
}

impl<'a> Tiers<'a> {
    fn split(ranked: &'a [u8]) -> Self {
        let len = ranked.len();
        let hot_len = (((len as f64) * 0.3).round() as usize).max(1).min(len);
        let warm_len = (((len as f64) * 0.4).round() as usize).min(len - hot_len);
        let (hot, rest) = ranked.split_at(hot_len);
        let (warm, cold) = rest.split_at(warm_len);
        Self { hot, warm, cold }
    }

    /// Tier for a single pick, weighted 60/30/10.
    fn weighted(&self, rng: &mut dyn RngCore) -> &'a [u8] {
        match rng.gen_range(0..100) {
            0..60 => self.hot,
            60..90 => self.warm,
            _ => self.cold,
        }
    }
}

pub struct ColdHotStrategy;

impl Strategy for ColdHotStrategy {
    fn key(&self) -> &'static str {
        "cold_hot"
    }

    fn name(&self) -> &'static str {
        "Hot and cold"
    }

    fn description(&self) -> &'static str {
        "Mixes hot, warm and cold numbers for a balanced temperature"
    }

    fn pick_zone(&self, zone: &ZoneSpec, ranked: &[u8], rng: &mut dyn RngCore) -> Vec<u8> {
        let tiers = Tiers::split(ranked);
        let mut chosen = Vec::with_capacity(zone.count);

        if zone.unique && zone.count > 2 {
            let hot = zone.count.div_ceil(2);
            let cold = (zone.count / 6).max(1);
            let warm = zone.count.saturating_sub(hot + cold);
            take_distinct(&mut chosen, tiers.hot, hot, rng);
            take_distinct(&mut chosen, tiers.warm, warm, rng);
            take_distinct(&mut chosen, tiers.cold, cold, rng);
            // tiers too small for their share
            let rest = zone.count.saturating_sub(chosen.len());
            take_distinct(&mut chosen, ranked, rest, rng);
            return chosen;
        }

        while chosen.len() < zone.count {
            let tier = tiers.weighted(rng);
            let pool = if tier.is_empty() { ranked } else { tier };
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
