//! Low/high balanced selection.

use rand::seq::SliceRandom;
use rand::{Rng, RngCore};

use super::{Strategy, take_distinct};
use crate::models::ZoneSpec;

pub struct BalancedStrategy;

impl Strategy for BalancedStrategy {
    fn key(&self) -> &'static str {
        "balanced"
    }

    fn name(&self) -> &'static str {
        "Balanced"
    }

    fn description(&self) -> &'static str {
        "Keeps low and high numbers close to an even split"
    }

    fn pick_zone(&self, zone: &ZoneSpec, ranked: &[u8], rng: &mut dyn RngCore) -> Vec<u8> {
        let split = zone.low_high_split();

        if !zone.unique {
            let low_count = rng.gen_range(3..=4).min(zone.count);
            let mut digits: Vec<u8> = (0..zone.count)
                .map(|i| {
                    if i < low_count {
                        rng.gen_range(zone.min..=split)
                    } else {
                        rng.gen_range(split + 1..=zone.max)
                    }
                })
                .collect();
            digits.shuffle(rng);
            return digits;
        }

        let (low, high): (Vec<u8>, Vec<u8>) = ranked.iter().partition(|v| **v <= split);
        let low_count = if rng.gen_bool(0.5) {
            zone.count / 2
        } else {
            zone.count.div_ceil(2)
        };
        let mut chosen = Vec::with_capacity(zone.count);
        take_distinct(&mut chosen, &low, low_count, rng);
        let high_count = zone.count.saturating_sub(chosen.len());
        take_distinct(&mut chosen, &high, high_count, rng);
        let rest = zone.count.saturating_sub(chosen.len());
        take_distinct(&mut chosen, ranked, rest, rng);
        chosen
    }
}
