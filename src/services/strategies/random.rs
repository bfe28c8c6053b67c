//! Uniform selection over the whole range.

use rand::{Rng, RngCore};

use super::{Strategy, take_distinct};
use crate::models::ZoneSpec;

pub struct RandomStrategy;

impl Strategy for RandomStrategy {
    fn key(&self) -> &'static str {
        "random"
    }

    fn name(&self) -> &'static str {
        "Random"
    }

    fn description(&self) -> &'static str {
        "Uniform random selection with no weighting"
    }

    fn pick_zone(&self, zone: &ZoneSpec, ranked: &[u8], rng: &mut dyn RngCore) -> Vec<u8> {
        if zone.unique {
            let mut chosen = Vec::with_capacity(zone.count);
            take_distinct(&mut chosen, ranked, zone.count, rng);
            chosen
        } else {
            (0..zone.count)
                .map(|_| rng.gen_range(zone.min..=zone.max))
                .collect()
        }
    }
}
