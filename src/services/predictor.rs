// src/services/predictor.rs

//! Candidate generation across several strategies.
//!
//! The requested count is split evenly over the named strategies. Each
//! strategy runs in a loop bounded by an attempt cap and a wall-clock budget;
//! a candidate is kept only when it validates and its key is neither in the
//! recent history nor already produced in this call.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::RngCore;

use crate::error::{AppError, Result};
use crate::models::{Candidate, GameKind, PredictConfig, StorageConfig};
use crate::services::strategies::{Strategy, StrategyContext, StrategyRegistry};
use crate::storage::DrawStore;

/// Attempt and time limits for one strategy run.
#[derive(Debug, Clone, Copy)]
pub struct Budget {
    pub attempts_per_candidate: usize,
    pub max_attempts: usize,
    pub time_budget: Duration,
}

impl From<&PredictConfig> for Budget {
    fn from(config: &PredictConfig) -> Self {
        Self {
            attempts_per_candidate: config.attempts_per_candidate,
            max_attempts: config.max_attempts,
            time_budget: Duration::from_millis(config.time_budget_ms),
        }
    }
}

impl Budget {
    fn attempts_for(&self, wanted: usize) -> usize {
        wanted
            .saturating_mul(self.attempts_per_candidate)
            .min(self.max_attempts)
    }
}

pub struct Predictor {
    store: Arc<dyn DrawStore>,
    registry: Arc<StrategyRegistry>,
    predict: PredictConfig,
    windows: StorageConfig,
}

impl Predictor {
    pub fn new(
        store: Arc<dyn DrawStore>,
        registry: Arc<StrategyRegistry>,
        predict: PredictConfig,
        windows: StorageConfig,
    ) -> Self {
        Self {
            store,
            registry,
            predict,
            windows,
        }
    }

    /// Look up strategies by key; an empty list selects the defaults.
    pub fn resolve(&self, names: &[String]) -> Result<Vec<Box<dyn Strategy>>> {
        let names = if names.is_empty() {
            &self.predict.default_strategies
        } else {
            names
        };
        names
            .iter()
            .map(|name| {
                self.registry.get(name.trim()).ok_or_else(|| {
                    AppError::config(format!(
                        "Unknown strategy '{}', available: {}",
                        name,
                        self.registry.keys().join(", ")
                    ))
                })
            })
            .collect()
    }

    /// Up to `count` candidates for `game`.
    pub async fn predict(
        &self,
        game: GameKind,
        count: usize,
        names: &[String],
        rng: &mut (dyn RngCore + Send),
    ) -> Result<Vec<Candidate>> {
        let strategies = self.resolve(names)?;
        if count == 0 {
            return Ok(Vec::new());
        }

        let history = self.store.recent(game, self.windows.history_window).await?;
        if history.is_empty() {
            return Err(AppError::EmptyHistory(game.to_string()));
        }
        let frequency = self.store.frequency(game, self.windows.frequency_window).await?;
        let historical = self
            .store
            .historical_combinations(game, self.windows.combination_window)
            .await?;

        let ctx = StrategyContext {
            game,
            history: &history,
            frequency: &frequency,
            historical: &historical,
        };
        let candidates = generate(&ctx, &strategies, count, Budget::from(&self.predict), rng);
        log::info!(
            "[{}] generated {}/{} candidates with {}",
            game,
            candidates.len(),
            count,
            strategies
                .iter()
                .map(|s| s.key())
                .collect::<Vec<_>>()
                .join(",")
        );
        Ok(candidates)
    }
}

/// Run each strategy for its share of `count` and merge the results.
pub fn generate(
    ctx: &StrategyContext<'_>,
    strategies: &[Box<dyn Strategy>],
    count: usize,
    budget: Budget,
    rng: &mut (dyn RngCore + Send),
) -> Vec<Candidate> {
    if strategies.is_empty() || count == 0 {
        return Vec::new();
    }
    let per_strategy = count.div_ceil(strategies.len());
    let mut seen: HashSet<String> = HashSet::new();
    let mut candidates = Vec::with_capacity(count);

    for strategy in strategies {
        let produced = run_strategy(
            ctx,
            strategy.as_ref(),
            per_strategy,
            budget,
            &mut seen,
            rng,
        );
        if produced.len() < per_strategy {
            log::warn!(
                "[{}] {} produced {}/{} candidates within budget",
                ctx.game,
                strategy.key(),
                produced.len(),
                per_strategy
            );
        }
        candidates.extend(produced);
    }
    candidates.truncate(count);
    candidates
}

fn run_strategy(
    ctx: &StrategyContext<'_>,
    strategy: &dyn Strategy,
    wanted: usize,
    budget: Budget,
    seen: &mut HashSet<String>,
    rng: &mut (dyn RngCore + Send),
) -> Vec<Candidate> {
    let started = Instant::now();
    let mut produced = Vec::with_capacity(wanted);

    for _ in 0..budget.attempts_for(wanted) {
        if produced.len() >= wanted || started.elapsed() > budget.time_budget {
            break;
        }
        let balls = strategy.generate(ctx, rng);
        if !strategy.validate(ctx.game, &balls) {
            continue;
        }
        let candidate = Candidate::new(balls, strategy.key(), strategy.name());
        if ctx.historical.contains(&candidate.sorted_key) || !seen.insert(candidate.sorted_key.clone()) {
            continue;
        }
        produced.push(candidate);
    }
    produced
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::strategies::test_support::Fixture;
    use crate::storage::{DrawStore, MemoryStorage};
    use crate::testing::ssq_record;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn budget() -> Budget {
        Budget::from(&PredictConfig::default())
    }

    fn predictor(store: MemoryStorage) -> Predictor {
        Predictor::new(
            Arc::new(store),
            Arc::new(StrategyRegistry::new()),
            PredictConfig::default(),
            StorageConfig::default(),
        )
    }

    #[test]
    fn attempts_are_capped() {
        let budget = budget();
        assert_eq!(budget.attempts_for(3), 60);
        assert_eq!(budget.attempts_for(50), 200);
    }

    #[test]
    fn candidates_are_unique_valid_and_unseen() {
        let registry = StrategyRegistry::new();
        for game in GameKind::ALL {
            let fixture = Fixture::new(game);
            let ctx = fixture.context();
            let strategies: Vec<_> = registry
                .keys()
                .into_iter()
                .filter_map(|k| registry.get(k))
                .collect();
            let mut rng = StdRng::seed_from_u64(42);

            let candidates = generate(&ctx, &strategies, 8, budget(), &mut rng);
            assert!(candidates.len() <= 8);
            assert!(!candidates.is_empty());

            let keys: HashSet<_> = candidates.iter().map(|c| c.sorted_key.clone()).collect();
            assert_eq!(keys.len(), candidates.len());
            for candidate in &candidates {
                assert!(!fixture.historical.contains(&candidate.sorted_key));
                let strategy = registry.get(&candidate.strategy).unwrap();
                assert!(strategy.validate(game, &candidate.balls));
            }
        }
    }

    #[test]
    fn count_is_split_across_strategies() {
        let registry = StrategyRegistry::new();
        let fixture = Fixture::new(GameKind::Ssq);
        let strategies = vec![
            registry.get("random").unwrap(),
            registry.get("balanced").unwrap(),
        ];
        let mut rng = StdRng::seed_from_u64(8);

        let candidates = generate(&fixture.context(), &strategies, 5, budget(), &mut rng);
        assert_eq!(candidates.len(), 5);
        assert_eq!(candidates.iter().filter(|c| c.strategy == "random").count(), 3);
        assert_eq!(candidates.iter().filter(|c| c.strategy == "balanced").count(), 2);
    }

    #[test]
    fn exhausted_budget_returns_fewer() {
        let registry = StrategyRegistry::new();
        let fixture = Fixture::new(GameKind::Ssq);
        let strategies = vec![registry.get("random").unwrap()];
        let tight = Budget {
            attempts_per_candidate: 1,
            max_attempts: 2,
            time_budget: Duration::from_secs(1),
        };
        let mut rng = StdRng::seed_from_u64(8);

        let candidates = generate(&fixture.context(), &strategies, 5, tight, &mut rng);
        assert!(candidates.len() <= 2);
    }

    #[tokio::test]
    async fn unknown_strategy_is_config_error() {
        let store = MemoryStorage::new();
        store
            .upsert_batch(GameKind::Ssq, &[ssq_record("2024150", 1)])
            .await
            .unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let err = predictor(store)
            .predict(GameKind::Ssq, 5, &["astrology".to_string()], &mut rng)
            .await
            .unwrap_err();
        match err {
            AppError::Config(message) => assert!(message.contains("frequency")),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_history_is_an_error() {
        let mut rng = StdRng::seed_from_u64(1);
        let err = predictor(MemoryStorage::new())
            .predict(GameKind::Dlt, 5, &[], &mut rng)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::EmptyHistory(_)));
    }

    #[tokio::test]
    async fn predict_uses_default_strategies() {
        let store = MemoryStorage::new();
        let batch: Vec<_> = (1..=20)
            .map(|i| ssq_record(&format!("2024{i:03}"), i as u8))
            .collect();
        store.upsert_batch(GameKind::Ssq, &batch).await.unwrap();
        let mut rng = StdRng::seed_from_u64(21);

        let candidates = predictor(store)
            .predict(GameKind::Ssq, 5, &[], &mut rng)
            .await
            .unwrap();
        assert_eq!(candidates.len(), 5);
        assert!(candidates.iter().all(|c| c.strategy == "frequency"));
    }
}
