// src/models/candidate.rs

//! Generated combinations returned by the strategy engine.

use serde::Serialize;

use crate::models::Balls;

/// One generated combination. Lives only for the duration of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub balls: Balls,
    pub sorted_key: String,
    /// Registry key of the strategy that produced it
    pub strategy: String,
    pub strategy_name: String,
}

impl Candidate {
    pub fn new(balls: Balls, strategy: &str, strategy_name: &str) -> Self {
        let sorted_key = balls.sorted_key();
        Self {
            balls,
            sorted_key,
            strategy: strategy.to_string(),
            strategy_name: strategy_name.to_string(),
        }
    }
}
