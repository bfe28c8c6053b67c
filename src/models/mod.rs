// src/models/mod.rs

//! Domain models for the lottery crawler.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod candidate;
mod config;
mod draw;
mod game;
mod issue;
mod stats;

// Re-export all public types
pub use candidate::Candidate;
pub use config::{
    Config, CrawlerConfig, LoggingConfig, PredictConfig, StorageConfig, SyncConfig,
};
pub use draw::{Balls, DrawRecord};
pub use game::{GameKind, GameSpec, ZoneSpec};
pub use issue::{IssueId, IssueStep, last_issue_bound};
pub use stats::{FrequencySummary, FrequencyTable, HistoricalCombinationSet};
