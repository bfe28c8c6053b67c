//! Service layer for the lottery crawler.
//!
//! This module contains the business logic for:
//! - Rate-limited fetching (`fetcher`)
//! - Per-source parsing and querying (`parsers`, `sources`)
//! - Primary/backup resolution (`resolver`)
//! - Candidate generation (`strategies`, `predictor`)
//! - Chat notifications (`notifier`)

pub mod fetcher;
pub mod notifier;
pub mod parsers;
pub mod predictor;
pub mod resolver;
pub mod sources;
pub mod strategies;
