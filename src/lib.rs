// src/lib.rs

//! Lottery draw crawler and candidate generator library.

pub mod app;
pub mod config;
pub mod error;
pub mod handler;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;

#[cfg(test)]
mod testing;
