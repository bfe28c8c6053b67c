// src/services/fetcher.rs

//! Rate-limited HTTP fetching of raw source payloads.
//!
//! Every request first waits for the per-instance [`Throttle`]: the minimum
//! interval since the previous request, plus a random extra delay. No
//! retries happen here; falling back is the resolver's job.

use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use reqwest::header::{ACCEPT, REFERER};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::{AppError, Result};
use crate::models::CrawlerConfig;
use crate::utils::get_domain;
use crate::utils::http::create_async_client;

/// A GET request against one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRequest {
    pub url: String,
    pub referer: &'static str,
    pub accept: &'static str,
}

/// Raw payload retrieval.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Fetch the body of `request`; non-success status is a network error.
    async fn fetch(&self, request: &SourceRequest) -> Result<String>;
}

/// Randomized spacing between consecutive requests.
pub struct Throttle {
    min_interval: Duration,
    max_interval: Duration,
    state: Mutex<ThrottleState>,
}

struct ThrottleState {
    last_request: Option<Instant>,
    rng: StdRng,
}

impl Throttle {
    pub fn new(min_interval: Duration, max_interval: Duration, rng: StdRng) -> Self {
        Self {
            min_interval,
            max_interval: max_interval.max(min_interval),
            state: Mutex::new(ThrottleState {
                last_request: None,
                rng,
            }),
        }
    }

    /// Sleep until the next request may go out, then mark it as sent.
    ///
    /// The lock is held across the sleep so requests from one instance
    /// are strictly serialized.
    pub async fn wait(&self) {
        let mut state = self.state.lock().await;
        let elapsed = state.last_request.map(|t| t.elapsed());
        let delay = next_delay(self.min_interval, self.max_interval, elapsed, &mut state.rng);
        if !delay.is_zero() {
            log::debug!("Throttling next request by {}ms", delay.as_millis());
            tokio::time::sleep(delay).await;
        }
        state.last_request = Some(Instant::now());
    }
}

/// Remaining minimum interval plus a uniform extra in `[0, max - min)`.
fn next_delay(
    min: Duration,
    max: Duration,
    since_last: Option<Duration>,
    rng: &mut impl Rng,
) -> Duration {
    let remaining = since_last
        .map(|elapsed| min.saturating_sub(elapsed))
        .unwrap_or(Duration::ZERO);
    let spread = max.saturating_sub(min).as_millis() as u64;
    let extra = if spread == 0 {
        Duration::ZERO
    } else {
        Duration::from_millis(rng.gen_range(0..spread))
    };
    remaining + extra
}

/// reqwest-backed fetcher with its own throttle.
pub struct HttpFetcher {
    client: reqwest::Client,
    throttle: Throttle,
}

impl HttpFetcher {
    pub fn new(config: &CrawlerConfig) -> Result<Self> {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Build with a caller-supplied RNG for the throttle jitter.
    pub fn with_rng(config: &CrawlerConfig, rng: StdRng) -> Result<Self> {
        Ok(Self {
            client: create_async_client(config)?,
            throttle: Throttle::new(
                Duration::from_millis(config.min_delay_ms),
                Duration::from_millis(config.max_delay_ms),
                rng,
            ),
        })
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, request: &SourceRequest) -> Result<String> {
        self.throttle.wait().await;
        log::debug!(
            "GET {} ({})",
            request.url,
            get_domain(&request.url).unwrap_or_default()
        );

        let response = self
            .client
            .get(&request.url)
            .header(REFERER, request.referer)
            .header(ACCEPT, request.accept)
            .send()
            .await
            .map_err(|e| AppError::network(&request.url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::network(&request.url, format!("HTTP {status}")));
        }

        response
            .text()
            .await
            .map_err(|e| AppError::network(&request.url, e))
    }
}
