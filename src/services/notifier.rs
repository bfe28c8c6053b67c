// src/services/notifier.rs

//! Best-effort chat notifications.
//!
//! Every operation reports success as a `bool`; failures are logged and
//! never abort the pipeline.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};

use crate::config::Secrets;
use crate::error::{AppError, Result};
use crate::models::{Candidate, CrawlerConfig, DrawRecord, FrequencySummary, GameKind};
use crate::utils::http::create_async_client;

const TELEGRAM_API: &str = "https://api.telegram.org";

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_message(&self, text: &str) -> bool;

    async fn send_daily_report(
        &self,
        latest: &DrawRecord,
        candidates: &[Candidate],
        stats: &FrequencySummary,
    ) -> bool {
        self.send_message(&format_daily_report(latest, candidates, stats))
            .await
    }

    async fn send_error(&self, error: &AppError) -> bool {
        self.send_message(&format_error(error, &error_id(error)))
            .await
    }

    async fn send_backfill_progress(&self, game: GameKind, inserted: usize, total: usize) -> bool {
        self.send_message(&format!(
            "📥 <b>{} backfill</b>\nInserted {} draws, {} stored in total",
            game.display_name(),
            inserted,
            total
        ))
        .await
    }

    async fn test_connection(&self) -> bool;
}

#[derive(Debug, Deserialize)]
struct TelegramReply {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Telegram Bot API notifier.
///
/// Without both a token and a chat id every call is a logged no-op
/// returning `false`.
pub struct TelegramNotifier {
    client: reqwest::Client,
    credentials: Option<(String, String)>,
    api_base: String,
}

impl TelegramNotifier {
    pub fn new(client: reqwest::Client, secrets: &Secrets) -> Self {
        let credentials = match (&secrets.telegram_bot_token, &secrets.telegram_chat_id) {
            (Some(token), Some(chat)) => Some((token.clone(), chat.clone())),
            _ => None,
        };
        Self {
            client,
            credentials,
            api_base: TELEGRAM_API.to_string(),
        }
    }

    pub fn from_config(config: &CrawlerConfig, secrets: &Secrets) -> Result<Self> {
        Ok(Self::new(create_async_client(config)?, secrets))
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    fn method_url(&self, token: &str, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, token, method)
    }

    async fn post_message(&self, token: &str, chat_id: &str, text: &str) -> Result<TelegramReply> {
        let body = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "HTML",
        });
        let response = self
            .client
            .post(self.method_url(token, "sendMessage"))
            .json(&body)
            .send()
            .await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_message(&self, text: &str) -> bool {
        let Some((token, chat_id)) = &self.credentials else {
            log::warn!("Telegram credentials missing; message not sent");
            return false;
        };
        match self.post_message(token, chat_id, text).await {
            Ok(reply) if reply.ok => true,
            Ok(reply) => {
                log::error!(
                    "Telegram rejected message: {}",
                    reply.description.unwrap_or_default()
                );
                false
            }
            Err(e) => {
                log::error!("Telegram send failed: {}", e);
                false
            }
        }
    }

    async fn test_connection(&self) -> bool {
        let Some((token, _)) = &self.credentials else {
            log::warn!("Telegram credentials missing");
            return false;
        };
        let reply = async {
            let response = self
                .client
                .get(self.method_url(token, "getMe"))
                .send()
                .await?;
            Ok::<TelegramReply, AppError>(response.json().await?)
        }
        .await;
        match reply {
            Ok(reply) => reply.ok,
            Err(e) => {
                log::error!("Telegram connectivity check failed: {}", e);
                false
            }
        }
    }
}

/// Cooldown before the same error may be reported again.
pub fn cooldown_for(kind: &str) -> Duration {
    let minutes = match kind {
        "network" => 15,
        "parse" => 20,
        "storage" => 10,
        "all_sources_failed" => 5,
        _ => 30,
    };
    Duration::from_secs(minutes * 60)
}

/// First 8 hex chars of SHA-256 over kind and message.
pub fn error_id(error: &AppError) -> String {
    let mut hasher = Sha256::new();
    hasher.update(error.kind().as_bytes());
    hasher.update(b":");
    hasher.update(error.to_string().as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..8].to_string()
}

/// Deduplicates error reports per kind and message.
pub struct ErrorNotifier {
    inner: Arc<dyn Notifier>,
    /// Error id to the time it was last sent and its cooldown
    last_sent: Mutex<HashMap<String, (Instant, Duration)>>,
}

impl ErrorNotifier {
    pub fn new(inner: Arc<dyn Notifier>) -> Self {
        Self {
            inner,
            last_sent: Mutex::new(HashMap::new()),
        }
    }

    /// Report `error` unless the same one went out within its cooldown.
    pub async fn notify(&self, error: &AppError) -> bool {
        let id = error_id(error);
        if !self.should_send(&id, error.kind(), Instant::now()) {
            log::info!("Suppressing repeated {} error {}", error.kind(), id);
            return false;
        }
        self.inner.send_error(error).await
    }

    fn should_send(&self, id: &str, kind: &str, now: Instant) -> bool {
        let Ok(mut last_sent) = self.last_sent.lock() else {
            return true;
        };
        last_sent.retain(|_, (sent, cooldown)| now.saturating_duration_since(*sent) < *cooldown);
        if last_sent.contains_key(id) {
            return false;
        }
        last_sent.insert(id.to_string(), (now, cooldown_for(kind)));
        true
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.last_sent.lock().map(|m| m.len()).unwrap_or_default()
    }
}

/// Escape text for Telegram's HTML parse mode.
fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn join_numbers(values: &[u8]) -> String {
    values
        .iter()
        .map(|n| format!("{n:02}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn join_counts(counts: &[(u8, u32)]) -> String {
    counts
        .iter()
        .map(|(n, c)| format!("{n:02}({c})"))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn format_error(error: &AppError, id: &str) -> String {
    format!(
        "⚠️ <b>Error</b> [{}] <code>{}</code>\n{}",
        error.kind(),
        id,
        escape_html(&error.to_string())
    )
}

pub fn format_daily_report(
    latest: &DrawRecord,
    candidates: &[Candidate],
    stats: &FrequencySummary,
) -> String {
    let mut lines = vec![
        format!(
            "🎯 <b>{}</b> issue {} ({})",
            latest.game.display_name(),
            latest.issue,
            latest.draw_date
        ),
        format!("Draw: {}", format_balls(&latest.balls.primary, &latest.balls.secondary)),
        String::new(),
        format!("<b>Candidates</b> ({})", candidates.len()),
    ];
    for (i, candidate) in candidates.iter().enumerate() {
        lines.push(format!(
            "{}. {} <i>{}</i>",
            i + 1,
            format_balls(&candidate.balls.primary, &candidate.balls.secondary),
            escape_html(&candidate.strategy_name)
        ));
    }
    lines.push(String::new());
    lines.push(format!(
        "<b>Hot numbers</b> (last {} draws)",
        stats.window
    ));
    lines.push(format!("Primary: {}", join_counts(&stats.top_primary)));
    if !stats.top_secondary.is_empty() {
        lines.push(format!("Secondary: {}", join_counts(&stats.top_secondary)));
    }
    lines.join("\n")
}

fn format_balls(primary: &[u8], secondary: &[u8]) -> String {
    if secondary.is_empty() {
        join_numbers(primary)
    } else {
        format!("{} + {}", join_numbers(primary), join_numbers(secondary))
    }
}
