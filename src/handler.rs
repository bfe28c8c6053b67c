// src/handler.rs

//! JSON request handler for scheduled and manual invocations.
//!
//! Requests name an action and optional parameters. Mutating actions need a
//! bearer token equal to the configured API key. Every response carries the
//! execution time; errors that reach this boundary are reported through the
//! error notifier before being returned.

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};

use crate::app::App;
use crate::error::Result;
use crate::models::GameKind;

/// Draws listed per zone by the stats action when `top` is absent.
const DEFAULT_STATS_TOP: usize = 10;

/// Invocation payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Request {
    pub action: String,

    /// Game code; mutating actions run every game when absent
    #[serde(default)]
    pub game: Option<String>,

    /// Number of candidates for `predict`
    #[serde(default)]
    pub count: Option<usize>,

    /// Comma separated strategy keys for `predict`
    #[serde(default)]
    pub strategies: Option<String>,

    /// Values per zone for `stats`
    #[serde(default)]
    pub top: Option<usize>,

    /// Bearer token, with or without the `Bearer ` prefix
    #[serde(default)]
    pub bearer: Option<String>,
}

/// Invocation result.
#[derive(Debug, Clone, Serialize)]
pub struct Response {
    /// HTTP-style status code
    pub status: u16,

    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Execution time in milliseconds
    pub execution_time_ms: u64,
}

impl Response {
    fn success(data: Value) -> Self {
        Self {
            status: 200,
            success: true,
            data: Some(data),
            error: None,
            execution_time_ms: 0,
        }
    }

    fn failure(status: u16, error: impl Into<String>) -> Self {
        Self {
            status,
            success: false,
            data: None,
            error: Some(error.into()),
            execution_time_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Backfill,
    Sync,
    Daily,
    Latest,
    Predict,
    Stats,
    Strategies,
    TestNotifier,
}

impl Action {
    /// Actions that write to storage or send reports.
    pub fn is_mutating(self) -> bool {
        matches!(self, Self::Backfill | Self::Sync | Self::Daily)
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Backfill => "backfill",
            Self::Sync => "sync",
            Self::Daily => "daily",
            Self::Latest => "latest",
            Self::Predict => "predict",
            Self::Stats => "stats",
            Self::Strategies => "strategies",
            Self::TestNotifier => "test_notifier",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "backfill" => Ok(Self::Backfill),
            "sync" => Ok(Self::Sync),
            "daily" => Ok(Self::Daily),
            "latest" => Ok(Self::Latest),
            "predict" => Ok(Self::Predict),
            "stats" => Ok(Self::Stats),
            "strategies" => Ok(Self::Strategies),
            "test_notifier" => Ok(Self::TestNotifier),
            other => Err(format!("Unknown action '{other}'")),
        }
    }
}

/// A validated request.
#[derive(Debug)]
struct Command {
    action: Action,
    games: Vec<GameKind>,
    count: Option<usize>,
    strategies: Vec<String>,
    top: usize,
}

impl Command {
    /// `known` lists the registered strategy keys.
    fn parse(request: &Request, known: &[&str]) -> std::result::Result<Self, String> {
        let action: Action = request.action.parse()?;
        let games = match request.game.as_deref() {
            Some(code) => vec![code.parse::<GameKind>().map_err(|e| e.to_string())?],
            None if action.is_mutating() => GameKind::ALL.to_vec(),
            None => vec![GameKind::Ssq],
        };
        let strategies: Vec<String> = request
            .strategies
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if let Some(unknown) = strategies.iter().find(|s| !known.contains(&s.as_str())) {
            return Err(format!(
                "Unknown strategy '{unknown}', available: {}",
                known.join(", ")
            ));
        }
        Ok(Self {
            action,
            games,
            count: request.count,
            strategies,
            top: request.top.unwrap_or(DEFAULT_STATS_TOP),
        })
    }
}

/// Compare a bearer token against the configured key; no key means no access.
fn authorized(api_key: Option<&str>, bearer: Option<&str>) -> bool {
    let (Some(key), Some(bearer)) = (api_key, bearer) else {
        return false;
    };
    let token = bearer.strip_prefix("Bearer ").unwrap_or(bearer).trim();
    !key.is_empty() && digests_match(token, key)
}

/// Compare SHA-256 digests without exiting on the first differing byte.
fn digests_match(a: &str, b: &str) -> bool {
    let (a, b) = (Sha256::digest(a.as_bytes()), Sha256::digest(b.as_bytes()));
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Route one request.
pub async fn handle(app: &App, request: Request) -> Response {
    let start = Instant::now();
    let known: Vec<&str> = app.strategies().iter().map(|s| s.key).collect();
    let mut response = match Command::parse(&request, &known) {
        Err(message) => {
            log::warn!("Rejected request: {}", message);
            Response::failure(400, message)
        }
        Ok(command)
            if command.action.is_mutating()
                && !authorized(app.api_key(), request.bearer.as_deref()) =>
        {
            log::warn!("Unauthorized {} request", command.action);
            Response::failure(401, "Unauthorized")
        }
        Ok(command) => execute(app, &command).await,
    };
    response.execution_time_ms = start.elapsed().as_millis() as u64;
    log::info!(
        "{} -> {} in {}ms",
        request.action,
        response.status,
        response.execution_time_ms
    );
    response
}

async fn execute(app: &App, command: &Command) -> Response {
    match command.action {
        Action::Strategies => return Response::success(json!(app.strategies())),
        Action::TestNotifier => {
            return if app.test_notifier().await {
                Response::success(json!({ "connected": true }))
            } else {
                Response::failure(503, "Notifier connection failed")
            };
        }
        _ => {}
    }

    let mut results = Vec::with_capacity(command.games.len());
    let mut errors = Vec::new();
    let mut server_failure = false;
    for &game in &command.games {
        match run_for_game(app, command, game).await {
            Ok(value) => results.push(value),
            Err(e) if e.is_client_error() => {
                log::warn!("[{}] {} rejected: {}", game, command.action, e);
                errors.push(format!("{game}: {e}"));
            }
            Err(e) => {
                log::error!("[{}] {} failed: {}", game, command.action, e);
                app.report_error(&e).await;
                server_failure = true;
                errors.push(format!("{game}: {e}"));
            }
        }
    }

    let data = match (command.games.len(), results.pop()) {
        (1, Some(value)) => Some(value),
        (1, None) => None,
        (_, last) => {
            results.extend(last);
            Some(Value::Array(results))
        }
    };
    if errors.is_empty() {
        return Response::success(data.unwrap_or(Value::Null));
    }
    let status = if server_failure { 500 } else { 400 };
    Response {
        data,
        ..Response::failure(status, errors.join("; "))
    }
}

async fn run_for_game(app: &App, command: &Command, game: GameKind) -> Result<Value> {
    let value = match command.action {
        Action::Backfill => serde_json::to_value(app.backfill(game).await?)?,
        Action::Sync => serde_json::to_value(app.sync(game).await?)?,
        Action::Daily => serde_json::to_value(app.daily(game).await?)?,
        Action::Latest => serde_json::to_value(app.latest(game).await?)?,
        Action::Predict => serde_json::to_value(
            app.predict(game, command.count, &command.strategies)
                .await?,
        )?,
        Action::Stats => serde_json::to_value(app.stats(game, command.top).await?)?,
        Action::Strategies => serde_json::to_value(app.strategies())?,
        Action::TestNotifier => json!({ "connected": app.test_notifier().await }),
    };
    Ok(value)
}
