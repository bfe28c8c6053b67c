//! Lottery crawler CLI
//!
//! Local execution entry point. `invoke` runs a JSON request through the
//! same handler used for scheduled invocations.

use std::io::Read;
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use lottery_crawler::{
    app::App,
    error::{AppError, Result},
    handler::{self, Request},
    models::{Config, GameKind, IssueId},
    pipeline::BackfillStatus,
};
use serde::Serialize;

/// Lottery draw crawler and candidate generator
#[derive(Parser, Debug)]
#[command(
    name = "lottery",
    version,
    about = "Sync lottery draws and generate candidate combinations"
)]
struct Cli {
    /// Path to storage directory holding draws and secrets
    #[arg(short, long, default_value = "storage")]
    storage: PathBuf,

    /// Path to config file (default: {storage}/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level override (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Bring stored draws up to date (full batch when nothing is stored)
    Sync {
        /// Game code; all games when omitted
        #[arg(short, long)]
        game: Option<GameKind>,
    },

    /// Load older history in bounded batches
    Backfill {
        #[arg(short, long)]
        game: GameKind,

        /// Batches to run before stopping
        #[arg(long, default_value_t = 1)]
        rounds: usize,
    },

    /// Sync, predict and send the daily report
    Daily {
        #[arg(short, long)]
        game: Option<GameKind>,
    },

    /// Store draws between two issues or two dates
    Import {
        #[arg(short, long)]
        game: GameKind,

        /// First issue (YYYYNNN or YYNNN)
        #[arg(long, requires = "to_issue", conflicts_with = "from_date")]
        from_issue: Option<String>,

        /// Last issue
        #[arg(long)]
        to_issue: Option<String>,

        /// First draw date (YYYY-MM-DD)
        #[arg(long, requires = "to_date")]
        from_date: Option<NaiveDate>,

        /// Last draw date
        #[arg(long)]
        to_date: Option<NaiveDate>,
    },

    /// Show the newest stored draw
    Latest {
        #[arg(short, long)]
        game: GameKind,
    },

    /// Generate candidate combinations
    Predict {
        #[arg(short, long)]
        game: GameKind,

        /// Number of candidates (default from config)
        #[arg(short = 'n', long)]
        count: Option<usize>,

        /// Comma separated strategy keys (default from config)
        #[arg(long, value_delimiter = ',')]
        strategies: Vec<String>,
    },

    /// Show frequency statistics over the recent window
    Stats {
        #[arg(short, long)]
        game: GameKind,

        #[arg(long, default_value_t = 10)]
        top: usize,
    },

    /// List available strategies
    Strategies,

    /// Check notifier connectivity and send a test message
    TestNotify,

    /// Validate configuration file
    Validate,

    /// Run a JSON request through the handler ("-" reads stdin)
    Invoke { request: String },
}

/// Initialize logging with the given default level.
fn init_logging(level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_issue(raw: &str) -> Result<IssueId> {
    IssueId::normalize(raw).ok_or_else(|| AppError::validation(format!("Invalid issue '{raw}'")))
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| cli.storage.join("config.toml"));

    let level = cli.log_level.clone().unwrap_or_else(|| {
        Config::load(&config_path)
            .map(|c| c.logging.level)
            .unwrap_or_else(|_| "info".to_string())
    });
    init_logging(&level);

    if let Command::Validate = cli.command {
        log::info!("Validating {}...", config_path.display());
        let config = Config::load(&config_path)?;
        if let Err(e) = config.validate() {
            log::error!("Config validation failed: {}", e);
            return Err(e);
        }
        log::info!("✓ Config OK");
        return Ok(());
    }

    let app = App::bootstrap(&config_path, Some(cli.storage.clone()))?;
    log::info!("Using storage at {}", cli.storage.display());

    match cli.command {
        Command::Sync { game } => {
            let games = game.map_or_else(|| GameKind::ALL.to_vec(), |g| vec![g]);
            for game in games {
                match app.sync(game).await {
                    Ok(outcome) => print_json(&outcome)?,
                    Err(e) => {
                        log::error!("[{}] sync failed: {}", game, e);
                        app.report_error(&e).await;
                    }
                }
            }
        }

        Command::Backfill { game, rounds } => {
            for round in 1..=rounds.max(1) {
                let outcome = app.backfill(game).await?;
                log::info!(
                    "[{}] round {}/{}: +{} draws, {} stored, oldest {}",
                    game,
                    round,
                    rounds,
                    outcome.inserted,
                    outcome.total,
                    outcome
                        .oldest_issue
                        .as_ref()
                        .map(|i| i.as_str())
                        .unwrap_or("-")
                );
                if outcome.status == BackfillStatus::Complete {
                    print_json(&outcome)?;
                    break;
                }
                if round == rounds.max(1) {
                    print_json(&outcome)?;
                }
            }
        }

        Command::Daily { game } => {
            let games = game.map_or_else(|| GameKind::ALL.to_vec(), |g| vec![g]);
            for game in games {
                match app.daily(game).await {
                    Ok(outcome) => print_json(&outcome)?,
                    Err(e) => {
                        log::error!("[{}] daily run failed: {}", game, e);
                        app.report_error(&e).await;
                    }
                }
            }
        }

        Command::Import {
            game,
            from_issue,
            to_issue,
            from_date,
            to_date,
        } => {
            let summary = match (from_issue, to_issue, from_date, to_date) {
                (Some(from), Some(to), _, _) => {
                    app.import_range(game, &parse_issue(&from)?, &parse_issue(&to)?)
                        .await?
                }
                (_, _, Some(from), Some(to)) => app.import_dates(game, from, to).await?,
                _ => {
                    return Err(AppError::validation(
                        "Give --from-issue/--to-issue or --from-date/--to-date",
                    ));
                }
            };
            print_json(&summary)?;
        }

        Command::Latest { game } => match app.latest(game).await? {
            Some(record) => print_json(&record)?,
            None => log::warn!("[{}] no stored draws yet", game),
        },

        Command::Predict {
            game,
            count,
            strategies,
        } => {
            let candidates = app.predict(game, count, &strategies).await?;
            print_json(&candidates)?;
        }

        Command::Stats { game, top } => {
            print_json(&app.stats(game, top).await?)?;
        }

        Command::Strategies => print_json(&app.strategies())?,

        Command::TestNotify => {
            if app.test_notifier().await {
                log::info!("✓ Notifier connected");
            } else {
                return Err(AppError::config("Notifier connection failed"));
            }
        }

        Command::Invoke { request } => {
            let body = if request == "-" {
                let mut buffer = String::new();
                std::io::stdin().read_to_string(&mut buffer)?;
                buffer
            } else {
                request
            };
            let request: Request = serde_json::from_str(&body)?;
            let response = handler::handle(&app, request).await;
            print_json(&response)?;
            if !response.success {
                std::process::exit(1);
            }
        }

        Command::Validate => {}
    }

    Ok(())
}
