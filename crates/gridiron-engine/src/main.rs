//! Operational binary for the Gridiron Council platform.
//!
//! Wires the data layer, the UDV assembler, the expert pipeline, the
//! bankroll loop, and the learning coordinator behind an operator CLI.
//!
//! # Commands
//!
//! - `init-run` -- create a run, seed bankrolls and calibration
//! - `ingest` -- backfill UDV snapshots for season weeks
//! - `predict` -- run one parallel expert round for a game
//! - `settle` -- settle a game's bets and run learning
//! - `select-council` -- recompute the weekly council
//! - `status` -- per-expert bankroll, eligibility, recent accuracy
//!
//! # Exit codes
//!
//! 0 success; 2 validation failure; 3 adapter outage; 4 invariant
//! violation (a bug -- requires human audit).
//!
//! # Startup sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Parse the CLI
//! 3. Load engine settings (environment, optional `gridiron.yaml`)
//! 4. Connect to PostgreSQL, migrate, and verify the schema (and
//!    connect Dragonfly when configured)
//! 5. Dispatch the command

mod commands;
mod error;
mod metrics;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use gridiron_db::{DragonflyPool, PostgresPool};
use gridiron_types::{GameId, RunId};

use crate::commands::AppContext;
use crate::error::EngineError;

/// Gridiron Council operational CLI.
#[derive(Debug, Parser)]
#[command(name = "gridiron", version, about = "NFL expert-council prediction platform")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a new run and seed the fifteen-expert roster.
    InitRun {
        /// Run identifier; generated when omitted.
        run_id: Option<RunId>,
        /// NFL season the run covers.
        #[arg(long, default_value_t = 2025)]
        season: u16,
    },
    /// Backfill UDV snapshots for season weeks.
    Ingest {
        /// Season to ingest.
        season: u16,
        /// Week numbers to ingest.
        #[arg(required = true)]
        weeks: Vec<u16>,
    },
    /// Trigger parallel expert predictions for a game.
    Predict {
        /// The run.
        #[arg(long, env = "GRIDIRON_RUN_ID")]
        run_id: RunId,
        /// The game to predict.
        game_id: GameId,
    },
    /// Settle a game's bets and run the learning coordinator.
    Settle {
        /// The run.
        #[arg(long, env = "GRIDIRON_RUN_ID")]
        run_id: RunId,
        /// The game to settle.
        game_id: GameId,
        /// Final home score.
        home_score: u16,
        /// Final away score.
        away_score: u16,
    },
    /// Recompute the council for a week.
    SelectCouncil {
        /// The run.
        #[arg(long, env = "GRIDIRON_RUN_ID")]
        run_id: RunId,
        /// Season week.
        week: u16,
    },
    /// Print per-expert bankroll, eligibility, and recent accuracy.
    Status {
        /// The run.
        run_id: RunId,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // 1. Structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "command failed");
            ExitCode::from(e.exit_code())
        }
    }
}

/// Load context and dispatch the parsed command.
async fn run(cli: Cli) -> Result<(), EngineError> {
    let ctx = build_context().await?;

    match cli.command {
        Command::InitRun { run_id, season } => {
            let run_id = run_id.unwrap_or_else(RunId::new);
            commands::init_run(&ctx, run_id, season).await
        }
        Command::Ingest { season, weeks } => commands::ingest(&ctx, season, &weeks).await,
        Command::Predict { run_id, game_id } => {
            commands::predict(&ctx, run_id, game_id).await
        }
        Command::Settle {
            run_id,
            game_id,
            home_score,
            away_score,
        } => commands::settle(&ctx, run_id, game_id, home_score, away_score).await,
        Command::SelectCouncil { run_id, week } => {
            commands::select_council(&ctx, run_id, week).await
        }
        Command::Status { run_id } => commands::status(&ctx, run_id).await,
    }
}

/// Build the application context from the environment and optional
/// `gridiron.yaml` settings file.
async fn build_context() -> Result<AppContext, EngineError> {
    let settings = load_settings();

    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| EngineError::Validation(String::from("DATABASE_URL is required")))?;
    let pg = PostgresPool::connect(&database_url).await?;
    pg.run_migrations().await?;
    pg.verify_schema().await?;

    let dragonfly = match std::env::var("DRAGONFLY_URL") {
        Ok(url) => match DragonflyPool::connect(&url).await {
            Ok(pool) => Some(pool),
            Err(e) => {
                tracing::warn!(error = %e, "Dragonfly unavailable; running without hot cache");
                None
            }
        },
        Err(_) => None,
    };

    info!(
        council_size = settings.council_size,
        starting_units = %settings.starting_units,
        "engine context ready"
    );

    Ok(AppContext {
        pg,
        dragonfly,
        starting_units: settings.starting_units,
        council_size: settings.council_size,
        reflection_enabled: settings.reflection_enabled,
        shadow_enabled: settings.shadow_enabled,
        max_parallel_experts: settings.max_parallel_experts,
    })
}

/// Tunable settings with their defaults.
struct Settings {
    starting_units: Decimal,
    council_size: usize,
    reflection_enabled: bool,
    shadow_enabled: bool,
    max_parallel_experts: usize,
}

/// Load tunables: `gridiron.yaml` when present, environment overrides on
/// top, documented defaults underneath.
fn load_settings() -> Settings {
    let file = config::Config::builder()
        .add_source(config::File::with_name("gridiron").required(false))
        .add_source(config::Environment::with_prefix("GRIDIRON"))
        .build()
        .ok();

    let get_int = |key: &str, default: i64| -> i64 {
        file.as_ref()
            .and_then(|c| c.get_int(key).ok())
            .unwrap_or(default)
    };
    let get_bool = |key: &str, default: bool| -> bool {
        file.as_ref()
            .and_then(|c| c.get_bool(key).ok())
            .unwrap_or(default)
    };

    let starting_units = std::env::var("STARTING_BANKROLL")
        .ok()
        .and_then(|v| v.parse::<Decimal>().ok())
        .unwrap_or_else(|| Decimal::from(get_int("starting_units", 100)));

    Settings {
        starting_units,
        council_size: usize::try_from(get_int("council_size", 5)).unwrap_or(5),
        reflection_enabled: get_bool("reflection_enabled", true),
        shadow_enabled: get_bool("shadow_enabled", false),
        max_parallel_experts: usize::try_from(get_int("max_parallel_experts", 8)).unwrap_or(8),
    }
}
