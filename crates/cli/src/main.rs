//! Issue labeler CLI entry point.
//!
//! This binary is the composition root for the entire system. Responsibilities:
//!
//! 1. **Parse configuration**: layer defaults, `.issue-labeler/config.toml`
//!    (or `--config`) and `ISSUE_LABELER_*` environment variables.
//! 2. **Wire observability**: configure `tracing-subscriber` and, when an
//!    endpoint is configured, an OpenTelemetry OTLP exporter. Every command
//!    runs inside a root span carrying a fresh [`triage::RunId`].
//! 3. **Construct infrastructure**: retry-once GitHub clients and the HTTP
//!    label predictor, injected into [`triage::Labeler`] and
//!    [`triage::BoardTriage`].
//! 4. **Dispatch**: `predict` labels one item; `board ...` runs card routines.

mod commands;
mod config;
mod telemetry;

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info_span, Instrument};

use triage::RunId;

use crate::commands::Command;
use crate::config::Config;

#[derive(Debug, Parser)]
#[command(name = "issue-labeler", version, about = "Labels GitHub issues and triages project boards")]
struct Cli {
    /// Configuration file (defaults to `.issue-labeler/config.toml` when present).
    #[arg(long, global = true, env = "ISSUE_LABELER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is normal.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    let telemetry = telemetry::init(&config.telemetry)?;

    let run_id = RunId::new_random();
    let span = info_span!("run", run_id = %run_id);
    let result = commands::run(cli.command, &config).instrument(span).await;

    if let Err(err) = &result {
        error!(run_id = %run_id, error = format!("{err:#}"), "Command failed");
    }
    telemetry.shutdown();
    result
}
