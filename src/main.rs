//! Mixsite Agent — Binary Entrypoint
//! Parses the CLI, loads configuration, wires tracing to console + log
//! file, and runs one check or the continuous scheduler loop.

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mixsite_agent::agent::Agent;
use mixsite_agent::config::AgentConfig;

#[derive(Parser, Debug)]
#[command(name = "mixsite-agent", about = "Watches a Mixcloud profile and republishes new uploads on a static website")]
struct Cli {
    /// Run a single check and exit (also the no-flag default).
    #[arg(long, conflicts_with = "continuous")]
    check_once: bool,
    /// Run continuously with scheduled checks and daily maintenance.
    #[arg(long)]
    continuous: bool,
    /// Path to the agent configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Mirror every log line to the console and to the append-only log file.
fn init_tracing(log_file: &Path) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("opening log file {}", log_file.display()))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .with(fmt::layer().with_ansi(false).with_writer(Arc::new(file)))
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AgentConfig::load_from_file(path)?,
        None => AgentConfig::load_default()?,
    };

    init_tracing(&config.log_file)?;

    let agent = Agent::from_config(&config)?;
    if single_pass(&cli) {
        agent.check_for_new_mixes().await;
    } else {
        agent.run_continuous().await;
    }
    Ok(())
}

/// --check-once and the no-flag default both run a single pass.
fn single_pass(cli: &Cli) -> bool {
    cli.check_once || !cli.continuous
}
