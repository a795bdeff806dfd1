//! `readlog`
//!
//! This crate contains the command line shell of readlog: configuration, application state and
//! one command per screen of the reading record.
use crate::cli::Cli;
use crate::config::Config;
use crate::state::AppState;
use anyhow::{Error, anyhow};
use clap::Parser as _;
use tracing_subscriber::EnvFilter;
/// Command line definition
mod cli;
/// One function per command, each driving a view-state holder
mod commands;
/// Environment configuration
mod config;
/// Error types
mod errors;
/// App state management
mod state;

#[allow(
    clippy::missing_inline_in_public_items,
    reason = "Executed once per run, never across crate boundaries"
)]
#[allow(
    clippy::print_stderr,
    reason = "Tracing might not be available here if run_safe() failed before its initialization"
)]
pub fn run() {
    if let Err(error) = run_safe() {
        eprintln!("Failed to run readlog! Error: {error}");
    }
}

/// Encapsulated run function that allows returning errors instead of always panicking on `Err` or
/// `None` variants
fn run_safe() -> Result<(), Error> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!("Unable to set global tracing subscriber: {err}"))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async {
        let config = Config::from_env()?;
        let state = AppState::new(&config).await?;
        let result = commands::dispatch(&state, cli.command).await;
        state.db.close().await;
        result
    })?;
    Ok(())
}
