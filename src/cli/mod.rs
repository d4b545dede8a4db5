//! cli
//!
//! Command-line interface layer for appgit.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Install logging and load configuration
//! - Delegate to command handlers
//! - Does NOT touch repositories directly
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap and dispatches to the
//! [`crate::service::RepoService`], which owns locking, path routing and
//! every git call.

pub mod args;
pub mod commands;
pub mod output;

pub use args::Cli;

use std::time::Duration;

use anyhow::{Context as _, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::core::config::Config;
use crate::core::types::Deadline;
use crate::service::RepoService;
use output::Verbosity;

/// Everything a command handler needs.
#[derive(Debug, Clone)]
pub struct Context {
    pub service: RepoService,
    pub json: bool,
    pub verbosity: Verbosity,
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    init_logging(cli.debug);

    let ctx = context_from(&cli)?;
    commands::dispatch(cli.command, &ctx)
}

/// Build the handler context from global flags.
pub fn context_from(cli: &Cli) -> Result<Context> {
    let mut config = match &cli.config {
        Some(path) => Config::from_path(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::load().context("failed to load config")?,
    };
    if let Some(root) = &cli.root {
        config = config.with_root(root);
    }
    if let Some(path) = config.loaded_from() {
        tracing::debug!(path = %path.display(), "loaded config");
    }

    let mut service = RepoService::new(config);
    if let Some(secs) = cli.timeout {
        service = service.with_deadline(Deadline::after(Duration::from_secs(secs)));
    }

    Ok(Context {
        service,
        json: cli.json,
        verbosity: Verbosity::from_flags(cli.quiet, cli.debug),
    })
}

/// Log to stderr. `RUST_LOG` wins; otherwise `warn`, or `debug` with `--debug`.
fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // try_init: a subscriber may already be set when embedded in tests
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
