mod builder;
mod catalog;
mod cli;
mod context;
mod credentials;
mod error;
mod export;
mod lifecycle;
mod logging;
mod model;
#[cfg(feature = "tui")]
mod orchestrator;
mod reconcile;
mod render;
mod runtime;
mod storage;
#[cfg(feature = "tui")]
mod tui;
mod validation;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let settings = cli::build_settings(&args)?;
    let is_tui = args.command.is_none() && cfg!(feature = "tui");

    // stderr belongs to the terminal UI while it runs.
    let log_guard = logging::init_logging(&settings.log_dir(), args.verbose && !is_tui);
    tracing::debug!(data_dir = %settings.data_dir.display(), "starting");

    match cli::run(args, settings).await {
        Ok(()) => Ok(()),
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "command failed");
            eprintln!("error: {e:#}");
            drop(log_guard);
            std::process::exit(1);
        }
    }
}
