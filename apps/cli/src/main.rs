//! Settle CLI entry point.
//!
//! Exit codes: 0 when the condition was met, 2 when it was still unmet at
//! the deadline, 1 for any other error.

mod cli;
mod commands;
mod config;
mod logging;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::Summary;

const EXIT_UNSATISFIED: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let json = cli.json;

    match run(cli).await {
        Ok(None) => ExitCode::SUCCESS,
        Ok(Some(summary)) => {
            commands::output(&summary, json);
            if summary.satisfied {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(EXIT_UNSATISFIED)
            }
        }
        Err(err) => {
            if json {
                println!("{}", serde_json::json!({ "error": format!("{err:#}") }));
            } else {
                eprintln!("error: {err:#}");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<Option<Summary>> {
    if let Commands::Completions { shell } = cli.command {
        commands::completions::run(shell, &mut std::io::stdout());
        return Ok(None);
    }

    let config = config::load(cli.config.as_deref())?;
    logging::init(&config.log, cli.verbose);
    tracing::debug!(?config, "Configuration loaded");

    let summary = match cli.command {
        Commands::Http(args) => commands::http::run(args, &config).await?,
        Commands::Exec(args) => commands::exec::run(args, &config).await?,
        Commands::Probe(args) => commands::probe::run(args, &config).await?,
        Commands::Completions { .. } => return Ok(None),
    };
    Ok(Some(summary))
}
