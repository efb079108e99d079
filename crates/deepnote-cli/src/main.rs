//! Deepnote CLI - manage SQL integration credentials outside the editor
//!
//! A thin operator interface over `deepnote-core`: inspect and edit the
//! encrypted integration store, and preview what a kernel would receive for a
//! given project.

mod app;
mod cli;
mod commands;
mod config;
mod constants;
mod errors;
mod output;

use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use clap_complete::generate;
use tracing_subscriber::EnvFilter;

use crate::app::AppContext;
use crate::cli::{Cli, Commands};
use crate::constants::LOG_ENV;
use crate::errors::exit_code_for;

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "deepnote", &mut std::io::stdout());
        return Ok(());
    }

    let ctx = AppContext::load(&cli)?;

    match cli.command {
        Commands::List { json } => commands::integrations::list(&ctx, json).await,
        Commands::Show { id } => commands::integrations::show(&ctx, &id).await,
        Commands::Add { file } => commands::integrations::add(&ctx, &file).await,
        Commands::Remove { id } => commands::integrations::remove(&ctx, &id).await,
        Commands::Clear { yes } => commands::integrations::clear(&ctx, yes).await,
        Commands::Detect { project, json } => {
            commands::project::detect(&ctx, &project, json).await
        }
        Commands::Env { project, json } => commands::project::env(&ctx, &project, json).await,
        Commands::StartupCode { project, language } => {
            commands::project::startup_code(&ctx, &project, &language).await
        }
        Commands::Completions { .. } => Ok(()),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", err);
            let code = exit_code_for(&err);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}
