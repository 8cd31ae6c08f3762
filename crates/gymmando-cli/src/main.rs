//! CLI entry point for Gymmando.
//!
//! This binary provides the `gymmando` command with subcommands for the
//! interactive REPL, one-shot requests, setup, and status checks.

mod cli;
mod commands;
mod config;
mod helpers;
mod repl;

use anyhow::Result;
use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::config::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let mut config = AppConfig::load(&cli.config)?;
    config.apply_env();

    match cli.command {
        Commands::Run => repl::cmd_run(&config, &cli.owner, cli.json).await,
        Commands::Ask {
            text,
            intent,
            record,
        } => {
            commands::cmd_ask(
                &config,
                &cli.owner,
                cli.json,
                &text.join(" "),
                intent,
                record,
            )
            .await
        }
        Commands::Setup => commands::cmd_setup(&config, &cli.config).await,
        Commands::Status => commands::cmd_status(&config, &cli.config, &cli.owner).await,
    }
}
