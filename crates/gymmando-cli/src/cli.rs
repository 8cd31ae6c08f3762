//! CLI argument definitions for Gymmando.
//!
//! All `clap` structures live here so that `main.rs` stays focused on
//! dispatching subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use gymmando_intent::Intent;

/// Default config location, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Gymmando -- log and query workouts in plain language.
#[derive(Parser, Debug)]
#[command(
    name = "gymmando",
    version,
    about = "Gymmando -- workout logging assistant",
    long_about = "Log, list, edit and delete workouts by describing them in plain language. \
                  Each message is classified, validated and routed to the workout store."
)]
pub struct Cli {
    /// Owner every request is scoped to.
    #[arg(long, global = true, default_value = "default_user")]
    pub owner: String,

    /// Path to the TOML configuration file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Treat input as extraction JSON instead of calling a model.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the interactive workout REPL.
    Run,

    /// Process a single message and print the reply.
    Ask {
        /// The message, e.g. "squats 3x10 at 135 lbs".
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,

        /// Force the intent instead of letting the extractor decide.
        #[arg(long, value_parser = parse_intent)]
        intent: Option<Intent>,

        /// Target record for update or delete.
        #[arg(long)]
        record: Option<String>,
    },

    /// Create the data directory and migrate the database.
    Setup,

    /// Show database, config and credential state.
    Status,
}

fn parse_intent(value: &str) -> Result<Intent, String> {
    value.parse::<Intent>().map_err(|e| e.to_string())
}
