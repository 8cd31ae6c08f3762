//! Subcommand: `gymmando run`, the interactive REPL.
//!
//! One line in, one reply out. A successful read remembers the first
//! listed workout so the next turn can say "delete that" without an id.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use gymmando_intent::{Outcome, Request, RequestState, WorkoutEngine};
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::helpers::{build_engine, init_tracing};

/// What a REPL line asks for.
#[derive(Debug, PartialEq, Eq)]
pub enum Input<'a> {
    Blank,
    Quit,
    Message(&'a str),
}

impl<'a> Input<'a> {
    pub fn classify(line: &'a str) -> Self {
        match line.trim() {
            "" => Self::Blank,
            "quit" | "exit" | "q" => Self::Quit,
            text => Self::Message(text),
        }
    }
}

/// Per-owner conversation state across REPL turns.
pub struct Session<'e> {
    engine: &'e WorkoutEngine,
    owner_id: String,
    last_record: Option<String>,
}

impl<'e> Session<'e> {
    pub fn new(engine: &'e WorkoutEngine, owner_id: impl Into<String>) -> Self {
        Self {
            engine,
            owner_id: owner_id.into(),
            last_record: None,
        }
    }

    /// Record remembered from the previous read, if any.
    pub fn last_record(&self) -> Option<&str> {
        self.last_record.as_deref()
    }

    /// Run one message through the engine.
    pub async fn turn(&mut self, text: &str) -> RequestState {
        let request =
            Request::new(text, self.owner_id.as_str()).with_record_id(self.last_record.take());
        let state = self.engine.run_request(request).await;

        // An empty read echoes the id passed in, which is stale by now.
        if matches!(state.outcome(), Some(Outcome::Listed { count }) if *count > 0) {
            self.last_record = state.record_id().map(str::to_owned);
            debug!(record_id = ?self.last_record, "carrying read hint");
        }
        state
    }

    /// Drive the session from `input` until EOF or a quit command.
    pub async fn drive(&mut self, input: impl BufRead, mut output: impl Write) -> Result<()> {
        for line in input.lines() {
            let line = line.context("failed to read input")?;
            match Input::classify(&line) {
                Input::Blank => continue,
                Input::Quit => {
                    info!("user requested exit");
                    break;
                }
                Input::Message(text) => {
                    let state = self.turn(text).await;
                    writeln!(output, "{}", state.response()).context("failed to write reply")?;
                    output.flush().context("failed to write reply")?;
                }
            }
        }
        Ok(())
    }
}

/// Run the interactive REPL.
pub async fn cmd_run(config: &AppConfig, owner: &str, json: bool) -> Result<()> {
    init_tracing(&config.logging);
    info!(owner_id = %owner, json, "starting Gymmando");

    let engine = build_engine(config, json).await?;

    println!();
    println!("  Gymmando v{}", env!("CARGO_PKG_VERSION"));
    if json {
        println!("  Enter extraction JSON, or 'quit' to exit.");
    } else {
        println!("  Describe a workout, ask about your history, or 'quit' to exit.");
    }
    println!();

    let mut session = Session::new(&engine, owner);
    session.drive(io::stdin().lock(), io::stdout()).await?;

    info!("shutting down");
    Ok(())
}
