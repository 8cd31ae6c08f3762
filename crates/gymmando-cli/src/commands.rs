//! Subcommands: `ask`, `setup`, `status`.

use std::path::Path;

use anyhow::{Context, Result};
use gymmando_intent::{Intent, Request};
use gymmando_store::{Database, SqliteWorkoutStore};
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::helpers::{build_engine, env_non_empty, init_tracing, open_database};

// ---------------------------------------------------------------------------
// Subcommand: ask
// ---------------------------------------------------------------------------

/// Process one message and print the reply.
pub async fn cmd_ask(
    config: &AppConfig,
    owner: &str,
    json: bool,
    text: &str,
    intent: Option<Intent>,
    record: Option<String>,
) -> Result<()> {
    init_tracing(&config.logging);

    let engine = build_engine(config, json).await?;
    let request = Request::new(text, owner)
        .with_intent(intent)
        .with_record_id(record);
    let state = engine.run_request(request).await;

    if let Some(failure) = state.outcome().and_then(|o| o.failure()) {
        warn!(?failure, "request did not succeed");
    }
    println!("{}", state.response());
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand: setup
// ---------------------------------------------------------------------------

pub async fn cmd_setup(config: &AppConfig, config_path: &Path) -> Result<()> {
    init_tracing(&config.logging);

    println!();
    println!("  Gymmando Setup");
    println!("  ==============");
    println!();

    match config.data_dir() {
        Some(dir) if dir.exists() => println!("  [=] Data directory already exists"),
        Some(dir) => println!("  [+] Creating data directory {}", dir.display()),
        None => {}
    }

    let db = open_database(config)
        .await
        .context("failed to initialize database")?;
    let version = db.schema_version().await.context("failed to read schema version")?;
    println!(
        "  [+] Database initialized at {} (schema v{version})",
        config.store.path.display()
    );

    if config_path.exists() {
        println!("  [=] Using config {}", config_path.display());
    } else {
        println!("  [!] No config at {}; using defaults", config_path.display());
    }

    let credentials = Credentials::from_env();
    if credentials.any() {
        println!("  [+] LLM credentials: {}", credentials.describe());
    } else {
        println!("  [!] No LLM credentials found");
        println!("      Set one in your environment or .env to enable the extractor:");
        println!("      export OPENAI_API_KEY=sk-...");
        println!("      (or use --json to send extraction JSON directly)");
    }

    println!();
    println!("  Setup complete! Run `gymmando run` to start.");
    println!();

    info!("setup finished");
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand: status
// ---------------------------------------------------------------------------

pub async fn cmd_status(config: &AppConfig, config_path: &Path, owner: &str) -> Result<()> {
    init_tracing(&crate::config::LoggingSection {
        level: "warn".into(),
        ..config.logging.clone()
    });

    println!();
    println!("  Gymmando Status");
    println!("  ===============");
    println!();

    match config.data_dir() {
        Some(dir) if dir.exists() => println!("  Data directory:   OK ({})", dir.display()),
        Some(_) => println!("  Data directory:   MISSING (run `gymmando setup`)"),
        None => println!("  Data directory:   working directory"),
    }

    println!(
        "  Database:         {}",
        database_status(&config.store.path, owner).await
    );

    if config_path.exists() {
        println!("  Config:           OK ({})", config_path.display());
    } else {
        println!("  Config:           MISSING (using defaults)");
    }

    let credentials = Credentials::from_env();
    if credentials.any() {
        println!("  LLM credentials:  {}", credentials.describe());
    } else {
        println!("  LLM credentials:  NOT SET (only --json mode available)");
    }
    if let Some(provider) = &config.llm.provider {
        println!("  LLM provider:     {provider}");
    }

    println!();
    Ok(())
}

/// One-line database state, with `owner`'s workout count once migrated.
/// Opens the file read-only and never writes to it.
pub async fn database_status(path: &Path, owner: &str) -> String {
    if !path.exists() {
        return "NOT INITIALIZED (run `gymmando setup`)".into();
    }
    let db = match Database::open_read_only(path) {
        Ok(db) => db,
        Err(e) => return format!("UNREADABLE ({e})"),
    };
    match db.schema_version().await {
        Ok(v) if v >= gymmando_store::migration::latest_version() => {
            match SqliteWorkoutStore::new(db).count(owner).await {
                Ok(n) => format!("OK ({}, schema v{v}, {n} workouts for {owner})", path.display()),
                Err(e) => format!("UNREADABLE ({e})"),
            }
        }
        Ok(v) => format!("OUTDATED (schema v{v}, run `gymmando setup`)"),
        Err(e) => format!("UNREADABLE ({e})"),
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

struct Credentials {
    openai: bool,
    anthropic: bool,
}

impl Credentials {
    fn from_env() -> Self {
        Self {
            openai: env_non_empty("OPENAI_API_KEY").is_some(),
            anthropic: env_non_empty("ANTHROPIC_API_KEY").is_some(),
        }
    }

    fn any(&self) -> bool {
        self.openai || self.anthropic
    }

    fn describe(&self) -> String {
        let mut set = Vec::new();
        if self.openai {
            set.push("OPENAI_API_KEY");
        }
        if self.anthropic {
            set.push("ANTHROPIC_API_KEY");
        }
        set.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn status_of_missing_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gym.db");

        let status = database_status(&path, "alice").await;
        assert!(status.starts_with("NOT INITIALIZED"));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn status_of_migrated_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gym.db");
        Database::open_and_migrate(path.clone()).await.unwrap();

        let status = database_status(&path, "alice").await;
        assert!(status.starts_with("OK"), "{status}");
        assert!(status.ends_with("0 workouts for alice)"), "{status}");
    }

    #[tokio::test]
    async fn status_of_empty_database_is_outdated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gym.db");
        Database::open(&path).unwrap();

        let status = database_status(&path, "alice").await;
        assert!(status.starts_with("OUTDATED"), "{status}");

        let db = Database::open(&path).unwrap();
        let tracked: i64 = db
            .execute(|conn| {
                Ok(conn.query_row(
                    "SELECT count(*) FROM sqlite_master WHERE name = '_migrations'",
                    [],
                    |row| row.get(0),
                )?)
            })
            .await
            .unwrap();
        assert_eq!(tracked, 0, "status must not create the migrations table");
        assert_eq!(db.schema_version().await.unwrap(), 0);
    }

    #[test]
    fn credentials_description() {
        let both = Credentials {
            openai: true,
            anthropic: true,
        };
        assert_eq!(both.describe(), "OPENAI_API_KEY, ANTHROPIC_API_KEY");
        assert!(!Credentials {
            openai: false,
            anthropic: false
        }
        .any());
    }
}
