//! Shared helper functions used across CLI subcommands.
//!
//! Includes tracing initialization, LLM provider resolution, engine
//! construction, and environment variable utilities.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use gymmando_agent::{LlmClient, LlmClientConfig};
use gymmando_intent::{Extractor, JsonExtractor, LlmExtractor, WorkoutEngine};
use gymmando_store::{Database, SqliteWorkoutStore};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{AppConfig, LlmSection, LoggingSection};

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

/// Initialize the tracing subscriber. `RUST_LOG` wins over the configured level.
pub fn init_tracing(logging: &LoggingSection) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    if logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }
}

// ---------------------------------------------------------------------------
// LLM provider resolution
// ---------------------------------------------------------------------------

const DEFAULT_MODEL_ANTHROPIC: &str = "claude-sonnet-4-20250514";
const DEFAULT_MODEL_OPENAI: &str = "gpt-4o-mini";

/// Resolve which LLM provider, API key, and model to use.
///
/// An explicit `[llm] provider` (or `GYMMANDO_PROVIDER`) is honoured as-is
/// and its credential is required. Otherwise the first of
/// `OPENAI_API_KEY`, `ANTHROPIC_API_KEY` that is set decides.
pub fn resolve_llm_config(
    llm: &LlmSection,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<LlmClientConfig> {
    let openai = |key: String| {
        let model = llm.model.clone().unwrap_or_else(|| DEFAULT_MODEL_OPENAI.to_owned());
        let mut cfg = LlmClientConfig::openai(key, model);
        if let Some(url) = &llm.base_url {
            cfg.base_url = url.clone();
        }
        cfg
    };
    let anthropic = |key: String| {
        let model = llm
            .model
            .clone()
            .unwrap_or_else(|| DEFAULT_MODEL_ANTHROPIC.to_owned());
        let mut cfg = LlmClientConfig::anthropic(key, model);
        if let Some(url) = &llm.base_url {
            cfg.base_url = url.clone();
        }
        cfg
    };

    let mut config = match llm.provider.as_deref().map(str::to_ascii_lowercase) {
        Some(p) if p == "openai" => openai(require_key(&lookup, "openai", "OPENAI_API_KEY")?),
        Some(p) if p == "anthropic" => {
            anthropic(require_key(&lookup, "anthropic", "ANTHROPIC_API_KEY")?)
        }
        Some(p) if p == "openai_compatible" => {
            let Some(base) = llm.base_url.clone() else {
                bail!("provider 'openai_compatible' needs [llm] base_url or GYMMANDO_API_BASE_URL");
            };
            let Some(model) = llm.model.clone() else {
                bail!("provider 'openai_compatible' needs [llm] model or GYMMANDO_MODEL");
            };
            let key = lookup("OPENAI_API_KEY").unwrap_or_else(|| "no-key".to_owned());
            LlmClientConfig::openai_compatible(key, model, base)
        }
        Some(other) => bail!("unknown LLM provider '{other}'"),
        None => {
            if let Some(key) = lookup("OPENAI_API_KEY") {
                openai(key)
            } else if let Some(key) = lookup("ANTHROPIC_API_KEY") {
                anthropic(key)
            } else {
                bail!(
                    "no LLM credentials found; set OPENAI_API_KEY or ANTHROPIC_API_KEY, \
                     or pass --json to supply extraction JSON directly"
                );
            }
        }
    };

    if let Some(max_tokens) = llm.max_tokens {
        config = config.with_max_tokens(max_tokens);
    }
    Ok(config)
}

fn require_key(
    lookup: &impl Fn(&str) -> Option<String>,
    provider: &str,
    env_var: &str,
) -> Result<String> {
    lookup(env_var).with_context(|| {
        format!("{provider} provider selected but no API key found; export {env_var}=...")
    })
}

/// Read a non-empty environment variable, returning `None` if unset or empty.
pub fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

/// Create the data directory if needed and open the migrated database.
pub async fn open_database(config: &AppConfig) -> Result<Database> {
    if let Some(dir) = config.data_dir() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create data directory {}", dir.display()))?;
    }
    let path = config.store.path.clone();
    let db = Database::open_and_migrate(path.clone())
        .await
        .with_context(|| format!("failed to open database {}", path.display()))?;
    info!(path = %path.display(), "store initialized");
    Ok(db)
}

/// Build the extractor for this invocation.
pub fn build_extractor(config: &AppConfig, json: bool) -> Result<Arc<dyn Extractor>> {
    if json {
        info!("using JSON extractor");
        return Ok(Arc::new(JsonExtractor));
    }

    let llm_config = resolve_llm_config(&config.llm, env_non_empty)?;
    let client = LlmClient::new(llm_config).context("failed to create LLM client")?;
    info!(
        provider = client.provider().as_str(),
        model = client.default_model(),
        "LLM client ready"
    );
    Ok(Arc::new(LlmExtractor::new(Arc::new(client))))
}

/// Database, extractor and engine, ready to serve requests.
pub async fn build_engine(config: &AppConfig, json: bool) -> Result<WorkoutEngine> {
    let extractor = build_extractor(config, json)?;
    let db = open_database(config).await?;
    let store = Arc::new(SqliteWorkoutStore::new(db));
    WorkoutEngine::new(extractor, store)
        .with_config(config.engine.clone())
        .context("invalid engine configuration")
}
