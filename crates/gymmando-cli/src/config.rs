//! Application configuration.
//!
//! Reads `config/default.toml` (or the `--config` path) into [`AppConfig`].
//! Every section and key is optional; a missing file yields the defaults.
//! Environment variables are applied on top by [`AppConfig::apply_env`].

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use gymmando_intent::EngineConfig;
use serde::Deserialize;

const DEFAULT_DB_PATH: &str = "data/gymmando.db";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub store: StoreSection,
    pub llm: LlmSection,
    pub engine: EngineConfig,
    pub logging: LoggingSection,
}

/// `[store]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    pub path: PathBuf,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DB_PATH),
        }
    }
}

/// `[llm]`. Unset values are resolved from the environment.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// `anthropic`, `openai` or `openai_compatible`.
    pub provider: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub max_tokens: Option<u32>,
}

/// `[logging]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    pub json: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load from `path`. A missing file is not an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.engine.validate()?;
        Ok(config)
    }

    /// Apply `GYMMANDO_*` overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(crate::helpers::env_non_empty);
    }

    /// Apply overrides from an arbitrary lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("GYMMANDO_DB_PATH") {
            self.store.path = PathBuf::from(path);
        }
        if let Some(provider) = lookup("GYMMANDO_PROVIDER") {
            self.llm.provider = Some(provider);
        }
        if let Some(model) = lookup("GYMMANDO_MODEL") {
            self.llm.model = Some(model);
        }
        if let Some(url) = lookup("GYMMANDO_API_BASE_URL") {
            self.llm.base_url = Some(url);
        }
    }

    /// Directory holding the database file, if any.
    pub fn data_dir(&self) -> Option<&Path> {
        self.store
            .path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
    }
}
