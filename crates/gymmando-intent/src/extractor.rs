//! Utterance → structured candidate.
//!
//! [`Extractor`] is the seam the engine calls. [`LlmExtractor`] asks a chat
//! model for a JSON object; [`JsonExtractor`] expects the caller to have
//! written that object already.

use std::sync::Arc;

use async_trait::async_trait;
use gymmando_agent::{ChatCompletion, ChatRequest, Message};
use serde_json::Value;
use tracing::debug;

use crate::error::{IntentError, Result};
use crate::state::{Intent, ReadFilters, WorkoutFields};

/// What an extractor pulled out of one utterance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// `None` when the extractor did not classify the request.
    pub intent: Option<Intent>,
    pub fields: WorkoutFields,
    pub record_id: Option<String>,
    pub filters: ReadFilters,
}

/// Turns raw user text into an [`Extraction`].
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn process(&self, raw_input: &str) -> Result<Extraction>;
}

// ---------------------------------------------------------------------------
// LLM-backed extractor
// ---------------------------------------------------------------------------

const SYSTEM_PROMPT: &str = r#"You convert gym log messages into JSON.
Reply with ONE JSON object and nothing else:
{
  "intent": "create" | "read" | "update" | "delete",
  "exercise": string | null,
  "set_count": integer | null,
  "rep_count": integer | null,
  "weight": string | null,       // keep the unit, e.g. "135 lbs", "bodyweight"
  "rest_seconds": integer | null,
  "notes": string | null,
  "record_id": string | null,    // only if the user quotes an id
  "filters": { "exercise": string | null, "since": "YYYY-MM-DD" | null, "until": "YYYY-MM-DD" | null, "limit": integer | null }
}
Use null for anything the user did not say. Never invent values."#;

/// Extractor that delegates to a chat model.
pub struct LlmExtractor {
    llm: Arc<dyn ChatCompletion>,
    model: Option<String>,
}

impl LlmExtractor {
    pub fn new(llm: Arc<dyn ChatCompletion>) -> Self {
        Self { llm, model: None }
    }

    /// Override the client's default model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    fn build_request(&self, raw_input: &str) -> ChatRequest {
        let today = chrono::Utc::now().date_naive();
        let mut request = ChatRequest::new(vec![
            Message::system(format!("{SYSTEM_PROMPT}\nToday is {today}.")),
            Message::user(raw_input),
        ])
        .with_temperature(0.0)
        .with_json_mode();
        if let Some(model) = &self.model {
            request.model = model.clone();
        }
        request
    }
}

#[async_trait]
impl Extractor for LlmExtractor {
    async fn process(&self, raw_input: &str) -> Result<Extraction> {
        let request = self.build_request(raw_input);
        let response = self.llm.complete(&request).await?;
        debug!(
            chars = response.text.len(),
            stop_reason = ?response.stop_reason,
            "extractor response received"
        );
        decode_extraction(&response.text)
    }
}

// ---------------------------------------------------------------------------
// JSON extractor
// ---------------------------------------------------------------------------

/// Extractor for callers that already speak the JSON shape.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonExtractor;

#[async_trait]
impl Extractor for JsonExtractor {
    async fn process(&self, raw_input: &str) -> Result<Extraction> {
        decode_extraction(raw_input)
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode an extraction object.
///
/// Markdown code fences are stripped. Fields and filters may be nested
/// (`"fields": {..}`, `"filters": {..}`) or flat at the top level, under
/// canonical or alias names; when both spellings appear the canonical key
/// wins. Unknown intents decode as [`Intent::Unknown`].
pub fn decode_extraction(text: &str) -> Result<Extraction> {
    let cleaned = strip_code_fence(text);

    let value: Value = serde_json::from_str(cleaned).map_err(|e| IntentError::ExtractionFailed {
        reason: format!("response is not JSON: {e}"),
    })?;
    if !value.is_object() {
        return Err(IntentError::ExtractionFailed {
            reason: "response is not a JSON object".into(),
        });
    }

    let intent = value["intent"].as_str().map(Intent::parse_lenient);

    let fields_src = without_shadowed_aliases(nested_or_root(&value, "fields"));
    let fields: WorkoutFields = serde_json::from_value(fields_src)?;

    let filters_src = without_shadowed_aliases(nested_or_root(&value, "filters"));
    let filters: ReadFilters = serde_json::from_value(filters_src)?;

    let record_id = ["record_id", "workout_id", "id"]
        .iter()
        .find_map(|key| match &value[*key] {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        });

    Ok(Extraction {
        intent,
        fields,
        record_id,
        filters,
    })
}

fn nested_or_root<'a>(value: &'a Value, key: &str) -> &'a Value {
    match &value[key] {
        nested @ Value::Object(_) => nested,
        _ => value,
    }
}

/// `(alias, canonical)` spellings accepted for fields and filters.
const ALIASES: &[(&str, &str)] = &[
    ("sets", "set_count"),
    ("reps", "rep_count"),
    ("rest_time", "rest_seconds"),
    ("comments", "notes"),
    ("start_date", "since"),
    ("end_date", "until"),
];

/// Copy of `section` with alias keys dropped wherever the canonical key is
/// also present, so serde never sees both.
fn without_shadowed_aliases(section: &Value) -> Value {
    let mut section = section.clone();
    if let Value::Object(map) = &mut section {
        for (alias, canonical) in ALIASES {
            if map.contains_key(*canonical) {
                map.remove(*alias);
            }
        }
    }
    section
}

/// Trim and drop a surrounding Markdown fence with any language tag
/// (` ```json `, ` ```JSON `, bare ` ``` `).
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(body) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = body.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
    body.strip_suffix("```").unwrap_or(body).trim()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
