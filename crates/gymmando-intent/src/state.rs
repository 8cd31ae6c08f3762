//! Request state flowing through the workflow.
//!
//! A [`RequestState`] is created per request and moved from node to node.
//! Every transition consumes the previous snapshot and returns a new one;
//! nothing mutates a state in place.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use gymmando_store::{NewWorkout, WorkoutPatch};
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::IntentError;
use crate::extractor::Extraction;

// ---------------------------------------------------------------------------
// Intent
// ---------------------------------------------------------------------------

/// What the user wants done with their workout log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Create,
    Read,
    Update,
    Delete,
    Unknown,
}

impl Intent {
    pub const ALL: [Intent; 5] = [
        Intent::Create,
        Intent::Read,
        Intent::Update,
        Intent::Delete,
        Intent::Unknown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Unknown => "unknown",
        }
    }

    /// Like [`FromStr`] but maps anything unrecognised to [`Intent::Unknown`].
    pub fn parse_lenient(value: &str) -> Self {
        value.parse().unwrap_or(Self::Unknown)
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Intent {
    type Err = IntentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "create" | "put" | "log" | "add" | "save" => Ok(Self::Create),
            "read" | "get" | "list" | "query" | "show" => Ok(Self::Read),
            "update" | "edit" | "change" | "modify" => Ok(Self::Update),
            "delete" | "remove" => Ok(Self::Delete),
            "unknown" => Ok(Self::Unknown),
            other => Err(IntentError::InvalidIntent {
                value: other.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Fields
// ---------------------------------------------------------------------------

/// Names of the workout fields, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldName {
    Exercise,
    SetCount,
    RepCount,
    Weight,
    RestSeconds,
    Notes,
}

impl FieldName {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exercise => "exercise",
            Self::SetCount => "set_count",
            Self::RepCount => "rep_count",
            Self::Weight => "weight",
            Self::RestSeconds => "rest_seconds",
            Self::Notes => "notes",
        }
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Candidate workout fields. Each one is independently optional until
/// validated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkoutFields {
    #[serde(default, deserialize_with = "lenient_text")]
    pub exercise: Option<String>,
    #[serde(default, alias = "sets", deserialize_with = "lenient_count")]
    pub set_count: Option<u32>,
    #[serde(default, alias = "reps", deserialize_with = "lenient_count")]
    pub rep_count: Option<u32>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub weight: Option<String>,
    #[serde(default, alias = "rest_time", deserialize_with = "lenient_count")]
    pub rest_seconds: Option<u32>,
    #[serde(default, alias = "comments", deserialize_with = "lenient_text")]
    pub notes: Option<String>,
}

impl WorkoutFields {
    /// Present and, for text fields, not blank.
    pub fn is_present(&self, field: FieldName) -> bool {
        match field {
            FieldName::Exercise => non_blank(&self.exercise).is_some(),
            FieldName::SetCount => self.set_count.is_some(),
            FieldName::RepCount => self.rep_count.is_some(),
            FieldName::Weight => non_blank(&self.weight).is_some(),
            FieldName::RestSeconds => self.rest_seconds.is_some(),
            FieldName::Notes => non_blank(&self.notes).is_some(),
        }
    }

    /// Any of `set_count`, `rep_count`, `weight` present.
    pub fn has_mutable_field(&self) -> bool {
        [FieldName::SetCount, FieldName::RepCount, FieldName::Weight]
            .into_iter()
            .any(|f| self.is_present(f))
    }

    /// Partial update holding only the present fields.
    pub fn to_patch(&self) -> WorkoutPatch {
        WorkoutPatch {
            exercise: non_blank(&self.exercise),
            set_count: self.set_count,
            rep_count: self.rep_count,
            weight: non_blank(&self.weight),
            rest_seconds: self.rest_seconds,
            notes: non_blank(&self.notes),
        }
    }

    /// A complete insert, or `None` if any required field is missing.
    pub fn to_new_workout(&self) -> Option<NewWorkout> {
        Some(NewWorkout {
            exercise: non_blank(&self.exercise)?,
            set_count: self.set_count?,
            rep_count: self.rep_count?,
            weight: non_blank(&self.weight)?,
            rest_seconds: self.rest_seconds,
            notes: non_blank(&self.notes),
        })
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

/// Read-path filters supplied by the extractor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadFilters {
    #[serde(default, deserialize_with = "lenient_text")]
    pub exercise: Option<String>,
    #[serde(default, alias = "start_date", deserialize_with = "lenient_date")]
    pub since: Option<NaiveDate>,
    #[serde(default, alias = "end_date", deserialize_with = "lenient_date")]
    pub until: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub limit: Option<u32>,
}

// ---------------------------------------------------------------------------
// Progress markers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Validation {
    #[default]
    Unchecked,
    Complete,
    Incomplete,
}

/// Where a request is in the workflow. Only moves forward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Start,
    Extracted,
    Validated,
    Terminal,
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Why a request ended without doing what was asked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Failure {
    /// The extractor errored.
    ExtractionFailure,
    /// Create path with required fields missing.
    ValidationRejection { missing: Vec<FieldName> },
    /// Update or delete without a resolvable record.
    IdentifierMissing { intent: Intent },
    /// Update with no field to change.
    NothingToUpdate,
    /// Update matched no record owned by the caller.
    NotFoundOrForbidden,
    /// The store errored or declined to return a record.
    PersistenceFailure { op: StoreOp },
    /// Complete fields but no actionable intent.
    UnclassifiedIntent,
    /// Request arrived without an owner.
    MissingOwner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreOp {
    Create,
    Query,
    Update,
    Delete,
}

/// How the terminal node ended the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Saved { record_id: String },
    Listed { count: usize },
    Updated { record_id: String, changed: Vec<FieldName> },
    /// `matched` is informational only; the user is told it succeeded.
    Deleted { record_id: String, matched: bool },
    Failed { failure: Failure },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Self::Failed { failure } => Some(failure),
            _ => None,
        }
    }
}

impl From<Failure> for Outcome {
    fn from(failure: Failure) -> Self {
        Self::Failed { failure }
    }
}

// ---------------------------------------------------------------------------
// RequestState
// ---------------------------------------------------------------------------

/// The snapshot handed between workflow nodes.
///
/// `response` is non-empty exactly when `stage` is [`Stage::Terminal`].
#[derive(Debug, Clone, Serialize)]
pub struct RequestState {
    raw_input: String,
    owner_id: String,
    requested_intent: Option<Intent>,
    intent: Option<Intent>,
    fields: WorkoutFields,
    record_id: Option<String>,
    filters: ReadFilters,
    validation: Validation,
    missing_fields: Vec<FieldName>,
    response: String,
    stage: Stage,
    outcome: Option<Outcome>,
}

impl RequestState {
    pub fn new(raw_input: impl Into<String>, owner_id: impl Into<String>) -> Self {
        Self {
            raw_input: raw_input.into(),
            owner_id: owner_id.into(),
            requested_intent: None,
            intent: None,
            fields: WorkoutFields::default(),
            record_id: None,
            filters: ReadFilters::default(),
            validation: Validation::Unchecked,
            missing_fields: Vec::new(),
            response: String::new(),
            stage: Stage::Start,
            outcome: None,
        }
    }

    // -- accessors -----------------------------------------------------------

    pub fn raw_input(&self) -> &str {
        &self.raw_input
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// Intent fixed at extraction; [`Intent::Unknown`] before that.
    pub fn intent(&self) -> Intent {
        self.intent.unwrap_or(Intent::Unknown)
    }

    pub fn requested_intent(&self) -> Option<Intent> {
        self.requested_intent
    }

    pub fn fields(&self) -> &WorkoutFields {
        &self.fields
    }

    pub fn record_id(&self) -> Option<&str> {
        self.record_id.as_deref()
    }

    pub fn filters(&self) -> &ReadFilters {
        &self.filters
    }

    pub fn validation(&self) -> Validation {
        self.validation
    }

    pub fn missing_fields(&self) -> &[FieldName] {
        &self.missing_fields
    }

    pub fn response(&self) -> &str {
        &self.response
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    pub fn is_terminal(&self) -> bool {
        self.stage == Stage::Terminal
    }

    // -- pre-extraction inputs ----------------------------------------------

    /// Intent chosen by the caller; wins over the extractor's guess.
    pub fn with_requested_intent(mut self, intent: Option<Intent>) -> Self {
        self.requested_intent = intent;
        self
    }

    /// Identifier supplied by the caller; the extractor's identifier wins.
    pub fn with_caller_record_id(mut self, record_id: Option<String>) -> Self {
        self.record_id = record_id.filter(|id| !id.trim().is_empty());
        self
    }

    // -- transitions ---------------------------------------------------------

    /// `start → extracted`. Fixes the intent for the rest of the run.
    pub fn extracted(mut self, extraction: Extraction) -> Self {
        if self.stage != Stage::Start {
            return self;
        }
        let intent = self
            .requested_intent
            .or(extraction.intent)
            .unwrap_or(Intent::Unknown);
        self.intent = Some(intent);
        self.fields = extraction.fields;
        self.filters = extraction.filters;
        if let Some(id) = extraction.record_id.filter(|id| !id.trim().is_empty()) {
            self.record_id = Some(id);
        }
        self.stage = Stage::Extracted;
        self
    }

    /// Extraction failed; the intent is still fixed so logging stays accurate.
    pub fn extraction_failed(mut self) -> Self {
        if self.stage == Stage::Start {
            self.intent = Some(self.requested_intent.unwrap_or(Intent::Unknown));
            self.stage = Stage::Extracted;
        }
        self
    }

    /// Set the target record (fallback resolution or read hint).
    pub fn with_record_id(mut self, record_id: impl Into<String>) -> Self {
        if !self.is_terminal() {
            self.record_id = Some(record_id.into());
        }
        self
    }

    /// `create-pending → validated`.
    pub fn validated(mut self, validation: Validation, missing: Vec<FieldName>) -> Self {
        if self.stage == Stage::Extracted {
            self.validation = validation;
            self.missing_fields = missing;
            self.stage = Stage::Validated;
        }
        self
    }

    /// Enter the terminal state. A state that is already terminal keeps its
    /// first response.
    pub fn finish(mut self, response: impl Into<String>, outcome: Outcome) -> Self {
        if self.is_terminal() {
            return self;
        }
        let response = response.into();
        debug_assert!(!response.is_empty(), "terminal response must not be empty");
        self.response = response;
        self.outcome = Some(outcome);
        self.stage = Stage::Terminal;
        self
    }
}

// ---------------------------------------------------------------------------
// Lenient decoding
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(untagged)]
enum Loose {
    Int(i64),
    Float(f64),
    Text(String),
    /// Booleans, arrays and objects; decoded as absent.
    Other(IgnoredAny),
}

/// Accept `3`, `3.0` or `"3"`; anything else (including negatives) is absent.
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Loose>::deserialize(deserializer)? {
        Some(Loose::Int(n)) => u32::try_from(n).ok(),
        Some(Loose::Float(f)) if f >= 0.0 && f.fract() == 0.0 && f <= f64::from(u32::MAX) => {
            Some(f as u32)
        }
        Some(Loose::Text(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Accept strings and bare numbers (`135` becomes `"135"`).
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Loose>::deserialize(deserializer)? {
        Some(Loose::Text(s)) => Some(s),
        Some(Loose::Int(n)) => Some(n.to_string()),
        Some(Loose::Float(f)) => Some(f.to_string()),
        _ => None,
    })
}

/// Accept `YYYY-MM-DD` or a full RFC 3339 timestamp; anything else is absent.
fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Loose>::deserialize(deserializer)? {
        Some(Loose::Text(s)) => {
            let s = s.trim();
            NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().or_else(|| {
                chrono::DateTime::parse_from_rfc3339(s)
                    .ok()
                    .map(|dt| dt.date_naive())
            })
        }
        _ => None,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
