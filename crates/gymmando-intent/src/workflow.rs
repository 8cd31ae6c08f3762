//! Workflow engine.
//!
//! One request runs strictly forward:
//!
//! ```text
//! start ─extract─▶ extracted ─fallback?─▶ dispatch ─┬─ read ────────────────┐
//!                                                   ├─ update ──────────────┤
//!                                                   ├─ delete ──────────────┼─▶ terminal
//!                                                   └─ create-pending        │
//!                                                        └─validate─▶ gate ──┘
//! ```
//!
//! Every failure is turned into a terminal response at the node where it
//! happens; [`WorkoutEngine::run`] never returns an error.

use std::sync::Arc;

use gymmando_store::{StoreError, WorkoutQuery, WorkoutStore};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use crate::dispatch::{Branch, SaveRoute, dispatch, save_gate, should_attempt_fallback};
use crate::error::{IntentError, Result};
use crate::extractor::Extractor;
use crate::response;
use crate::state::{Failure, Intent, Outcome, RequestState, StoreOp};
use crate::validator;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Engine tunables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Rows returned by a read when the extractor gives no limit.
    pub read_limit: u32,
    /// Remember the first read result's id on the final state.
    pub read_record_hint: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            read_limit: gymmando_store::DEFAULT_QUERY_LIMIT,
            read_record_hint: true,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.read_limit == 0 {
            return Err(IntentError::InvalidConfig {
                reason: "engine.read_limit must be at least 1".into(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// Input for one workflow run.
#[derive(Debug, Clone)]
pub struct Request {
    pub raw_input: String,
    pub owner_id: String,
    /// Overrides the extractor's intent when set.
    pub intent: Option<Intent>,
    /// Used when the extractor finds no identifier.
    pub record_id: Option<String>,
}

impl Request {
    pub fn new(raw_input: impl Into<String>, owner_id: impl Into<String>) -> Self {
        Self {
            raw_input: raw_input.into(),
            owner_id: owner_id.into(),
            intent: None,
            record_id: None,
        }
    }

    pub fn with_intent(mut self, intent: Option<Intent>) -> Self {
        self.intent = intent;
        self
    }

    pub fn with_record_id(mut self, record_id: Option<String>) -> Self {
        self.record_id = record_id;
        self
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Routes a request through extraction, dispatch and the store.
///
/// Holds no per-request state; one engine serves concurrent requests.
pub struct WorkoutEngine {
    extractor: Arc<dyn Extractor>,
    store: Arc<dyn WorkoutStore>,
    config: EngineConfig,
}

impl WorkoutEngine {
    pub fn new(extractor: Arc<dyn Extractor>, store: Arc<dyn WorkoutStore>) -> Self {
        Self {
            extractor,
            store,
            config: EngineConfig::default(),
        }
    }

    /// Replace the configuration; rejects invalid values.
    pub fn with_config(mut self, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one request to its terminal state.
    pub async fn run(&self, raw_input: &str, owner_id: &str, intent: Option<Intent>) -> RequestState {
        self.run_request(Request::new(raw_input, owner_id).with_intent(intent))
            .await
    }

    /// Like [`WorkoutEngine::run`] with a caller-supplied record id.
    #[instrument(skip(self, request), fields(owner_id = %request.owner_id))]
    pub async fn run_request(&self, request: Request) -> RequestState {
        let state = RequestState::new(request.raw_input, request.owner_id)
            .with_requested_intent(request.intent)
            .with_caller_record_id(request.record_id);

        if state.owner_id().trim().is_empty() {
            warn!("request has no owner");
            return fail(state, Failure::MissingOwner);
        }

        let state = self.extract(state).await;
        if state.is_terminal() {
            return state;
        }

        let state = self.resolve_identifier(state).await;
        let branch = dispatch(state.intent(), state.record_id().is_some());
        info!(
            intent = %state.intent(),
            requested = ?state.requested_intent(),
            record_id = state.record_id().unwrap_or(""),
            ?branch,
            "request dispatched"
        );

        let state = match branch {
            Branch::Read => self.read(state).await,
            Branch::Update => self.update(state).await,
            Branch::Delete => self.delete(state).await,
            Branch::CreatePending => self.create_pending(state).await,
        };

        info!(
            success = state.outcome().is_some_and(Outcome::is_success),
            "request finished"
        );
        state
    }

    // -- extraction ----------------------------------------------------------

    async fn extract(&self, state: RequestState) -> RequestState {
        match self.extractor.process(state.raw_input()).await {
            Ok(extraction) => {
                debug!(
                    extracted_intent = ?extraction.intent,
                    has_record_id = extraction.record_id.is_some(),
                    "extraction complete"
                );
                state.extracted(extraction)
            }
            Err(err) => {
                error!(%err, "extraction failed");
                fail(state.extraction_failed(), Failure::ExtractionFailure)
            }
        }
    }

    /// Fill a missing update/delete target with the owner's newest record.
    async fn resolve_identifier(&self, state: RequestState) -> RequestState {
        if !should_attempt_fallback(state.intent(), state.record_id().is_some(), state.fields()) {
            return state;
        }

        let lookup = self
            .store
            .query(state.owner_id(), &WorkoutQuery::most_recent())
            .await;

        match lookup.map(|records| records.into_iter().next()) {
            Ok(Some(record)) => {
                info!(record_id = %record.id, intent = %state.intent(), "resolved target from most recent workout");
                state.with_record_id(record.id)
            }
            Ok(None) => {
                warn!(intent = %state.intent(), "no recent workout to target");
                state
            }
            Err(err) => {
                warn!(%err, "most recent workout lookup failed");
                state
            }
        }
    }

    // -- branches ------------------------------------------------------------

    async fn read(&self, state: RequestState) -> RequestState {
        let filters = state.filters();
        let exercise = non_blank(filters.exercise.as_deref())
            .or_else(|| non_blank(state.fields().exercise.as_deref()));
        let limit = filters
            .limit
            .filter(|l| *l > 0)
            .unwrap_or(self.config.read_limit);

        let mut query = WorkoutQuery::default()
            .with_range(filters.since, filters.until)
            .with_limit(limit);
        if let Some(exercise) = exercise {
            query = query.with_exercise(exercise);
        }

        let records = match self.store.query(state.owner_id(), &query).await {
            Ok(records) => records,
            Err(err) => return store_failure(state, StoreOp::Query, &err),
        };

        let body = match response::listed(&records) {
            Ok(body) => body,
            Err(err) => {
                error!(%err, "cannot serialize workouts");
                return fail(state, Failure::PersistenceFailure { op: StoreOp::Query });
            }
        };

        let hint = records
            .first()
            .map(|r| r.id.as_str())
            .filter(|id| self.config.read_record_hint && !id.is_empty())
            .map(str::to_owned);
        let state = match hint {
            Some(id) => {
                debug!(record_id = %id, "remembering first result");
                state.with_record_id(id)
            }
            None => state,
        };

        info!(count = records.len(), "workouts listed");
        state.finish(body, Outcome::Listed { count: records.len() })
    }

    async fn update(&self, state: RequestState) -> RequestState {
        let Some(record_id) = state.record_id().map(str::to_owned) else {
            return fail(state, Failure::IdentifierMissing { intent: Intent::Update });
        };

        let patch = state.fields().to_patch();
        if patch.is_empty() {
            return fail(state, Failure::NothingToUpdate);
        }

        match self.store.update(&record_id, state.owner_id(), &patch).await {
            Ok(Some(record)) => {
                let changed = response::changed_fields(&patch);
                info!(record_id = %record.id, changed = changed.len(), "workout updated");
                let message = response::updated(&patch, &record);
                state.finish(message, Outcome::Updated { record_id: record.id, changed })
            }
            Ok(None) => {
                warn!(record_id = %record_id, "update matched no owned workout");
                fail(state, Failure::NotFoundOrForbidden)
            }
            Err(err) => store_failure(state, StoreOp::Update, &err),
        }
    }

    async fn delete(&self, state: RequestState) -> RequestState {
        let Some(record_id) = state.record_id().map(str::to_owned) else {
            return fail(state, Failure::IdentifierMissing { intent: Intent::Delete });
        };

        match self.store.delete(&record_id, state.owner_id()).await {
            Ok(matched) => {
                debug!(record_id = %record_id, matched, "delete completed");
                state.finish(response::deleted(), Outcome::Deleted { record_id, matched })
            }
            Err(err) => store_failure(state, StoreOp::Delete, &err),
        }
    }

    async fn create_pending(&self, state: RequestState) -> RequestState {
        let (validation, missing) = validator::validate(state.fields());
        let state = state.validated(validation, missing);

        match save_gate(state.intent(), state.validation()) {
            SaveRoute::Persist => self.save(state).await,
            SaveRoute::Reject => {
                let failure = rejection(state.intent(), &state);
                info!(intent = %state.intent(), missing = ?state.missing_fields(), "save rejected");
                fail(state, failure)
            }
        }
    }

    async fn save(&self, state: RequestState) -> RequestState {
        let Some(workout) = state.fields().to_new_workout() else {
            let missing = state.missing_fields().to_vec();
            return fail(state, Failure::ValidationRejection { missing });
        };

        match self.store.create(state.owner_id(), &workout).await {
            Ok(Some(record)) => {
                info!(record_id = %record.id, exercise = %record.exercise, "workout saved");
                state.finish(response::saved(&workout), Outcome::Saved { record_id: record.id })
            }
            Ok(None) => {
                warn!("store returned no record for create");
                fail(state, Failure::PersistenceFailure { op: StoreOp::Create })
            }
            Err(err) => store_failure(state, StoreOp::Create, &err),
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn fail(state: RequestState, failure: Failure) -> RequestState {
    let message = failure.message();
    state.finish(message, failure.into())
}

/// Terminal persistence failure. The store's reason is logged, never shown.
fn store_failure(state: RequestState, op: StoreOp, err: &StoreError) -> RequestState {
    if err.is_rejected_input() {
        warn!(%err, ?op, record_id = state.record_id().unwrap_or(""), "store rejected request");
    } else {
        error!(%err, ?op, record_id = state.record_id().unwrap_or(""), "store operation failed");
    }
    fail(state, Failure::PersistenceFailure { op })
}

/// Why the save gate turned a request away.
fn rejection(intent: Intent, state: &RequestState) -> Failure {
    match intent {
        Intent::Update | Intent::Delete => Failure::IdentifierMissing { intent },
        Intent::Create | Intent::Read | Intent::Unknown if !state.missing_fields().is_empty() => {
            Failure::ValidationRejection {
                missing: state.missing_fields().to_vec(),
            }
        }
        Intent::Create | Intent::Read | Intent::Unknown => Failure::UnclassifiedIntent,
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::JsonExtractor;
    use crate::state::{FieldName, Stage};
    use gymmando_store::{Database, SqliteWorkoutStore};

    async fn engine() -> WorkoutEngine {
        let db = Database::open_in_memory().unwrap();
        db.run_migrations().await.unwrap();
        WorkoutEngine::new(Arc::new(JsonExtractor), Arc::new(SqliteWorkoutStore::new(db)))
    }

    #[test]
    fn zero_read_limit_is_rejected() {
        let err = EngineConfig {
            read_limit: 0,
            read_record_hint: true,
        }
        .validate()
        .unwrap_err();
        assert!(matches!(err, IntentError::InvalidConfig { .. }));
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{ "read_limit": 5 }"#).unwrap();
        assert_eq!(config.read_limit, 5);
        assert!(config.read_record_hint);
    }

    #[tokio::test]
    async fn missing_owner_never_reaches_extractor() {
        let engine = engine().await;
        let state = engine.run("not even json", "  ", None).await;

        assert!(state.is_terminal());
        assert_eq!(state.outcome().and_then(Outcome::failure), Some(&Failure::MissingOwner));
    }

    #[tokio::test]
    async fn extraction_failure_is_terminal() {
        let engine = engine().await;
        let state = engine.run("squats three by ten", "alice", None).await;

        assert_eq!(state.stage(), Stage::Terminal);
        assert_eq!(
            state.outcome().and_then(Outcome::failure),
            Some(&Failure::ExtractionFailure)
        );
        assert!(!state.response().is_empty());
    }

    #[tokio::test]
    async fn create_then_update_most_recent() {
        let engine = engine().await;
        let saved = engine
            .run(
                r#"{"exercise":"squats","set_count":3,"rep_count":10,"weight":"135 lbs"}"#,
                "alice",
                Some(Intent::Create),
            )
            .await;
        assert!(matches!(saved.outcome(), Some(Outcome::Saved { .. })));

        let updated = engine
            .run(r#"{"intent":"update","set_count":4}"#, "alice", None)
            .await;
        assert!(
            updated.response().starts_with("Sets changed to 4. The record now is: squats, 4x10 @ 135 lbs"),
            "{}",
            updated.response()
        );
        assert!(matches!(
            updated.outcome(),
            Some(Outcome::Updated { changed, .. }) if changed == &vec![FieldName::SetCount]
        ));
    }

    #[tokio::test]
    async fn unknown_intent_with_complete_fields_is_unclassified() {
        let engine = engine().await;
        let state = engine
            .run(
                r#"{"exercise":"row","set_count":3,"rep_count":12,"weight":"60 kg"}"#,
                "alice",
                None,
            )
            .await;
        assert_eq!(
            state.outcome().and_then(Outcome::failure),
            Some(&Failure::UnclassifiedIntent)
        );
    }

    #[tokio::test]
    async fn read_hint_can_be_disabled() {
        let engine = engine()
            .await
            .with_config(EngineConfig {
                read_limit: 10,
                read_record_hint: false,
            })
            .unwrap();
        engine
            .run(
                r#"{"intent":"create","exercise":"dips","set_count":3,"rep_count":8,"weight":"bodyweight"}"#,
                "alice",
                None,
            )
            .await;

        let state = engine.run(r#"{"intent":"read"}"#, "alice", None).await;
        assert_eq!(state.outcome(), Some(&Outcome::Listed { count: 1 }));
        assert_eq!(state.record_id(), None);
    }
}
