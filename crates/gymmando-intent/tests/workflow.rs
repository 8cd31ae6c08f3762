//! End-to-end tests for the workout engine.
//!
//! Most tests use scripted collaborators that record every call so routing
//! can be asserted exactly. The last section runs against the SQLite store.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use gymmando_intent::{
    Extraction, Extractor, Failure, FieldName, Intent, IntentError, JsonExtractor, Outcome,
    Request, Stage, StoreOp, Validation, WorkoutEngine, WorkoutFields,
};
use gymmando_store::{
    Database, NewWorkout, SqliteWorkoutStore, StoreError, StoreResult, WorkoutPatch, WorkoutQuery,
    WorkoutRecord, WorkoutStore,
};

// ═══════════════════════════════════════════════════════════════════════
//  Test doubles
// ═══════════════════════════════════════════════════════════════════════

struct ScriptedExtractor {
    result: Mutex<Option<Result<Extraction, String>>>,
}

impl ScriptedExtractor {
    fn returning(extraction: Extraction) -> Arc<Self> {
        Arc::new(Self {
            result: Mutex::new(Some(Ok(extraction))),
        })
    }

    fn failing(reason: &str) -> Arc<Self> {
        Arc::new(Self {
            result: Mutex::new(Some(Err(reason.to_string()))),
        })
    }
}

#[async_trait]
impl Extractor for ScriptedExtractor {
    async fn process(&self, _raw_input: &str) -> gymmando_intent::Result<Extraction> {
        match self.result.lock().unwrap().take() {
            Some(Ok(extraction)) => Ok(extraction),
            Some(Err(reason)) => Err(IntentError::ExtractionFailed { reason }),
            None => panic!("extractor called more than once"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Create { owner: String, workout: NewWorkout },
    Query { owner: String, query: WorkoutQuery },
    Update { id: String, owner: String, patch: WorkoutPatch },
    Delete { id: String, owner: String },
}

#[derive(Default)]
struct RecordingStore {
    calls: Mutex<Vec<Call>>,
    records: Vec<WorkoutRecord>,
    fail_with: Option<i64>,
    create_returns_none: bool,
    update_returns_none: bool,
    delete_matches: bool,
}

impl RecordingStore {
    fn with_records(records: Vec<WorkoutRecord>) -> Self {
        Self {
            records,
            delete_matches: true,
            ..Self::default()
        }
    }

    fn broken() -> Self {
        Self {
            fail_with: Some(-1),
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn check(&self) -> StoreResult<()> {
        match self.fail_with {
            Some(millis) => Err(StoreError::TimestampOutOfRange(millis)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl WorkoutStore for RecordingStore {
    async fn create(&self, owner_id: &str, workout: &NewWorkout) -> StoreResult<Option<WorkoutRecord>> {
        self.calls.lock().unwrap().push(Call::Create {
            owner: owner_id.into(),
            workout: workout.clone(),
        });
        self.check()?;
        if self.create_returns_none {
            return Ok(None);
        }
        Ok(Some(WorkoutRecord {
            id: "NEW".into(),
            owner_id: owner_id.into(),
            exercise: workout.exercise.clone(),
            set_count: workout.set_count,
            rep_count: workout.rep_count,
            weight: workout.weight.clone(),
            rest_seconds: workout.rest_seconds,
            notes: workout.notes.clone(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }))
    }

    async fn query(&self, owner_id: &str, query: &WorkoutQuery) -> StoreResult<Vec<WorkoutRecord>> {
        self.calls.lock().unwrap().push(Call::Query {
            owner: owner_id.into(),
            query: query.clone(),
        });
        self.check()?;
        Ok(self
            .records
            .iter()
            .take(query.limit as usize)
            .cloned()
            .collect())
    }

    async fn update(
        &self,
        id: &str,
        owner_id: &str,
        patch: &WorkoutPatch,
    ) -> StoreResult<Option<WorkoutRecord>> {
        self.calls.lock().unwrap().push(Call::Update {
            id: id.into(),
            owner: owner_id.into(),
            patch: patch.clone(),
        });
        self.check()?;
        if self.update_returns_none {
            return Ok(None);
        }
        let mut record = record(id);
        if let Some(sets) = patch.set_count {
            record.set_count = sets;
        }
        if let Some(weight) = &patch.weight {
            record.weight = weight.clone();
        }
        Ok(Some(record))
    }

    async fn delete(&self, id: &str, owner_id: &str) -> StoreResult<bool> {
        self.calls.lock().unwrap().push(Call::Delete {
            id: id.into(),
            owner: owner_id.into(),
        });
        self.check()?;
        Ok(self.delete_matches)
    }
}

fn record(id: &str) -> WorkoutRecord {
    WorkoutRecord {
        id: id.into(),
        owner_id: "alice".into(),
        exercise: "squats".into(),
        set_count: 3,
        rep_count: 10,
        weight: "135 lbs".into(),
        rest_seconds: None,
        notes: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn extraction(intent: Intent, fields: WorkoutFields) -> Extraction {
    Extraction {
        intent: Some(intent),
        fields,
        ..Extraction::default()
    }
}

fn squats_fields() -> WorkoutFields {
    WorkoutFields {
        exercise: Some("squats".into()),
        set_count: Some(3),
        rep_count: Some(10),
        weight: Some("135 lbs".into()),
        ..WorkoutFields::default()
    }
}

fn engine(extractor: Arc<ScriptedExtractor>, store: Arc<RecordingStore>) -> WorkoutEngine {
    WorkoutEngine::new(extractor, store)
}

fn failure(state: &gymmando_intent::RequestState) -> Option<&Failure> {
    state.outcome().and_then(Outcome::failure)
}

// ═══════════════════════════════════════════════════════════════════════
//  Create path
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn create_complete_workout_saves_once() {
    let store = Arc::new(RecordingStore::default());
    let state = engine(
        ScriptedExtractor::returning(extraction(Intent::Create, squats_fields())),
        store.clone(),
    )
    .run("squats 3x10 135 lbs", "alice", None)
    .await;

    let calls = store.calls();
    assert_eq!(calls.len(), 1);
    assert!(matches!(&calls[0], Call::Create { owner, .. } if owner == "alice"));

    assert_eq!(state.stage(), Stage::Terminal);
    assert_eq!(state.validation(), Validation::Complete);
    assert!(state.response().contains("squats"));
    assert!(state.response().contains("3x10"));
    assert!(state.response().contains("135 lbs"));
    assert_eq!(
        state.outcome(),
        Some(&Outcome::Saved {
            record_id: "NEW".into()
        })
    );
}

#[tokio::test]
async fn create_with_only_exercise_is_rejected_without_store_call() {
    let store = Arc::new(RecordingStore::default());
    let fields = WorkoutFields {
        exercise: Some("squats".into()),
        ..WorkoutFields::default()
    };
    let state = engine(
        ScriptedExtractor::returning(extraction(Intent::Create, fields)),
        store.clone(),
    )
    .run("log squats", "alice", None)
    .await;

    assert!(store.calls().is_empty());
    assert_eq!(state.validation(), Validation::Incomplete);
    assert_eq!(
        state.missing_fields(),
        &[FieldName::SetCount, FieldName::RepCount, FieldName::Weight]
    );
    assert!(state.response().contains("set_count, rep_count, weight"));
    assert!(!state.response().contains("exercise"));
}

#[tokio::test]
async fn create_store_error_gives_generic_message() {
    let store = Arc::new(RecordingStore::broken());
    let state = engine(
        ScriptedExtractor::returning(extraction(Intent::Create, squats_fields())),
        store,
    )
    .run("squats", "alice", None)
    .await;

    assert_eq!(
        failure(&state),
        Some(&Failure::PersistenceFailure { op: StoreOp::Create })
    );
    assert!(!state.response().contains("-1"));
    assert!(!state.response().contains("timestamp"));
}

#[tokio::test]
async fn create_without_returned_record_fails() {
    let store = Arc::new(RecordingStore {
        create_returns_none: true,
        ..RecordingStore::default()
    });
    let state = engine(
        ScriptedExtractor::returning(extraction(Intent::Create, squats_fields())),
        store,
    )
    .run("squats", "alice", None)
    .await;

    assert_eq!(
        failure(&state),
        Some(&Failure::PersistenceFailure { op: StoreOp::Create })
    );
}

#[tokio::test]
async fn caller_intent_overrides_extractor() {
    let store = Arc::new(RecordingStore::default());
    let state = engine(
        ScriptedExtractor::returning(extraction(Intent::Unknown, squats_fields())),
        store.clone(),
    )
    .run("squats", "alice", Some(Intent::Create))
    .await;

    assert_eq!(state.intent(), Intent::Create);
    assert!(matches!(state.outcome(), Some(Outcome::Saved { .. })));
}

// ═══════════════════════════════════════════════════════════════════════
//  Read path
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn read_with_no_results_returns_empty_collection() {
    let store = Arc::new(RecordingStore::default());
    let fields = WorkoutFields {
        exercise: Some("lunges".into()),
        ..WorkoutFields::default()
    };
    let state = engine(
        ScriptedExtractor::returning(extraction(Intent::Read, fields)),
        store.clone(),
    )
    .run("show my lunges", "alice", None)
    .await;

    assert_eq!(state.response(), "[]");
    assert_eq!(state.outcome(), Some(&Outcome::Listed { count: 0 }));
    assert_eq!(state.record_id(), None);

    let calls = store.calls();
    let Call::Query { owner, query } = &calls[0] else {
        panic!("expected a query, got {calls:?}");
    };
    assert_eq!(owner, "alice");
    assert_eq!(query.exercise.as_deref(), Some("lunges"));
    assert_eq!(query.limit, 10);
}

#[tokio::test]
async fn read_sets_record_hint_from_first_result() {
    let store = Arc::new(RecordingStore::with_records(vec![record("R1"), record("R2")]));
    let state = engine(
        ScriptedExtractor::returning(extraction(Intent::Read, WorkoutFields::default())),
        store,
    )
    .run("what did I do", "alice", None)
    .await;

    assert_eq!(state.record_id(), Some("R1"));
    let parsed: Vec<WorkoutRecord> = serde_json::from_str(state.response()).unwrap();
    assert_eq!(parsed.len(), 2);
}

#[tokio::test]
async fn read_failure_is_reported_generically() {
    let store = Arc::new(RecordingStore::broken());
    let state = engine(
        ScriptedExtractor::returning(extraction(Intent::Read, WorkoutFields::default())),
        store,
    )
    .run("history", "alice", None)
    .await;

    assert_eq!(
        state.response(),
        "Sorry, I encountered an error retrieving your workouts. Please try again."
    );
}

// ═══════════════════════════════════════════════════════════════════════
//  Update path
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn update_without_id_or_fields_skips_fallback() {
    let store = Arc::new(RecordingStore::with_records(vec![record("R1")]));
    let state = engine(
        ScriptedExtractor::returning(extraction(Intent::Update, WorkoutFields::default())),
        store.clone(),
    )
    .run("change it", "alice", None)
    .await;

    assert!(store.calls().is_empty());
    assert_eq!(
        failure(&state),
        Some(&Failure::IdentifierMissing {
            intent: Intent::Update
        })
    );
    assert!(state.response().contains("workout ID is required"));
}

#[tokio::test]
async fn update_resolves_most_recent_record() {
    let store = Arc::new(RecordingStore::with_records(vec![record("R1")]));
    let fields = WorkoutFields {
        set_count: Some(4),
        ..WorkoutFields::default()
    };
    let state = engine(
        ScriptedExtractor::returning(extraction(Intent::Update, fields)),
        store.clone(),
    )
    .run("make that 4 sets", "alice", None)
    .await;

    let calls = store.calls();
    assert_eq!(calls.len(), 2);
    let Call::Query { query, .. } = &calls[0] else {
        panic!("expected fallback query first");
    };
    assert_eq!(query, &WorkoutQuery::most_recent());
    assert_eq!(
        calls[1],
        Call::Update {
            id: "R1".into(),
            owner: "alice".into(),
            patch: WorkoutPatch {
                set_count: Some(4),
                ..WorkoutPatch::default()
            },
        }
    );
    assert_eq!(
        state.response(),
        "Sets changed to 4. The record now is: squats, 4x10 @ 135 lbs"
    );
}

#[tokio::test]
async fn update_fallback_miss_asks_for_identifier() {
    let store = Arc::new(RecordingStore::with_records(vec![]));
    let fields = WorkoutFields {
        weight: Some("145 lbs".into()),
        ..WorkoutFields::default()
    };
    let state = engine(
        ScriptedExtractor::returning(extraction(Intent::Update, fields)),
        store.clone(),
    )
    .run("bump the weight", "alice", None)
    .await;

    assert_eq!(store.calls().len(), 1);
    assert_eq!(
        failure(&state),
        Some(&Failure::IdentifierMissing {
            intent: Intent::Update
        })
    );
}

#[tokio::test]
async fn update_with_explicit_id_and_no_fields() {
    let store = Arc::new(RecordingStore::default());
    let state = engine(
        ScriptedExtractor::returning(Extraction {
            record_id: Some("R9".into()),
            ..extraction(Intent::Update, WorkoutFields::default())
        }),
        store.clone(),
    )
    .run("update R9", "alice", None)
    .await;

    assert!(store.calls().is_empty());
    assert_eq!(failure(&state), Some(&Failure::NothingToUpdate));
}

#[tokio::test]
async fn update_of_foreign_record_is_not_found() {
    let store = Arc::new(RecordingStore {
        update_returns_none: true,
        ..RecordingStore::default()
    });
    let state = engine(
        ScriptedExtractor::returning(Extraction {
            record_id: Some("R9".into()),
            ..extraction(
                Intent::Update,
                WorkoutFields {
                    rep_count: Some(12),
                    ..WorkoutFields::default()
                },
            )
        }),
        store,
    )
    .run("R9 was 12 reps", "bob", None)
    .await;

    assert_eq!(failure(&state), Some(&Failure::NotFoundOrForbidden));
}

#[tokio::test]
async fn caller_record_id_is_used_when_extractor_has_none() {
    let store = Arc::new(RecordingStore::default());
    let fields = WorkoutFields {
        notes: Some("felt easy".into()),
        ..WorkoutFields::default()
    };
    let state = engine(
        ScriptedExtractor::returning(extraction(Intent::Update, fields)),
        store.clone(),
    )
    .run_request(Request::new("add a note", "alice").with_record_id(Some("R5".into())))
    .await;

    assert!(matches!(&store.calls()[0], Call::Update { id, .. } if id == "R5"));
    assert!(state.response().starts_with("Notes updated."));
}

// ═══════════════════════════════════════════════════════════════════════
//  Delete path
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn delete_without_id_targets_most_recent() {
    let store = Arc::new(RecordingStore {
        delete_matches: false,
        ..RecordingStore::with_records(vec![record("R1")])
    });
    let state = engine(
        ScriptedExtractor::returning(extraction(Intent::Delete, WorkoutFields::default())),
        store.clone(),
    )
    .run("delete that", "alice", None)
    .await;

    assert_eq!(
        store.calls()[1],
        Call::Delete {
            id: "R1".into(),
            owner: "alice".into()
        }
    );
    assert_eq!(state.response(), "Workout deleted successfully.");
    assert_eq!(
        state.outcome(),
        Some(&Outcome::Deleted {
            record_id: "R1".into(),
            matched: false
        })
    );
}

#[tokio::test]
async fn delete_with_nothing_to_target() {
    let store = Arc::new(RecordingStore::with_records(vec![]));
    let state = engine(
        ScriptedExtractor::returning(extraction(Intent::Delete, WorkoutFields::default())),
        store.clone(),
    )
    .run("delete it", "alice", None)
    .await;

    assert_eq!(store.calls().len(), 1);
    assert_eq!(
        failure(&state),
        Some(&Failure::IdentifierMissing {
            intent: Intent::Delete
        })
    );
    assert!(state.response().contains("delete"));
}

#[tokio::test]
async fn delete_fallback_store_error_still_terminates() {
    let store = Arc::new(RecordingStore::broken());
    let state = engine(
        ScriptedExtractor::returning(extraction(Intent::Delete, WorkoutFields::default())),
        store,
    )
    .run("delete it", "alice", None)
    .await;

    assert_eq!(
        failure(&state),
        Some(&Failure::IdentifierMissing {
            intent: Intent::Delete
        })
    );
}

// ═══════════════════════════════════════════════════════════════════════
//  Extraction failures
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn extractor_error_reaches_terminal_without_store() {
    let store = Arc::new(RecordingStore::default());
    let state = engine(ScriptedExtractor::failing("model timeout"), store.clone())
        .run("squats", "alice", Some(Intent::Create))
        .await;

    assert!(store.calls().is_empty());
    assert_eq!(failure(&state), Some(&Failure::ExtractionFailure));
    assert_eq!(state.intent(), Intent::Create);
    assert!(!state.response().contains("timeout"));
}

// ═══════════════════════════════════════════════════════════════════════
//  SQLite-backed runs
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn full_lifecycle_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open_and_migrate(dir.path().join("gym.db")).await.unwrap();
    let store = Arc::new(SqliteWorkoutStore::new(db));
    let engine = WorkoutEngine::new(Arc::new(JsonExtractor), store.clone());

    let saved = engine
        .run(
            r#"{"intent":"create","exercise":"squats","sets":3,"reps":10,"weight":"135 lbs"}"#,
            "alice",
            None,
        )
        .await;
    assert_eq!(saved.response(), "Workout saved! squats: 3x10 @ 135 lbs");

    let listed = engine
        .run(r#"{"intent":"read","filters":{"exercise":"squat"}}"#, "alice", None)
        .await;
    assert_eq!(listed.outcome(), Some(&Outcome::Listed { count: 1 }));
    let hint = listed.record_id().map(str::to_owned);
    assert!(hint.is_some());

    let updated = engine
        .run_request(
            Request::new(r#"{"intent":"update","weight":"145 lbs"}"#, "alice").with_record_id(hint),
        )
        .await;
    assert!(updated.response().ends_with("squats, 3x10 @ 145 lbs"));

    let others = engine.run(r#"{"intent":"delete"}"#, "bob", None).await;
    assert_eq!(
        failure(&others),
        Some(&Failure::IdentifierMissing {
            intent: Intent::Delete
        })
    );
    assert_eq!(store.count("alice").await.unwrap(), 1);

    let deleted = engine.run(r#"{"intent":"delete"}"#, "alice", None).await;
    assert_eq!(deleted.response(), "Workout deleted successfully.");
    assert_eq!(store.count("alice").await.unwrap(), 0);
}

#[tokio::test]
async fn rejected_query_range_fails_like_any_store_error() {
    let db = Database::open_in_memory().unwrap();
    db.run_migrations().await.unwrap();
    let engine = WorkoutEngine::new(Arc::new(JsonExtractor), Arc::new(SqliteWorkoutStore::new(db)));

    let state = engine
        .run(
            r#"{"intent":"read","filters":{"since":"2024-03-01","until":"2024-02-01"}}"#,
            "alice",
            None,
        )
        .await;

    assert_eq!(
        failure(&state),
        Some(&Failure::PersistenceFailure { op: StoreOp::Query })
    );
    assert!(!state.response().contains("2024"));
}

#[tokio::test]
async fn concurrent_requests_are_independent() {
    let db = Database::open_in_memory().unwrap();
    db.run_migrations().await.unwrap();
    let store = Arc::new(SqliteWorkoutStore::new(db));
    let engine = Arc::new(WorkoutEngine::new(Arc::new(JsonExtractor), store.clone()));

    let mut handles = Vec::new();
    for owner in ["alice", "bob", "carol", "dave"] {
        let engine = Arc::clone(&engine);
        handles.push(tokio::spawn(async move {
            engine
                .run(
                    r#"{"intent":"create","exercise":"rows","set_count":4,"rep_count":12,"weight":"40 kg"}"#,
                    owner,
                    None,
                )
                .await
        }));
    }
    for handle in handles {
        let state = handle.await.unwrap();
        assert!(state.outcome().is_some_and(Outcome::is_success));
    }

    for owner in ["alice", "bob", "carol", "dave"] {
        assert_eq!(store.count(owner).await.unwrap(), 1);
    }
}
