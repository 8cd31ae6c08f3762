//! Routing decisions.
//!
//! Pure functions over closed enums: which branch a request takes after
//! extraction, whether a validated request may be persisted, and whether a
//! missing identifier should be looked up.

use serde::Serialize;

use crate::state::{Intent, Validation, WorkoutFields};

/// Branch chosen after extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Branch {
    Read,
    Update,
    Delete,
    CreatePending,
}

/// Where a validated request goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveRoute {
    Persist,
    Reject,
}

/// Pick a branch. Total over every `(intent, has_record_id)` pair.
pub fn dispatch(intent: Intent, has_record_id: bool) -> Branch {
    match (intent, has_record_id) {
        (Intent::Read, _) => Branch::Read,
        (Intent::Delete, _) => Branch::Delete,
        (Intent::Update, true) => Branch::Update,
        (Intent::Update, false) | (Intent::Create, _) | (Intent::Unknown, _) => {
            Branch::CreatePending
        }
    }
}

/// Only a complete create is persisted.
pub fn save_gate(intent: Intent, validation: Validation) -> SaveRoute {
    match (intent, validation) {
        (Intent::Create, Validation::Complete) => SaveRoute::Persist,
        _ => SaveRoute::Reject,
    }
}

/// Look up the newest record when an update or delete names none.
///
/// Delete always tries; update only when there is something to change.
pub fn should_attempt_fallback(intent: Intent, has_record_id: bool, fields: &WorkoutFields) -> bool {
    if has_record_id {
        return false;
    }
    match intent {
        Intent::Delete => true,
        Intent::Update => fields.has_mutable_field(),
        Intent::Create | Intent::Read | Intent::Unknown => false,
    }
}
