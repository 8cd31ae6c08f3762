//! User-facing messages.
//!
//! Failure text is fixed per [`Failure`] variant and never includes
//! collaborator error details.

use gymmando_store::{NewWorkout, WorkoutPatch, WorkoutRecord};

use crate::state::{FieldName, Failure, Intent, StoreOp};

/// Order in which update confirmations list changed fields.
pub const CHANGE_ORDER: [FieldName; 6] = [
    FieldName::SetCount,
    FieldName::RepCount,
    FieldName::Weight,
    FieldName::Exercise,
    FieldName::RestSeconds,
    FieldName::Notes,
];

impl Failure {
    pub fn message(&self) -> String {
        match self {
            Self::ExtractionFailure => {
                "Sorry, I couldn't understand that workout request. Please try again.".into()
            }
            Self::ValidationRejection { missing } => format!(
                "Cannot save workout: missing {}. Please provide {} and try again.",
                join_fields(missing),
                if missing.len() == 1 { "it" } else { "them" },
            ),
            Self::IdentifierMissing { intent: Intent::Delete } => {
                "Cannot delete workout: workout ID is required. Please specify which workout to delete.".into()
            }
            Self::IdentifierMissing { .. } => {
                "Cannot update workout: workout ID is required. Please specify which workout to update.".into()
            }
            Self::NothingToUpdate => {
                "Cannot update workout: no fields to update. Please specify what to change.".into()
            }
            Self::NotFoundOrForbidden => {
                "Failed to update workout. Workout not found or you don't have permission to update it.".into()
            }
            Self::PersistenceFailure { op: StoreOp::Create } => {
                "An error occurred while saving your workout. Please try again.".into()
            }
            Self::PersistenceFailure { op: StoreOp::Query } => {
                "Sorry, I encountered an error retrieving your workouts. Please try again.".into()
            }
            Self::PersistenceFailure { op: StoreOp::Update } => {
                "An error occurred while updating your workout. Please try again.".into()
            }
            Self::PersistenceFailure { op: StoreOp::Delete } => {
                "An error occurred while deleting your workout. Please try again.".into()
            }
            Self::UnclassifiedIntent => {
                "Sorry, I couldn't tell what you want to do with that workout. Try logging or asking about one.".into()
            }
            Self::MissingOwner => "Cannot process workout request: no user was identified.".into(),
        }
    }
}

pub fn saved(workout: &NewWorkout) -> String {
    format!(
        "Workout saved! {}: {}x{} @ {}",
        workout.exercise, workout.set_count, workout.rep_count, workout.weight
    )
}

/// JSON array of the records; `[]` when empty.
pub fn listed(records: &[WorkoutRecord]) -> serde_json::Result<String> {
    serde_json::to_string(records)
}

pub fn deleted() -> String {
    "Workout deleted successfully.".into()
}

/// Fields a patch touches, in [`CHANGE_ORDER`].
pub fn changed_fields(patch: &WorkoutPatch) -> Vec<FieldName> {
    CHANGE_ORDER
        .into_iter()
        .filter(|field| match field {
            FieldName::SetCount => patch.set_count.is_some(),
            FieldName::RepCount => patch.rep_count.is_some(),
            FieldName::Weight => patch.weight.is_some(),
            FieldName::Exercise => patch.exercise.is_some(),
            FieldName::RestSeconds => patch.rest_seconds.is_some(),
            FieldName::Notes => patch.notes.is_some(),
        })
        .collect()
}

/// "Sets changed to 4, weight changed to 145 lbs. The record now is: ..."
pub fn updated(patch: &WorkoutPatch, record: &WorkoutRecord) -> String {
    let changes: Vec<String> = changed_fields(patch)
        .into_iter()
        .filter_map(|field| describe_change(field, patch))
        .collect();

    format!(
        "{}. The record now is: {}, {}x{} @ {}",
        capitalize(&changes.join(", ")),
        record.exercise,
        record.set_count,
        record.rep_count,
        record.weight
    )
}

fn describe_change(field: FieldName, patch: &WorkoutPatch) -> Option<String> {
    Some(match field {
        FieldName::SetCount => format!("sets changed to {}", patch.set_count?),
        FieldName::RepCount => format!("reps changed to {}", patch.rep_count?),
        FieldName::Weight => format!("weight changed to {}", patch.weight.as_deref()?),
        FieldName::Exercise => format!("exercise changed to {}", patch.exercise.as_deref()?),
        FieldName::RestSeconds => format!("rest time changed to {} seconds", patch.rest_seconds?),
        FieldName::Notes => {
            patch.notes.as_ref()?;
            "notes updated".to_string()
        }
    })
}

fn join_fields(fields: &[FieldName]) -> String {
    fields
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
