//! Completeness check for the create path.

use crate::state::{FieldName, Validation, WorkoutFields};

/// Fields a new workout must carry, in reporting order.
pub const REQUIRED_FIELDS: [FieldName; 4] = [
    FieldName::Exercise,
    FieldName::SetCount,
    FieldName::RepCount,
    FieldName::Weight,
];

/// Verdict plus the missing required fields in [`REQUIRED_FIELDS`] order.
pub fn validate(fields: &WorkoutFields) -> (Validation, Vec<FieldName>) {
    let missing: Vec<FieldName> = REQUIRED_FIELDS
        .into_iter()
        .filter(|field| !fields.is_present(*field))
        .collect();

    let verdict = if missing.is_empty() {
        Validation::Complete
    } else {
        Validation::Incomplete
    };
    (verdict, missing)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full() -> WorkoutFields {
        WorkoutFields {
            exercise: Some("squats".into()),
            set_count: Some(3),
            rep_count: Some(10),
            weight: Some("135 lbs".into()),
            ..WorkoutFields::default()
        }
    }

    #[test]
    fn complete_when_all_required_present() {
        assert_eq!(validate(&full()), (Validation::Complete, vec![]));
    }

    #[test]
    fn optional_fields_do_not_matter() {
        let fields = WorkoutFields {
            rest_seconds: None,
            notes: None,
            ..full()
        };
        assert_eq!(validate(&fields).0, Validation::Complete);
    }

    #[test]
    fn missing_fields_follow_required_order() {
        let fields = WorkoutFields {
            exercise: Some("squats".into()),
            ..WorkoutFields::default()
        };
        assert_eq!(
            validate(&fields),
            (
                Validation::Incomplete,
                vec![FieldName::SetCount, FieldName::RepCount, FieldName::Weight]
            )
        );

        let fields = WorkoutFields {
            weight: Some(String::new()),
            exercise: None,
            ..full()
        };
        assert_eq!(
            validate(&fields).1,
            vec![FieldName::Exercise, FieldName::Weight]
        );
    }

    #[test]
    fn nothing_present() {
        let (verdict, missing) = validate(&WorkoutFields::default());
        assert_eq!(verdict, Validation::Incomplete);
        assert_eq!(missing, REQUIRED_FIELDS.to_vec());
    }
}
