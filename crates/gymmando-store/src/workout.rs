//! Workout record types and the owner-scoped [`WorkoutStore`] interface.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreResult;

/// Default number of rows returned by a query.
pub const DEFAULT_QUERY_LIMIT: u32 = 10;

// ═══════════════════════════════════════════════════════════════════════
//  Records
// ═══════════════════════════════════════════════════════════════════════

/// A persisted workout entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkoutRecord {
    /// UUID v7 identifier.
    pub id: String,
    pub owner_id: String,
    pub exercise: String,
    pub set_count: u32,
    pub rep_count: u32,
    /// Free-form weight including unit, e.g. `"135 lbs"`.
    pub weight: String,
    pub rest_seconds: Option<u32>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A complete workout ready to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWorkout {
    pub exercise: String,
    pub set_count: u32,
    pub rep_count: u32,
    pub weight: String,
    pub rest_seconds: Option<u32>,
    pub notes: Option<String>,
}

/// Partial update. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkoutPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exercise: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rep_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rest_seconds: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl WorkoutPatch {
    /// `true` when no column would change.
    pub fn is_empty(&self) -> bool {
        self.exercise.is_none()
            && self.set_count.is_none()
            && self.rep_count.is_none()
            && self.weight.is_none()
            && self.rest_seconds.is_none()
            && self.notes.is_none()
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Queries
// ═══════════════════════════════════════════════════════════════════════

/// Ordering by creation time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Filters for [`WorkoutStore::query`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkoutQuery {
    /// Case-insensitive partial match on the exercise name.
    pub exercise: Option<String>,
    /// Inclusive first day (UTC).
    pub since: Option<NaiveDate>,
    /// Inclusive last day (UTC).
    pub until: Option<NaiveDate>,
    pub limit: u32,
    pub order: SortOrder,
}

impl Default for WorkoutQuery {
    fn default() -> Self {
        Self {
            exercise: None,
            since: None,
            until: None,
            limit: DEFAULT_QUERY_LIMIT,
            order: SortOrder::Desc,
        }
    }
}

impl WorkoutQuery {
    /// The single newest record.
    pub fn most_recent() -> Self {
        Self {
            limit: 1,
            ..Self::default()
        }
    }

    pub fn with_exercise(mut self, exercise: impl Into<String>) -> Self {
        self.exercise = Some(exercise.into());
        self
    }

    pub fn with_range(mut self, since: Option<NaiveDate>, until: Option<NaiveDate>) -> Self {
        self.since = since;
        self.until = until;
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Store interface
// ═══════════════════════════════════════════════════════════════════════

/// Owner-scoped CRUD over workout records.
///
/// Every method filters by `owner_id`; a record owned by someone else is
/// indistinguishable from one that does not exist.
#[async_trait]
pub trait WorkoutStore: Send + Sync {
    /// Insert a workout. `None` means the store accepted the call but
    /// produced no record.
    async fn create(&self, owner_id: &str, workout: &NewWorkout) -> StoreResult<Option<WorkoutRecord>>;

    /// Matching records; empty when nothing matches.
    async fn query(&self, owner_id: &str, query: &WorkoutQuery) -> StoreResult<Vec<WorkoutRecord>>;

    /// Apply `patch` to one record. `None` when no owned record has `id`.
    async fn update(
        &self,
        id: &str,
        owner_id: &str,
        patch: &WorkoutPatch,
    ) -> StoreResult<Option<WorkoutRecord>>;

    /// Remove one record. `Ok(false)` when nothing matched.
    async fn delete(&self, id: &str, owner_id: &str) -> StoreResult<bool>;
}
