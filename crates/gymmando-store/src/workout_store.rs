//! SQLite implementation of [`WorkoutStore`].
//!
//! Timestamps are stored as unix milliseconds. Every statement carries an
//! `owner_id` predicate.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::db::Database;
use crate::error::{StoreError, StoreResult};
use crate::workout::{NewWorkout, SortOrder, WorkoutPatch, WorkoutQuery, WorkoutRecord, WorkoutStore};

const COLUMNS: &str =
    "id, owner_id, exercise, set_count, rep_count, weight, rest_seconds, notes, created_at, updated_at";

// ═══════════════════════════════════════════════════════════════════════
//  SqliteWorkoutStore
// ═══════════════════════════════════════════════════════════════════════

/// Workout store backed by the `workouts` table.
#[derive(Clone)]
pub struct SqliteWorkoutStore {
    db: Database,
}

impl SqliteWorkoutStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    #[cfg(test)]
    async fn get(&self, id: &str, owner_id: &str) -> StoreResult<Option<WorkoutRecord>> {
        let id = id.to_string();
        let owner_id = owner_id.to_string();
        self.db
            .execute(move |conn| load(conn, &id, &owner_id))
            .await
    }

    /// Number of records owned by `owner_id`.
    #[instrument(skip(self))]
    pub async fn count(&self, owner_id: &str) -> StoreResult<u64> {
        let owner_id = owner_id.to_string();
        self.db
            .execute(move |conn| {
                let n: i64 = conn.query_row(
                    "SELECT count(*) FROM workouts WHERE owner_id = ?1",
                    rusqlite::params![owner_id],
                    |row| row.get(0),
                )?;
                Ok(n.max(0) as u64)
            })
            .await
    }
}

#[async_trait]
impl WorkoutStore for SqliteWorkoutStore {
    #[instrument(skip(self, workout), fields(exercise = %workout.exercise))]
    async fn create(&self, owner_id: &str, workout: &NewWorkout) -> StoreResult<Option<WorkoutRecord>> {
        require_text("owner_id", owner_id)?;
        require_text("exercise", &workout.exercise)?;
        require_text("weight", &workout.weight)?;

        let now = now_millis();
        let record = WorkoutRecord {
            id: Uuid::now_v7().to_string(),
            owner_id: owner_id.to_string(),
            exercise: workout.exercise.trim().to_string(),
            set_count: workout.set_count,
            rep_count: workout.rep_count,
            weight: workout.weight.trim().to_string(),
            rest_seconds: workout.rest_seconds,
            notes: workout.notes.clone(),
            created_at: from_millis(now)?,
            updated_at: from_millis(now)?,
        };

        let row = record.clone();
        self.db
            .execute(move |conn| {
                conn.execute(
                    "INSERT INTO workouts (id, owner_id, exercise, set_count, rep_count, weight, rest_seconds, notes, created_at, updated_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
                    rusqlite::params![
                        row.id,
                        row.owner_id,
                        row.exercise,
                        row.set_count,
                        row.rep_count,
                        row.weight,
                        row.rest_seconds,
                        row.notes,
                        now,
                    ],
                )?;
                Ok(())
            })
            .await?;

        debug!(workout_id = %record.id, "workout created");
        Ok(Some(record))
    }

    #[instrument(skip(self))]
    async fn query(&self, owner_id: &str, query: &WorkoutQuery) -> StoreResult<Vec<WorkoutRecord>> {
        if let (Some(since), Some(until)) = (query.since, query.until) {
            if since > until {
                return Err(StoreError::InvertedRange { since, until });
            }
        }

        let mut sql = format!("SELECT {COLUMNS} FROM workouts WHERE owner_id = ?");
        let mut params = vec![Value::Text(owner_id.to_string())];

        if let Some(exercise) = query.exercise.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
            sql.push_str(" AND exercise LIKE ? ESCAPE '\\'");
            params.push(Value::Text(format!("%{}%", escape_like(exercise))));
        }
        if let Some(since) = query.since {
            sql.push_str(" AND created_at >= ?");
            params.push(Value::Integer(day_start_millis(since)));
        }
        if let Some(next_day) = query.until.and_then(|d| d.succ_opt()) {
            sql.push_str(" AND created_at < ?");
            params.push(Value::Integer(day_start_millis(next_day)));
        }

        let direction = match query.order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        sql.push_str(&format!(" ORDER BY created_at {direction}, id {direction} LIMIT ?"));
        params.push(Value::Integer(i64::from(query.limit)));

        let records = self
            .db
            .execute(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(rusqlite::params_from_iter(params), read_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows.into_iter().map(WorkoutRow::into_record).collect::<StoreResult<Vec<_>>>()
            })
            .await?;

        debug!(count = records.len(), "workouts queried");
        Ok(records)
    }

    #[instrument(skip(self, patch))]
    async fn update(
        &self,
        id: &str,
        owner_id: &str,
        patch: &WorkoutPatch,
    ) -> StoreResult<Option<WorkoutRecord>> {
        if patch.is_empty() {
            return Err(StoreError::EmptyPatch);
        }

        let mut assignments = Vec::new();
        let mut params = Vec::new();
        if let Some(exercise) = &patch.exercise {
            require_text("exercise", exercise)?;
            assignments.push("exercise = ?");
            params.push(Value::Text(exercise.trim().to_string()));
        }
        if let Some(sets) = patch.set_count {
            assignments.push("set_count = ?");
            params.push(Value::Integer(i64::from(sets)));
        }
        if let Some(reps) = patch.rep_count {
            assignments.push("rep_count = ?");
            params.push(Value::Integer(i64::from(reps)));
        }
        if let Some(weight) = &patch.weight {
            require_text("weight", weight)?;
            assignments.push("weight = ?");
            params.push(Value::Text(weight.trim().to_string()));
        }
        if let Some(rest) = patch.rest_seconds {
            assignments.push("rest_seconds = ?");
            params.push(Value::Integer(i64::from(rest)));
        }
        if let Some(notes) = &patch.notes {
            assignments.push("notes = ?");
            params.push(Value::Text(notes.clone()));
        }
        assignments.push("updated_at = ?");
        params.push(Value::Integer(now_millis()));

        let sql = format!(
            "UPDATE workouts SET {} WHERE id = ? AND owner_id = ?",
            assignments.join(", ")
        );
        let id = id.to_string();
        let owner_id = owner_id.to_string();
        params.push(Value::Text(id.clone()));
        params.push(Value::Text(owner_id.clone()));

        let updated = self
            .db
            .execute_mut(move |conn| {
                let tx = conn.transaction()?;
                let changed = tx.execute(&sql, rusqlite::params_from_iter(params))?;
                if changed == 0 {
                    return Ok(None);
                }
                let record = load(&tx, &id, &owner_id)?;
                tx.commit()?;
                Ok(record)
            })
            .await?;

        debug!(found = updated.is_some(), "workout update applied");
        Ok(updated)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &str, owner_id: &str) -> StoreResult<bool> {
        let id = id.to_string();
        let owner_id = owner_id.to_string();
        let removed = self
            .db
            .execute(move |conn| {
                let n = conn.execute(
                    "DELETE FROM workouts WHERE id = ?1 AND owner_id = ?2",
                    rusqlite::params![id, owner_id],
                )?;
                Ok(n > 0)
            })
            .await?;

        debug!(removed, "workout delete executed");
        Ok(removed)
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Row mapping
// ═══════════════════════════════════════════════════════════════════════

struct WorkoutRow {
    id: String,
    owner_id: String,
    exercise: String,
    set_count: u32,
    rep_count: u32,
    weight: String,
    rest_seconds: Option<u32>,
    notes: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl WorkoutRow {
    fn into_record(self) -> StoreResult<WorkoutRecord> {
        Ok(WorkoutRecord {
            id: self.id,
            owner_id: self.owner_id,
            exercise: self.exercise,
            set_count: self.set_count,
            rep_count: self.rep_count,
            weight: self.weight,
            rest_seconds: self.rest_seconds,
            notes: self.notes,
            created_at: from_millis(self.created_at)?,
            updated_at: from_millis(self.updated_at)?,
        })
    }
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<WorkoutRow> {
    Ok(WorkoutRow {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        exercise: row.get(2)?,
        set_count: row.get(3)?,
        rep_count: row.get(4)?,
        weight: row.get(5)?,
        rest_seconds: row.get(6)?,
        notes: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn load(conn: &Connection, id: &str, owner_id: &str) -> StoreResult<Option<WorkoutRecord>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM workouts WHERE id = ?1 AND owner_id = ?2"),
        rusqlite::params![id, owner_id],
        read_row,
    )
    .optional()?
    .map(WorkoutRow::into_record)
    .transpose()
}

// ── helpers ──────────────────────────────────────────────────────────

fn require_text(field: &'static str, value: &str) -> StoreResult<()> {
    if value.trim().is_empty() {
        return Err(StoreError::EmptyField { field });
    }
    Ok(())
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn from_millis(millis: i64) -> StoreResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or(StoreError::TimestampOutOfRange(millis))
}

fn day_start_millis(day: NaiveDate) -> i64 {
    day.and_time(NaiveTime::MIN).and_utc().timestamp_millis()
}

/// Escape `%`, `_` and the escape character itself for a `LIKE ... ESCAPE '\'` pattern.
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════
