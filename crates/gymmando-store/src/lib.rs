//! # gymmando-store
//!
//! Workout persistence for Gymmando.
//!
//! The [`WorkoutStore`] trait is the narrow, owner-scoped CRUD interface the
//! workflow engine depends on. [`SqliteWorkoutStore`] implements it on top of
//! a WAL-mode SQLite file with versioned migrations.
//!
//! ```ignore
//! use gymmando_store::{Database, SqliteWorkoutStore, WorkoutQuery, WorkoutStore};
//!
//! let db = Database::open_and_migrate("data/gymmando.db").await?;
//! let store = SqliteWorkoutStore::new(db);
//! let recent = store.query("alice", &WorkoutQuery::most_recent()).await?;
//! ```

pub mod db;
pub mod error;
pub mod migration;
pub mod workout;
pub mod workout_store;

// ── re-exports ───────────────────────────────────────────────────────

pub use db::Database;
pub use error::{StoreError, StoreResult};
pub use workout::{
    DEFAULT_QUERY_LIMIT, NewWorkout, SortOrder, WorkoutPatch, WorkoutQuery, WorkoutRecord,
    WorkoutStore,
};
pub use workout_store::SqliteWorkoutStore;
