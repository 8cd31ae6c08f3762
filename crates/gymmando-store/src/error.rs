//! Store errors.
//!
//! Rejected inputs get their own variants so callers can tell a bad request
//! apart from a broken database.

use chrono::NaiveDate;
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Schema step `version` could not be applied; the step was rolled back.
    #[error("schema migration {version} rolled back: {message}")]
    Migration { version: u32, message: String },

    /// A text column that must carry a value was blank.
    #[error("workout {field} is blank")]
    EmptyField { field: &'static str },

    #[error("query range ends before it starts ({since} > {until})")]
    InvertedRange { since: NaiveDate, until: NaiveDate },

    #[error("workout patch changes nothing")]
    EmptyPatch,

    /// A stored timestamp does not fit `DateTime<Utc>`.
    #[error("stored timestamp {0} is out of range")]
    TimestampOutOfRange(i64),

    /// The blocking worker running the statement panicked or was cancelled.
    #[error("store worker did not finish: {0}")]
    TaskJoin(String),
}

impl StoreError {
    /// Whether the request itself was at fault rather than the database.
    pub fn is_rejected_input(&self) -> bool {
        matches!(
            self,
            Self::EmptyField { .. } | Self::InvertedRange { .. } | Self::EmptyPatch
        )
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::TaskJoin(err.to_string())
    }
}
