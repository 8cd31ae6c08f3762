//! Engine errors.
//!
//! These cover extractors, intent parsing and engine construction. Once a
//! request is running, failures are folded into a terminal
//! [`crate::Failure`] instead.

#[derive(Debug, thiserror::Error)]
pub enum IntentError {
    /// The extractor's output could not be read as a workout request.
    #[error("could not extract workout request: {reason}")]
    ExtractionFailed { reason: String },

    #[error("`{value}` is not a workout intent")]
    InvalidIntent { value: String },

    #[error("invalid engine settings: {reason}")]
    InvalidConfig { reason: String },

    #[error("model call failed: {0}")]
    Agent(#[from] gymmando_agent::AgentError),

    /// Extraction JSON had the right shape but a field of the wrong type.
    #[error("extraction field has the wrong type: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, IntentError>;
