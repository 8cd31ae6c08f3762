//! Intent-routed workout workflow engine.
//!
//! - **Extraction**: raw text to candidate fields via [`extractor::Extractor`]
//!   ([`LlmExtractor`] for chat models, [`JsonExtractor`] for scripted input).
//! - **Routing**: [`dispatch::dispatch`], [`dispatch::save_gate`] and the
//!   most-recent-record fallback.
//! - **Validation**: required-field completeness for new workouts.
//! - **Engine**: [`WorkoutEngine`] runs one request to a terminal
//!   [`RequestState`] carrying the user-facing response.

pub mod dispatch;
pub mod error;
pub mod extractor;
pub mod response;
pub mod state;
pub mod validator;
pub mod workflow;

pub use dispatch::{Branch, SaveRoute};
pub use error::{IntentError, Result};
pub use extractor::{Extraction, Extractor, JsonExtractor, LlmExtractor};
pub use state::{
    FieldName, Failure, Intent, Outcome, ReadFilters, RequestState, Stage, StoreOp, Validation,
    WorkoutFields,
};
pub use workflow::{EngineConfig, Request, WorkoutEngine};
