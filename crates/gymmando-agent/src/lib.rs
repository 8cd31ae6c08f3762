//! # gymmando-agent
//!
//! Thin, non-streaming chat client used by the Gymmando extractor.
//!
//! [`LlmClient`] speaks the Anthropic Messages API and the OpenAI Chat
//! Completions API (plus OpenAI-compatible servers). Callers depend on the
//! [`ChatCompletion`] trait so a canned model can stand in during tests.

pub mod error;
pub mod llm;

pub use error::{AgentError, Result};
pub use llm::{ChatCompletion, ChatRequest, LlmClient, LlmClientConfig, LlmProvider, LlmResponse, Message, Role};
