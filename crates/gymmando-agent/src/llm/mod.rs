//! LLM access: provider-agnostic types plus the HTTP client.

pub mod client;
pub mod types;

pub use client::{ChatCompletion, LlmClient, LlmClientConfig, LlmProvider};
pub use types::{ChatRequest, LlmResponse, Message, Role};
