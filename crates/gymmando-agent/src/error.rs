//! Errors from talking to a chat model.

/// Why a chat completion did not produce a reply.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// Connect, TLS, timeout, or a body that could not be read.
    #[error("could not reach model provider: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} answered HTTP {status}: {body}")]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },

    /// The reply parsed as JSON but not in the provider's documented shape.
    #[error("malformed model reply: {reason}")]
    MalformedReply { reason: String },

    #[error("no API key configured for {provider}")]
    MissingApiKey { provider: &'static str },

    #[error("invalid model client settings: {reason}")]
    InvalidConfig { reason: String },

    #[error("model reply is not JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AgentError>;
