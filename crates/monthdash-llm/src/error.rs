use thiserror::Error;

/// Errors returned by the external text service.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rate limited (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("unexpected HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    /// The API envelope could not be deserialized.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("empty completion for {context}")]
    EmptyResponse { context: String },

    /// The model answered, but not in the requested format.
    #[error("unparseable {context} response: {reason}")]
    Unparseable { context: String, reason: String },

    #[error("invalid client configuration: {0}")]
    Config(String),
}

impl LlmError {
    /// Whether a retry after back-off may succeed.
    ///
    /// Transient: network failures, 429, 408, 5xx, and empty or malformed answers.
    /// Everything else is returned to the caller without retry.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            LlmError::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.is_request()
                    || e.status().is_some_and(|s| s.is_server_error())
            }
            LlmError::RateLimited { .. }
            | LlmError::EmptyResponse { .. }
            | LlmError::Unparseable { .. } => true,
            LlmError::Status { status, .. } => *status == 408 || *status >= 500,
            LlmError::Deserialize { .. } | LlmError::Config(_) => false,
        }
    }
}
