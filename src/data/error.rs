use thiserror::Error;

/// Failures from quiz sources and result sinks.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("quiz not found: {0}")]
    NotFound(String),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend answered {status}: {body}")]
    Status { status: u16, body: String },

    /// The payload parsed but did not have the shape we require.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("failed to decode JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BackendError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }
}
