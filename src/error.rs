//! Augur error types

/// Augur error types
#[derive(Debug, thiserror::Error)]
pub enum AugurError {
    // Backend/network errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The backend accepted the request but the analyzer itself failed.
    #[error("analyzer '{analyzer}' failed: {message}")]
    Analyzer { analyzer: String, message: String },

    /// The backend is not started, was stopped, or cannot be reached.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("empty response from backend")]
    EmptyResponse,

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("no workspace available: {0}")]
    NoWorkspace(String),

    #[error("operation not implemented: {0}")]
    NotImplemented(&'static str),

    // Task errors
    /// A spawned analysis task panicked or was aborted.
    #[error("analysis task failed: {0}")]
    TaskFailed(String),
}

impl AugurError {
    /// Whether this error came from talking to the backend (as opposed to
    /// local configuration or workspace problems).
    pub fn is_backend_failure(&self) -> bool {
        matches!(
            self,
            AugurError::Http(_)
                | AugurError::Api { .. }
                | AugurError::Analyzer { .. }
                | AugurError::BackendUnavailable(_)
                | AugurError::EmptyResponse
        )
    }
}

impl From<regex::Error> for AugurError {
    fn from(err: regex::Error) -> Self {
        AugurError::Configuration(format!("invalid pattern: {err}"))
    }
}

impl From<tokio::task::JoinError> for AugurError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_cancelled() {
            AugurError::TaskFailed("task was aborted".to_string())
        } else {
            AugurError::TaskFailed(format!("task panicked: {err}"))
        }
    }
}

/// Result type alias for Augur operations
pub type Result<T> = std::result::Result<T, AugurError>;
