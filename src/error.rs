use thiserror::Error;

/// Failures reported by a [`crate::client::Backend`] call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed response: {0}")]
    Parse(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },
}

impl BackendError {
    /// Short label used for metrics and structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            BackendError::Network(_) => "network",
            BackendError::Parse(_) => "parse",
            BackendError::Validation(_) => "validation",
            BackendError::Conflict(_) => "conflict",
            BackendError::NotFound(_) => "not_found",
            BackendError::Server { .. } => "server",
        }
    }
}

#[derive(Error, Debug)]
pub enum EventlyError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("URL parsing error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },

    #[error("Admin access denied: {reason}")]
    AuthorizationDenied { reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Metrics server error: {0}")]
    MetricsError(String),
}
