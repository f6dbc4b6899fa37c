//! Error types for the dashboard clients

/// Result type alias using dashboard Error
pub type Result<T> = std::result::Result<T, Error>;

/// Dashboard client errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP transport failure (connection refused, timeout, bad body)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Login refused by the session service
    #[error("Login rejected ({status}): {detail}")]
    LoginRejected {
        /// HTTP status code
        status: u16,
        /// Server-provided detail, or a generic message
        detail: String,
    },

    /// Service answered with a status the client does not handle
    #[error("Unexpected response: {status} {reason}")]
    UnexpectedStatus {
        /// HTTP status code
        status: u16,
        /// Reason phrase for the status
        reason: String,
    },

    /// Base URL or path could not be parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Invalid configuration parameter
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Camera feed negotiation failure
    #[error(transparent)]
    Whep(#[from] bridgewatch_whep::Error),
}

impl Error {
    /// Build an [`Error::UnexpectedStatus`] from a response status
    pub(crate) fn unexpected(status: reqwest::StatusCode) -> Self {
        Error::UnexpectedStatus {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
        }
    }

    /// Check if the request could succeed when repeated
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(_) => true,
            Error::UnexpectedStatus { status, .. } => *status >= 500,
            Error::Whep(e) => e.is_retryable(),
            _ => false,
        }
    }
}
