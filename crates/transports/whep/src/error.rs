//! Error types for WHEP negotiation

/// Result type alias using WHEP Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can terminate a negotiation attempt
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The runtime could not construct (or lost) the peer connection
    #[error("Peer connection unavailable: {0}")]
    Environment(String),

    /// Invalid configuration parameter
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Signaling endpoint answered with a non-success status
    #[error("WebRTC signaling failed: {status} {reason}")]
    Signaling {
        /// HTTP status code
        status: u16,
        /// Reason phrase for the status
        reason: String,
    },

    /// HTTP transport failure before a status was received
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// SDP negotiation error
    #[error("SDP negotiation error: {0}")]
    Sdp(String),

    /// Media track / transceiver error
    #[error("Media track error: {0}")]
    MediaTrack(String),

    /// WebRTC library error
    #[error("WebRTC error: {0}")]
    WebRtc(String),
}

impl Error {
    /// Check if a fresh attempt could succeed after this error
    ///
    /// Transport failures, server errors, 408 and 429 are retryable; other
    /// client errors (e.g. 404 for a wrong endpoint) are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Signaling { status, .. } => *status >= 500 || matches!(status, 408 | 429),
            Error::Http(_) => true,
            _ => false,
        }
    }

    /// Check if this error came from the signaling round trip, whatever its status
    pub fn is_signaling_error(&self) -> bool {
        matches!(self, Error::Signaling { .. } | Error::Http(_))
    }

    /// HTTP status carried by a signaling failure
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Signaling { status, .. } => Some(*status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
