//! Signaling transport for the offer/answer exchange
//!
//! WHEP signaling is a single HTTP round trip: the full offer SDP is POSTed
//! as `application/sdp` and the response body is the literal answer SDP.

mod http;

pub use self::http::{HttpSignaling, SDP_CONTENT_TYPE};

use crate::Result;
use async_trait::async_trait;

/// Answer returned by the signaling endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalingAnswer {
    /// Literal answer SDP
    pub sdp: String,

    /// Session resource URL from the `Location` header, if the endpoint returned one
    pub location: Option<String>,
}

impl SignalingAnswer {
    /// Answer without a session resource
    pub fn new(sdp: impl Into<String>) -> Self {
        Self {
            sdp: sdp.into(),
            location: None,
        }
    }

    /// Attach a session resource URL
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// Carries an offer to the remote signaling endpoint
#[async_trait]
pub trait SignalingTransport: Send + Sync {
    /// Send `offer_sdp` to `endpoint` and return the remote answer
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Signaling`] with the status code and reason
    /// phrase when the endpoint answers with a non-success status.
    async fn exchange(&self, endpoint: &str, offer_sdp: &str) -> Result<SignalingAnswer>;

    /// Release a session resource previously returned in [`SignalingAnswer::location`]
    async fn teardown(&self, resource: &str) -> Result<()>;
}
