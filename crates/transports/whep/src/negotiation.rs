//! Negotiation controller
//!
//! Drives one receive-only negotiation attempt end to end:
//!
//! ```text
//! New → OfferCreated → LocalSet → GatheringComplete → Signaled → AnswerApplied
//!  └──────────────┴────────────┴──────────────┴────────────┴──→ Failed
//! ```
//!
//! Each step is a suspension point and the steps run strictly in order. The
//! full offer (all candidates included) is only sent once ICE gathering has
//! completed.

use crate::config::WhepClientConfig;
use crate::gathering::await_gathering_complete;
use crate::media::InboundStream;
use crate::peer::{
    attach_receiver, ConnectionFactory, PeerConnection, RtcConnectionFactory, SessionDescription,
};
use crate::signaling::{HttpSignaling, SignalingTransport};
use crate::sink::PlaybackSink;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Progress of a single negotiation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NegotiationState {
    /// Attempt started, nothing created yet
    New,
    /// Local offer created
    OfferCreated,
    /// Offer applied as the local description; ICE gathering running
    LocalSet,
    /// All local candidates gathered
    GatheringComplete,
    /// Signaling endpoint returned an answer
    Signaled,
    /// Answer applied as the remote description (terminal success)
    AnswerApplied,
    /// Attempt aborted (terminal failure)
    Failed,
}

impl NegotiationState {
    /// True for `AnswerApplied` and `Failed`
    pub fn is_terminal(&self) -> bool {
        matches!(self, NegotiationState::AnswerApplied | NegotiationState::Failed)
    }
}

/// State history of one attempt
struct Attempt {
    history: Vec<NegotiationState>,
}

impl Attempt {
    fn new() -> Self {
        Self {
            history: vec![NegotiationState::New],
        }
    }

    fn current(&self) -> NegotiationState {
        self.history
            .last()
            .copied()
            .unwrap_or(NegotiationState::New)
    }

    fn advance(&mut self, next: NegotiationState) {
        debug!("Negotiation state: {:?} -> {:?}", self.current(), next);
        self.history.push(next);
    }

    fn fail(&mut self, error: &Error) {
        warn!("Negotiation failed in state {:?}: {}", self.current(), error);
        self.history.push(NegotiationState::Failed);
    }

    fn into_history(self) -> Vec<NegotiationState> {
        self.history
    }
}

/// Receive-only WHEP negotiator
///
/// Holds no per-attempt state: every call to [`Negotiator::negotiate`] creates
/// its own peer connection and inbound stream.
pub struct Negotiator {
    config: WhepClientConfig,
    factory: Arc<dyn ConnectionFactory>,
    signaling: Arc<dyn SignalingTransport>,
}

impl Negotiator {
    /// Create a negotiator from explicit collaborators
    pub fn new(
        config: WhepClientConfig,
        factory: Arc<dyn ConnectionFactory>,
        signaling: Arc<dyn SignalingTransport>,
    ) -> Self {
        Self {
            config,
            factory,
            signaling,
        }
    }

    /// Create a negotiator backed by webrtc-rs and HTTP signaling
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the configuration does not validate.
    pub fn from_config(config: WhepClientConfig) -> Result<Self> {
        config.validate()?;

        let factory = Arc::new(RtcConnectionFactory::from_config(&config));
        let signaling = Arc::new(HttpSignaling::from_config(&config)?);

        Ok(Self::new(config, factory, signaling))
    }

    /// Get the configuration
    pub fn config(&self) -> &WhepClientConfig {
        &self.config
    }

    /// Signaling endpoint for `sink`: its override if non-empty, else the configured default
    pub fn resolve_endpoint(&self, sink: &dyn PlaybackSink) -> String {
        sink.signaling_url()
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| self.config.default_endpoint.clone())
    }

    /// Negotiate a receive-only session and bind its inbound stream to `sink`
    ///
    /// The sink is bound to a fresh (empty) stream before the offer is
    /// created, so on failure it may be left holding an empty stream; callers
    /// should treat that as total failure. Concurrent attempts against the
    /// same sink race on which stream is bound last.
    ///
    /// On failure after the peer connection was created, it is closed before
    /// the error is returned. Dropping the returned future abandons the
    /// attempt without closing the connection.
    ///
    /// # Errors
    ///
    /// - [`Error::Environment`] if no peer connection can be constructed
    /// - [`Error::Signaling`] if the endpoint answers with a non-success status
    /// - [`Error::Http`] if the signaling request cannot be completed
    /// - [`Error::Sdp`] if a description cannot be created or applied
    #[instrument(skip_all)]
    pub async fn negotiate(&self, sink: Arc<dyn PlaybackSink>) -> Result<NegotiatedSession> {
        self.negotiate_traced(sink).await.0
    }

    /// Like [`Negotiator::negotiate`], also returning every state the attempt passed through
    pub async fn negotiate_traced(
        &self,
        sink: Arc<dyn PlaybackSink>,
    ) -> (Result<NegotiatedSession>, Vec<NegotiationState>) {
        let mut attempt = Attempt::new();
        let endpoint = self.resolve_endpoint(sink.as_ref());

        info!("Starting negotiation against {}", endpoint);

        let connection = match self.factory.create_connection().await {
            Ok(connection) => connection,
            Err(e) => {
                attempt.fail(&e);
                return (Err(e), attempt.into_history());
            }
        };

        match self
            .run(&mut attempt, connection.as_ref(), sink, &endpoint)
            .await
        {
            Ok((stream, resource)) => {
                info!("Negotiation with {} complete", endpoint);

                let session = NegotiatedSession {
                    connection,
                    stream,
                    endpoint,
                    resource,
                    signaling: Arc::clone(&self.signaling),
                };
                (Ok(session), attempt.into_history())
            }
            Err(e) => {
                attempt.fail(&e);

                if let Err(close_err) = connection.close().await {
                    warn!(
                        "Failed to close peer connection after failed negotiation: {}",
                        close_err
                    );
                }

                (Err(e), attempt.into_history())
            }
        }
    }

    async fn run(
        &self,
        attempt: &mut Attempt,
        connection: &dyn PeerConnection,
        sink: Arc<dyn PlaybackSink>,
        endpoint: &str,
    ) -> Result<(InboundStream, Option<String>)> {
        let stream = attach_receiver(connection, sink).await?;

        let offer = connection.create_offer().await?;
        attempt.advance(NegotiationState::OfferCreated);

        connection.set_local_description(offer).await?;
        attempt.advance(NegotiationState::LocalSet);

        await_gathering_complete(connection, self.config.gathering_stall_warning()).await?;
        attempt.advance(NegotiationState::GatheringComplete);

        // Re-read so the offer carries every gathered candidate
        let local = connection.local_description().await.ok_or_else(|| {
            Error::Sdp("Local description missing after ICE gathering".to_string())
        })?;

        let answer = self.signaling.exchange(endpoint, &local.sdp).await?;
        attempt.advance(NegotiationState::Signaled);

        connection
            .set_remote_description(SessionDescription::answer(answer.sdp))
            .await?;
        attempt.advance(NegotiationState::AnswerApplied);

        Ok((stream, answer.location))
    }
}

/// A successfully negotiated receive-only session
pub struct NegotiatedSession {
    connection: Arc<dyn PeerConnection>,
    stream: InboundStream,
    endpoint: String,
    resource: Option<String>,
    signaling: Arc<dyn SignalingTransport>,
}

impl NegotiatedSession {
    /// Peer connection carrying the session
    pub fn connection(&self) -> &Arc<dyn PeerConnection> {
        &self.connection
    }

    /// Inbound stream bound to the sink
    pub fn stream(&self) -> &InboundStream {
        &self.stream
    }

    /// Signaling endpoint the offer was sent to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Session resource URL returned by the endpoint, if any
    pub fn resource(&self) -> Option<&str> {
        self.resource.as_deref()
    }

    /// Close the peer connection and release the remote session resource
    ///
    /// A failed teardown request is logged; only a failure to close the
    /// connection itself is returned.
    pub async fn close(self) -> Result<()> {
        let closed = self.connection.close().await;

        if let Some(resource) = &self.resource {
            match self.signaling.teardown(resource).await {
                Ok(()) => debug!("Released session resource {}", resource),
                Err(e) => warn!("Failed to release session resource {}: {}", resource, e),
            }
        }

        closed
    }
}

impl fmt::Debug for NegotiatedSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NegotiatedSession")
            .field("stream", &self.stream)
            .field("endpoint", &self.endpoint)
            .field("resource", &self.resource)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::PlaybackError;
    use async_trait::async_trait;

    struct UrlSink(Option<String>);

    #[async_trait]
    impl PlaybackSink for UrlSink {
        fn signaling_url(&self) -> Option<String> {
            self.0.clone()
        }

        fn bind(&self, _stream: InboundStream) {}

        async fn play(&self) -> std::result::Result<(), PlaybackError> {
            Ok(())
        }
    }

    #[test]
    fn test_resolve_endpoint() {
        let negotiator = Negotiator::from_config(WhepClientConfig::default()).unwrap();

        assert_eq!(negotiator.resolve_endpoint(&UrlSink(None)), "/camera/whep");
        assert_eq!(
            negotiator.resolve_endpoint(&UrlSink(Some("".to_string()))),
            "/camera/whep"
        );
        assert_eq!(
            negotiator.resolve_endpoint(&UrlSink(Some("/custom/path".to_string()))),
            "/custom/path"
        );
    }

    #[test]
    fn test_from_config_validates() {
        let result = Negotiator::from_config(WhepClientConfig::new("ftp://bridge"));
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_attempt_history() {
        let mut attempt = Attempt::new();
        attempt.advance(NegotiationState::OfferCreated);
        attempt.fail(&Error::Sdp("bad offer".to_string()));

        assert_eq!(
            attempt.into_history(),
            vec![
                NegotiationState::New,
                NegotiationState::OfferCreated,
                NegotiationState::Failed
            ]
        );
        assert!(NegotiationState::Failed.is_terminal());
        assert!(!NegotiationState::Signaled.is_terminal());
    }
}
