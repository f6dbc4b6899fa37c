//! Playback sink contract
//!
//! A sink is the render target for the inbound stream (a video element in a
//! browser, an RTP consumer in a headless viewer). It may override the
//! signaling endpoint, receives the [`InboundStream`] before negotiation
//! starts, and is asked to start playback whenever a new track arrives.

use crate::media::InboundStream;
use async_trait::async_trait;

/// Playback was refused by the sink
///
/// Never fatal to negotiation: the media pipeline is wired regardless.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PlaybackError {
    /// Sink policy refused to start playback (e.g. autoplay blocked)
    #[error("Playback blocked: {0}")]
    Blocked(String),

    /// `play` was requested before a stream was bound
    #[error("No inbound stream bound to sink")]
    NotBound,

    /// Sink failed while starting playback
    #[error("Playback failed: {0}")]
    Failed(String),
}

/// Render target for a negotiated inbound stream
#[async_trait]
pub trait PlaybackSink: Send + Sync {
    /// Signaling endpoint override (path or absolute URL), if the sink declares one
    fn signaling_url(&self) -> Option<String> {
        None
    }

    /// Bind the stream as this sink's source
    ///
    /// Called once per negotiation attempt, before the offer is created.
    fn bind(&self, stream: InboundStream);

    /// Start (or continue) playback of the bound stream
    async fn play(&self) -> std::result::Result<(), PlaybackError>;
}
