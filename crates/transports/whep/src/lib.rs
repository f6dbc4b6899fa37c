//! Receive-only WHEP client
//!
//! This crate pulls a live video stream from a WHEP (WebRTC-HTTP Egress
//! Protocol) endpoint: it creates a receive-only offer, waits for ICE
//! gathering to finish, POSTs the complete offer over HTTP, applies the
//! answer and hands inbound tracks to a caller-supplied playback sink.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │  Negotiator                                            │
//! │  ├─ ConnectionFactory → PeerConnection (webrtc-rs)     │
//! │  │   └─ attach_receiver (recvonly video → InboundStream)│
//! │  ├─ await_gathering_complete (watch channel)           │
//! │  └─ SignalingTransport (HTTP POST application/sdp)     │
//! │     ↓                                                   │
//! │  PlaybackSink (bind + play)                            │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use bridgewatch_whep::WhepClientConfig;
//!
//! let config = WhepClientConfig::new("http://127.0.0.1:8000")
//!     .with_default_endpoint("/camera/whep");
//!
//! assert!(config.validate().is_ok());
//! ```
//!
//! ## Async Usage
//!
//! ```no_run
//! use bridgewatch_whep::{Negotiator, PlaybackSink, WhepClientConfig};
//! use std::sync::Arc;
//!
//! # async fn example(sink: Arc<dyn PlaybackSink>) -> bridgewatch_whep::Result<()> {
//! let negotiator = Negotiator::from_config(WhepClientConfig::default())?;
//!
//! let session = negotiator.negotiate(sink).await?;
//! println!("{} tracks", session.stream().len());
//!
//! session.close().await?;
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod gathering;
pub mod media;
pub mod negotiation;
pub mod peer;
pub mod signaling;
pub mod sink;

pub use config::{WhepClientConfig, DEFAULT_ENDPOINT};
pub use error::{Error, Result};
pub use gathering::await_gathering_complete;
pub use media::{InboundStream, MediaKind, MediaTrack};
pub use negotiation::{NegotiatedSession, NegotiationState, Negotiator};
pub use peer::{
    attach_receiver, ConnectionFactory, GatheringState, PeerConnection, RtcConnectionFactory,
    RtcPeerConnection, SdpType, SessionDescription, TrackHandler,
};
pub use signaling::{HttpSignaling, SignalingAnswer, SignalingTransport, SDP_CONTENT_TYPE};
pub use sink::{PlaybackError, PlaybackSink};

/// Get the version of this crate
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
