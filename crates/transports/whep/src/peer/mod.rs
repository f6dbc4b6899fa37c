//! Peer connection abstraction
//!
//! The negotiation controller only talks to a [`PeerConnection`]; the
//! production implementation wraps `webrtc::RTCPeerConnection`
//! ([`RtcPeerConnection`]) and is built by [`RtcConnectionFactory`].

pub mod connection;
pub mod receiver;

pub use connection::{RtcConnectionFactory, RtcPeerConnection};
pub use receiver::attach_receiver;

use crate::media::{MediaKind, MediaTrack};
use crate::{Error, Result};
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use webrtc::ice_transport::ice_gatherer_state::RTCIceGathererState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;

/// Callback invoked for every inbound track
pub type TrackHandler = Box<dyn Fn(MediaTrack) -> BoxFuture<'static, ()> + Send + Sync>;

/// ICE candidate gathering progress
///
/// Ordered so that a state only ever advances: `New < Gathering < Complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GatheringState {
    /// Gathering has not started
    New,
    /// Candidates are being discovered
    Gathering,
    /// All candidates have been gathered
    Complete,
}

impl GatheringState {
    /// True once gathering has finished
    pub fn is_complete(&self) -> bool {
        matches!(self, GatheringState::Complete)
    }

    /// Map the gatherer state reported by webrtc
    ///
    /// `Closed` and `Unspecified` carry no progress information.
    pub fn from_gatherer(state: RTCIceGathererState) -> Option<Self> {
        match state {
            RTCIceGathererState::New => Some(GatheringState::New),
            RTCIceGathererState::Gathering => Some(GatheringState::Gathering),
            RTCIceGathererState::Complete => Some(GatheringState::Complete),
            _ => None,
        }
    }
}

/// Publish a gathering state, dropping any update that would move backwards
///
/// Returns `true` if observers were notified.
pub fn advance_gathering(tx: &watch::Sender<GatheringState>, next: GatheringState) -> bool {
    tx.send_if_modified(|current| {
        if next > *current {
            *current = next;
            true
        } else {
            false
        }
    })
}

/// SDP type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    /// Local offer
    Offer,
    /// Remote answer
    Answer,
}

/// Session description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    /// Offer or answer
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
    /// Literal SDP text
    pub sdp: String,
}

impl SessionDescription {
    /// Create an offer description
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    /// Create an answer description
    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Answer,
            sdp: sdp.into(),
        }
    }
}

impl TryFrom<SessionDescription> for RTCSessionDescription {
    type Error = Error;

    fn try_from(desc: SessionDescription) -> Result<Self> {
        match desc.sdp_type {
            SdpType::Offer => RTCSessionDescription::offer(desc.sdp)
                .map_err(|e| Error::Sdp(format!("Invalid SDP offer: {}", e))),
            SdpType::Answer => RTCSessionDescription::answer(desc.sdp)
                .map_err(|e| Error::Sdp(format!("Invalid SDP answer: {}", e))),
        }
    }
}

impl TryFrom<RTCSessionDescription> for SessionDescription {
    type Error = Error;

    fn try_from(desc: RTCSessionDescription) -> Result<Self> {
        match desc.sdp_type {
            RTCSdpType::Offer => Ok(SessionDescription::offer(desc.sdp)),
            RTCSdpType::Answer => Ok(SessionDescription::answer(desc.sdp)),
            other => Err(Error::Sdp(format!(
                "Unsupported session description type: {}",
                other
            ))),
        }
    }
}

/// Operations the negotiation controller needs from a peer connection
#[async_trait]
pub trait PeerConnection: Send + Sync {
    /// Add a receive-only transceiver of the given kind
    async fn add_recvonly_transceiver(&self, kind: MediaKind) -> Result<()>;

    /// Register the track-arrival handler, replacing any previous one
    fn on_track(&self, handler: TrackHandler);

    /// Create a local offer
    async fn create_offer(&self) -> Result<SessionDescription>;

    /// Apply the local description (starts ICE gathering)
    async fn set_local_description(&self, desc: SessionDescription) -> Result<()>;

    /// Current local description, including any candidates gathered so far
    async fn local_description(&self) -> Option<SessionDescription>;

    /// Current ICE gathering state
    fn gathering_state(&self) -> GatheringState;

    /// Register a gathering-state observer; dropping the receiver deregisters it
    fn watch_gathering(&self) -> watch::Receiver<GatheringState>;

    /// Apply the remote description
    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()>;

    /// Close the connection
    async fn close(&self) -> Result<()>;
}

/// Creates one peer connection per negotiation attempt
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    /// Create a new, unconfigured peer connection
    ///
    /// # Errors
    ///
    /// Returns [`Error::Environment`] if the runtime cannot construct one.
    async fn create_connection(&self) -> Result<Arc<dyn PeerConnection>>;
}
