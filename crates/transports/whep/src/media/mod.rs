//! Inbound media: track handles and the stream container handed to playback sinks

mod stream;

pub use stream::InboundStream;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::track::track_remote::TrackRemote;

/// Media kind of a transceiver or track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Audio media
    Audio,
    /// Video media
    Video,
}

impl MediaKind {
    /// Kind string as it appears in SDP `m=` lines
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<MediaKind> for RTPCodecType {
    fn from(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Audio => RTPCodecType::Audio,
            MediaKind::Video => RTPCodecType::Video,
        }
    }
}

impl From<RTPCodecType> for MediaKind {
    fn from(codec_type: RTPCodecType) -> Self {
        match codec_type {
            RTPCodecType::Audio => MediaKind::Audio,
            _ => MediaKind::Video,
        }
    }
}

/// A single inbound media track
///
/// Identity is the track id: the same remote track delivered twice maps to
/// one entry in an [`InboundStream`].
#[derive(Clone)]
pub struct MediaTrack {
    id: String,
    kind: MediaKind,
    stream_id: String,
    remote: Option<Arc<TrackRemote>>,
}

impl MediaTrack {
    /// Create a track that is not backed by a live RTP source
    pub fn new(id: impl Into<String>, kind: MediaKind, stream_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            stream_id: stream_id.into(),
            remote: None,
        }
    }

    /// Wrap a remote track delivered by the peer connection
    pub fn from_remote(remote: Arc<TrackRemote>) -> Self {
        // Remote tracks without an msid have an empty id; fall back to the SSRC
        let mut id = remote.id().to_string();
        if id.is_empty() {
            id = format!("ssrc-{}", remote.ssrc());
        }

        Self {
            id,
            kind: remote.kind().into(),
            stream_id: remote.stream_id().to_string(),
            remote: Some(remote),
        }
    }

    /// Track identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Media kind
    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    /// Remote stream (msid) this track belongs to
    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    /// Live RTP source, if any
    pub fn remote(&self) -> Option<&Arc<TrackRemote>> {
        self.remote.as_ref()
    }
}

impl fmt::Debug for MediaTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaTrack")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("stream_id", &self.stream_id)
            .field("live", &self.remote.is_some())
            .finish()
    }
}
