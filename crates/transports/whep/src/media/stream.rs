//! Inbound stream container

use super::MediaTrack;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

/// Mutable, shared set of inbound tracks
///
/// Created empty before negotiation starts and bound to the playback sink.
/// The track-arrival handler appends to it as tracks show up. Clones share
/// the same underlying track list.
#[derive(Clone)]
pub struct InboundStream {
    id: String,
    tracks: Arc<RwLock<Vec<MediaTrack>>>,
}

impl InboundStream {
    /// Create an empty stream with a fresh identifier
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            tracks: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Stream identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Add a track, ignoring tracks whose id is already present
    ///
    /// Returns `true` if the track was added.
    pub fn add_track(&self, track: MediaTrack) -> bool {
        let mut tracks = self.tracks.write();
        if tracks.iter().any(|t| t.id() == track.id()) {
            debug!("Stream {} already holds track {}", self.id, track.id());
            return false;
        }

        debug!(
            "Stream {} received {} track {}",
            self.id,
            track.kind(),
            track.id()
        );
        tracks.push(track);
        true
    }

    /// Snapshot of the current tracks in arrival order
    pub fn tracks(&self) -> Vec<MediaTrack> {
        self.tracks.read().clone()
    }

    /// Check whether a track with this id is present
    pub fn contains(&self, track_id: &str) -> bool {
        self.tracks.read().iter().any(|t| t.id() == track_id)
    }

    /// Number of tracks
    pub fn len(&self) -> usize {
        self.tracks.read().len()
    }

    /// True until the first track arrives
    pub fn is_empty(&self) -> bool {
        self.tracks.read().is_empty()
    }

    /// Check whether two handles share the same track list
    pub fn same_stream(&self, other: &InboundStream) -> bool {
        Arc::ptr_eq(&self.tracks, &other.tracks)
    }
}

impl Default for InboundStream {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InboundStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InboundStream")
            .field("id", &self.id)
            .field("tracks", &*self.tracks.read())
            .finish()
    }
}
