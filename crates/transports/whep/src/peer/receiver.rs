//! Receive-only wiring between a peer connection and a playback sink

use super::PeerConnection;
use crate::media::{InboundStream, MediaKind};
use crate::sink::PlaybackSink;
use crate::Result;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Bind a fresh inbound stream to `sink` and add the video receiver
///
/// Every track the connection delivers is appended to the returned stream,
/// after which the sink is asked to play. A rejected `play` is logged and
/// otherwise ignored. Re-delivery of a track already in the stream is a
/// no-op.
pub async fn attach_receiver(
    connection: &dyn PeerConnection,
    sink: Arc<dyn PlaybackSink>,
) -> Result<InboundStream> {
    let inbound = InboundStream::new();
    sink.bind(inbound.clone());

    connection
        .add_recvonly_transceiver(MediaKind::Video)
        .await?;

    let stream = inbound.clone();
    connection.on_track(Box::new(move |track| {
        let stream = stream.clone();
        let sink = Arc::clone(&sink);

        Box::pin(async move {
            let track_id = track.id().to_string();
            let kind = track.kind();

            if !stream.add_track(track) {
                debug!("Ignoring repeated delivery of track {}", track_id);
                return;
            }

            info!("Received {} track {} on stream {}", kind, track_id, stream.id());

            if let Err(e) = sink.play().await {
                warn!("play blocked: {}", e);
            }
        })
    }));

    Ok(inbound)
}
