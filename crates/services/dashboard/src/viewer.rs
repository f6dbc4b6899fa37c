//! Headless playback sink
//!
//! Stands in for the dashboard's video element: it reads RTP from every
//! live inbound track and logs throughput instead of rendering frames.

use async_trait::async_trait;
use bridgewatch_whep::{InboundStream, PlaybackError, PlaybackSink};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use webrtc::track::track_remote::TrackRemote;

/// Default interval between throughput reports per track
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(5);

/// Sink that drains inbound RTP and logs packet/byte counts
pub struct RtpDrainSink {
    signaling_url: Option<String>,
    report_interval: Duration,
    stream: Mutex<Option<InboundStream>>,
    /// Reader task per track id
    readers: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl RtpDrainSink {
    /// Create a sink, optionally overriding the signaling endpoint
    pub fn new(signaling_url: Option<String>) -> Self {
        Self {
            signaling_url,
            report_interval: DEFAULT_REPORT_INTERVAL,
            stream: Mutex::new(None),
            readers: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_report_interval(mut self, report_interval: Duration) -> Self {
        self.report_interval = report_interval;
        self
    }

    /// Currently bound stream
    pub fn stream(&self) -> Option<InboundStream> {
        self.stream.lock().clone()
    }

    /// Number of tracks being drained
    pub fn active_readers(&self) -> usize {
        self.readers
            .lock()
            .values()
            .filter(|handle| !handle.is_finished())
            .count()
    }

    /// Stop all readers
    pub fn shutdown(&self) {
        for (track_id, handle) in self.readers.lock().drain() {
            debug!("Stopping reader for track {}", track_id);
            handle.abort();
        }
    }
}

#[async_trait]
impl PlaybackSink for RtpDrainSink {
    fn signaling_url(&self) -> Option<String> {
        self.signaling_url.clone()
    }

    fn bind(&self, stream: InboundStream) {
        debug!("Bound inbound stream {}", stream.id());
        *self.stream.lock() = Some(stream);
    }

    async fn play(&self) -> Result<(), PlaybackError> {
        let stream = self.stream().ok_or(PlaybackError::NotBound)?;

        let mut readers = self.readers.lock();
        for track in stream.tracks() {
            if readers.contains_key(track.id()) {
                continue;
            }

            let Some(remote) = track.remote().cloned() else {
                debug!("Track {} has no RTP source", track.id());
                continue;
            };

            info!("Playing {} track {}", track.kind(), track.id());
            let handle = tokio::spawn(drain(
                remote,
                track.id().to_string(),
                self.report_interval,
            ));
            readers.insert(track.id().to_string(), handle);
        }

        Ok(())
    }
}

impl Drop for RtpDrainSink {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn drain(track: Arc<TrackRemote>, track_id: String, report_interval: Duration) {
    let mut packets: u64 = 0;
    let mut bytes: u64 = 0;
    let mut last_report = Instant::now();

    loop {
        match track.read_rtp().await {
            Ok((packet, _)) => {
                packets += 1;
                bytes += packet.payload.len() as u64;

                if last_report.elapsed() >= report_interval {
                    info!(track = %track_id, packets, bytes, "Receiving media");
                    last_report = Instant::now();
                }
            }
            Err(e) => {
                info!(
                    track = %track_id,
                    packets,
                    bytes,
                    "Track ended: {}",
                    e
                );
                return;
            }
        }
    }
}
