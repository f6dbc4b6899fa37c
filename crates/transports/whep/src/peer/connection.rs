//! WebRTC peer connection backed by webrtc-rs

use super::{
    advance_gathering, ConnectionFactory, GatheringState, PeerConnection, SessionDescription,
    TrackHandler,
};
use crate::config::WhepClientConfig;
use crate::media::{MediaKind, MediaTrack};
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, instrument};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::APIBuilder;
use webrtc::ice_transport::ice_connection_state::RTCIceConnectionState;
use webrtc::ice_transport::ice_gatherer_state::RTCIceGathererState;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection as WebRTCPeerConnection;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::rtp_transceiver::RTCRtpTransceiverInit;

/// Builds [`RtcPeerConnection`]s
#[derive(Debug, Clone, Default)]
pub struct RtcConnectionFactory {
    /// STUN/TURN URLs; empty means host candidates only
    ice_servers: Vec<String>,
}

impl RtcConnectionFactory {
    /// Create a factory with no ICE servers
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a factory using the ICE servers from a client config
    pub fn from_config(config: &WhepClientConfig) -> Self {
        Self {
            ice_servers: config.ice_servers.clone(),
        }
    }
}

#[async_trait]
impl ConnectionFactory for RtcConnectionFactory {
    async fn create_connection(&self) -> Result<Arc<dyn PeerConnection>> {
        let connection = RtcPeerConnection::new(&self.ice_servers).await?;
        Ok(Arc::new(connection))
    }
}

/// WebRTC peer connection wrapper
///
/// Publishes ICE gathering progress through a watch channel so any number of
/// waiters can observe it, and logs ICE/peer connection state changes.
pub struct RtcPeerConnection {
    /// Unique identifier for this connection instance
    connection_id: String,

    /// Actual WebRTC peer connection
    peer_connection: Arc<WebRTCPeerConnection>,

    /// Gathering state publisher (observers subscribe, never write)
    gathering_tx: Arc<watch::Sender<GatheringState>>,
}

impl RtcPeerConnection {
    /// Create a new peer connection
    ///
    /// # Arguments
    ///
    /// * `ice_servers` - STUN/TURN URLs; pass an empty slice for host candidates only
    #[instrument(skip(ice_servers))]
    pub async fn new(ice_servers: &[String]) -> Result<Self> {
        let connection_id = uuid::Uuid::new_v4().to_string();

        info!("Creating peer connection: connection_id={}", connection_id);

        let mut media_engine = MediaEngine::default();
        media_engine
            .register_default_codecs()
            .map_err(|e| Error::Environment(format!("Failed to register codecs: {}", e)))?;

        let interceptor_registry =
            register_default_interceptors(Default::default(), &mut media_engine).map_err(|e| {
                Error::Environment(format!("Failed to register interceptors: {}", e))
            })?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(interceptor_registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: ice_servers
                .iter()
                .map(|url| RTCIceServer {
                    urls: vec![url.clone()],
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };

        let peer_connection =
            Arc::new(api.new_peer_connection(rtc_config).await.map_err(|e| {
                Error::Environment(format!("Failed to create peer connection: {}", e))
            })?);

        let (gathering_tx, _) = watch::channel(GatheringState::New);
        let gathering_tx = Arc::new(gathering_tx);

        // Gathering progress
        let tx = Arc::clone(&gathering_tx);
        let id = connection_id.clone();
        peer_connection.on_ice_gathering_state_change(Box::new(
            move |state: RTCIceGathererState| {
                if let Some(next) = GatheringState::from_gatherer(state) {
                    if advance_gathering(&tx, next) {
                        debug!("Connection {} ICE gathering state: {:?}", id, next);
                    }
                }
                Box::pin(async {})
            },
        ));

        // Diagnostics only; these transitions never drive negotiation
        let id = connection_id.clone();
        peer_connection.on_ice_connection_state_change(Box::new(
            move |state: RTCIceConnectionState| {
                info!("Connection {} ICE connection state: {}", id, state);
                Box::pin(async {})
            },
        ));

        let id = connection_id.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |state: RTCPeerConnectionState| {
                info!("Connection {} peer connection state: {}", id, state);
                Box::pin(async {})
            },
        ));

        Ok(Self {
            connection_id,
            peer_connection,
            gathering_tx,
        })
    }

    /// Get the connection ID
    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }

    /// Get the underlying WebRTC peer connection
    pub fn peer_connection(&self) -> &Arc<WebRTCPeerConnection> {
        &self.peer_connection
    }
}

#[async_trait]
impl PeerConnection for RtcPeerConnection {
    async fn add_recvonly_transceiver(&self, kind: MediaKind) -> Result<()> {
        self.peer_connection
            .add_transceiver_from_kind(
                kind.into(),
                Some(RTCRtpTransceiverInit {
                    direction: RTCRtpTransceiverDirection::Recvonly,
                    send_encodings: vec![],
                }),
            )
            .await
            .map_err(|e| {
                Error::MediaTrack(format!("Failed to add {} transceiver: {}", kind, e))
            })?;

        debug!(
            "Connection {} added recvonly {} transceiver",
            self.connection_id, kind
        );

        Ok(())
    }

    fn on_track(&self, handler: TrackHandler) {
        let handler = Arc::new(handler);
        self.peer_connection
            .on_track(Box::new(move |track, _receiver, _transceiver| {
                let handler = Arc::clone(&handler);
                Box::pin(async move {
                    handler(MediaTrack::from_remote(track)).await;
                })
            }));
    }

    async fn create_offer(&self) -> Result<SessionDescription> {
        let offer = self
            .peer_connection
            .create_offer(None)
            .await
            .map_err(|e| Error::Sdp(format!("Failed to create offer: {}", e)))?;

        offer.try_into()
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<()> {
        let desc = RTCSessionDescription::try_from(desc)?;

        self.peer_connection
            .set_local_description(desc)
            .await
            .map_err(|e| Error::Sdp(format!("Failed to set local description: {}", e)))
    }

    async fn local_description(&self) -> Option<SessionDescription> {
        self.peer_connection
            .local_description()
            .await
            .and_then(|desc| desc.try_into().ok())
    }

    fn gathering_state(&self) -> GatheringState {
        *self.gathering_tx.borrow()
    }

    fn watch_gathering(&self) -> watch::Receiver<GatheringState> {
        self.gathering_tx.subscribe()
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()> {
        let desc = RTCSessionDescription::try_from(desc)?;

        self.peer_connection
            .set_remote_description(desc)
            .await
            .map_err(|e| Error::Sdp(format!("Failed to set remote description: {}", e)))
    }

    async fn close(&self) -> Result<()> {
        info!("Closing peer connection {}", self.connection_id);

        self.peer_connection
            .close()
            .await
            .map_err(|e| Error::WebRtc(format!("Failed to close connection: {}", e)))
    }
}
