//! End-to-end negotiation against a local WHEP endpoint backed by webrtc-rs

mod harness;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use bridgewatch_whep::{
    NegotiationState, Negotiator, PeerConnection, RtcPeerConnection, SessionDescription,
    WhepClientConfig,
};
use harness::{init_logging, RecordingSink};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use webrtc::api::media_engine::MIME_TYPE_VP8;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_local::TrackLocal;

/// Server-side peers kept alive for the duration of a test
type Publishers = Arc<Mutex<Vec<Arc<RtcPeerConnection>>>>;

/// Answer a recvonly offer with a sendonly VP8 track
async fn publish(
    State(publishers): State<Publishers>,
    offer: String,
) -> Result<(StatusCode, String), (StatusCode, String)> {
    let internal = |e: bridgewatch_whep::Error| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string());

    let publisher = Arc::new(RtcPeerConnection::new(&[]).await.map_err(internal)?);

    let track = Arc::new(TrackLocalStaticSample::new(
        RTCRtpCodecCapability {
            mime_type: MIME_TYPE_VP8.to_owned(),
            clock_rate: 90000,
            ..Default::default()
        },
        "video-0".to_owned(),
        "camera".to_owned(),
    ));
    publisher
        .peer_connection()
        .add_track(track as Arc<dyn TrackLocal + Send + Sync>)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    publisher
        .set_remote_description(SessionDescription::offer(offer))
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let answer = publisher
        .peer_connection()
        .create_answer(None)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let mut gathered = publisher.peer_connection().gathering_complete_promise().await;
    publisher
        .peer_connection()
        .set_local_description(answer)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let _ = gathered.recv().await;

    let local = publisher
        .local_description()
        .await
        .ok_or_else(|| (StatusCode::INTERNAL_SERVER_ERROR, "no answer".to_string()))?;

    publishers.lock().push(publisher);

    Ok((StatusCode::CREATED, local.sdp))
}

async fn spawn_endpoint() -> (String, Publishers) {
    let publishers = Publishers::default();
    let app = Router::new()
        .route("/camera/whep", post(publish))
        .with_state(publishers.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), publishers)
}

#[tokio::test]
async fn test_negotiates_with_webrtc_endpoint() {
    init_logging();
    let (base_url, publishers) = spawn_endpoint().await;

    let negotiator = Negotiator::from_config(WhepClientConfig::new(&base_url)).unwrap();
    let sink = RecordingSink::new();

    let (result, history) = tokio::time::timeout(
        Duration::from_secs(30),
        negotiator.negotiate_traced(sink.clone()),
    )
    .await
    .expect("negotiation timed out");

    let session = result.unwrap();
    assert_eq!(history.last(), Some(&NegotiationState::AnswerApplied));
    assert_eq!(session.endpoint(), "/camera/whep");
    assert_eq!(sink.bound().len(), 1);

    let offer = session.connection().local_description().await.unwrap();
    assert!(offer.sdp.contains("m=video"));
    assert!(offer.sdp.contains("a=recvonly"));

    session.close().await.unwrap();

    let publishers: Vec<_> = publishers.lock().drain(..).collect();
    for publisher in publishers {
        publisher.close().await.unwrap();
    }
}
