//! Negotiation test harness
//!
//! Provides scriptable stand-ins for every collaborator of the negotiator:
//! - `SpyConnection`: records every call, replays a scripted ICE gathering sequence
//!   and can fail a chosen step (`FailingStep`)
//! - `SpyFactory`: hands out one `SpyConnection` (or fails)
//! - `SpySignaling`: answers with a scripted SDP or status and records what it saw
//! - `RecordingSink`: records bound streams and playback requests
//!
//! Basic usage pattern:
//!
//! 1. Build a `SpyConnection` with a `GatheringScript`
//! 2. Wrap it in `SpyFactory` / `SpySignaling` and build a `Negotiator`
//! 3. Negotiate against a `RecordingSink`
//! 4. Assert on the recorded events

#![allow(dead_code)]

use async_trait::async_trait;
use bridgewatch_whep::peer::advance_gathering;
use bridgewatch_whep::{
    ConnectionFactory, Error, GatheringState, InboundStream, MediaKind, MediaTrack, Negotiator,
    PeerConnection, PlaybackError, PlaybackSink, Result, SessionDescription, SignalingAnswer,
    SignalingTransport, TrackHandler, WhepClientConfig,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Offer produced by every `SpyConnection`
pub const SPY_OFFER: &str = "v=0\r\no=- 1 1 IN IP4 0.0.0.0\r\ns=-\r\nt=0 0\r\nm=video 9 UDP/TLS/RTP/SAVPF 96\r\na=recvonly\r\n";

/// Candidate line appended to the local description once gathering completes
pub const SPY_CANDIDATE: &str = "a=candidate:1 1 udp 2130706431 192.0.2.1 50000 typ host\r\n";

/// Answer returned by `SpySignaling` unless scripted otherwise
pub const SPY_ANSWER: &str = "v=0\r\no=- 2 2 IN IP4 0.0.0.0\r\ns=-\r\nt=0 0\r\nm=video 9 UDP/TLS/RTP/SAVPF 96\r\na=sendonly\r\n";

/// Call recorded by the spies
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    AddTransceiver(MediaKind),
    CreateOffer,
    SetLocal(SessionDescription),
    Gathering(GatheringState),
    Exchange(String),
    SetRemote(SessionDescription),
    Close,
}

/// Shared, ordered event log
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<Event>>>);

impl EventLog {
    pub fn push(&self, event: Event) {
        self.0.lock().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.lock().clone()
    }

    pub fn count(&self, predicate: impl Fn(&Event) -> bool) -> usize {
        self.0.lock().iter().filter(|e| predicate(e)).count()
    }

    pub fn position(&self, predicate: impl Fn(&Event) -> bool) -> Option<usize> {
        self.0.lock().iter().position(|e| predicate(e))
    }
}

/// How ICE gathering proceeds once the local description is set
#[derive(Debug, Clone)]
pub enum GatheringScript {
    /// Gathering is already complete before negotiation starts
    AlreadyComplete,
    /// States published synchronously inside `set_local_description`
    Immediate(Vec<GatheringState>),
    /// States published from a background task, `step` apart
    Delayed {
        states: Vec<GatheringState>,
        step: Duration,
    },
    /// Gathering starts and never finishes
    Never,
}

/// Peer connection step that reports an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailingStep {
    CreateOffer,
    SetLocal,
    SetRemote,
}

/// Scriptable peer connection
pub struct SpyConnection {
    events: EventLog,
    script: GatheringScript,
    failing: Option<FailingStep>,
    gathering_tx: Arc<watch::Sender<GatheringState>>,
    local: Mutex<Option<SessionDescription>>,
    handler: Mutex<Option<Arc<TrackHandler>>>,
}

impl SpyConnection {
    pub fn new(events: EventLog, script: GatheringScript) -> Arc<Self> {
        Self::build(events, script, None)
    }

    /// Connection whose `step` rejects its input
    pub fn failing(events: EventLog, script: GatheringScript, step: FailingStep) -> Arc<Self> {
        Self::build(events, script, Some(step))
    }

    fn build(events: EventLog, script: GatheringScript, failing: Option<FailingStep>) -> Arc<Self> {
        let initial = match script {
            GatheringScript::AlreadyComplete => GatheringState::Complete,
            _ => GatheringState::New,
        };
        let (gathering_tx, _) = watch::channel(initial);

        Arc::new(Self {
            events,
            script,
            failing,
            gathering_tx: Arc::new(gathering_tx),
            local: Mutex::new(None),
            handler: Mutex::new(None),
        })
    }

    /// Currently registered gathering observers
    pub fn observers(&self) -> usize {
        self.gathering_tx.receiver_count()
    }

    /// Deliver a track as if it arrived from the remote peer
    pub async fn deliver_track(&self, track: MediaTrack) {
        let handler = self.handler.lock().clone();
        if let Some(handler) = handler {
            handler(track).await;
        }
    }

    fn publish(events: &EventLog, tx: &watch::Sender<GatheringState>, state: GatheringState) {
        events.push(Event::Gathering(state));
        advance_gathering(tx, state);
    }
}

#[async_trait]
impl PeerConnection for SpyConnection {
    async fn add_recvonly_transceiver(&self, kind: MediaKind) -> Result<()> {
        self.events.push(Event::AddTransceiver(kind));
        Ok(())
    }

    fn on_track(&self, handler: TrackHandler) {
        *self.handler.lock() = Some(Arc::new(handler));
    }

    async fn create_offer(&self) -> Result<SessionDescription> {
        self.events.push(Event::CreateOffer);
        if self.failing == Some(FailingStep::CreateOffer) {
            return Err(Error::Sdp("offer creation failed".to_string()));
        }
        Ok(SessionDescription::offer(SPY_OFFER))
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<()> {
        self.events.push(Event::SetLocal(desc.clone()));
        if self.failing == Some(FailingStep::SetLocal) {
            return Err(Error::Sdp("local description rejected".to_string()));
        }
        *self.local.lock() = Some(desc);

        match &self.script {
            GatheringScript::AlreadyComplete => {}
            GatheringScript::Immediate(states) => {
                for state in states {
                    Self::publish(&self.events, &self.gathering_tx, *state);
                }
            }
            GatheringScript::Delayed { states, step } => {
                let events = self.events.clone();
                let tx = Arc::clone(&self.gathering_tx);
                let states = states.clone();
                let step = *step;
                tokio::spawn(async move {
                    for state in states {
                        tokio::time::sleep(step).await;
                        Self::publish(&events, &tx, state);
                    }
                });
            }
            GatheringScript::Never => {
                Self::publish(&self.events, &self.gathering_tx, GatheringState::Gathering);
            }
        }

        Ok(())
    }

    async fn local_description(&self) -> Option<SessionDescription> {
        let local = self.local.lock().clone()?;
        if self.gathering_state().is_complete() {
            Some(SessionDescription::offer(format!("{}{}", local.sdp, SPY_CANDIDATE)))
        } else {
            Some(local)
        }
    }

    fn gathering_state(&self) -> GatheringState {
        *self.gathering_tx.borrow()
    }

    fn watch_gathering(&self) -> watch::Receiver<GatheringState> {
        self.gathering_tx.subscribe()
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()> {
        self.events.push(Event::SetRemote(desc));
        if self.failing == Some(FailingStep::SetRemote) {
            return Err(Error::Sdp("remote description rejected".to_string()));
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.events.push(Event::Close);
        Ok(())
    }
}

/// Factory handing out a single spy connection
pub struct SpyFactory {
    connection: Option<Arc<SpyConnection>>,
    created: AtomicUsize,
}

impl SpyFactory {
    pub fn new(connection: Arc<SpyConnection>) -> Self {
        Self {
            connection: Some(connection),
            created: AtomicUsize::new(0),
        }
    }

    /// Factory whose runtime cannot construct a connection
    pub fn unavailable() -> Self {
        Self {
            connection: None,
            created: AtomicUsize::new(0),
        }
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectionFactory for SpyFactory {
    async fn create_connection(&self) -> Result<Arc<dyn PeerConnection>> {
        match &self.connection {
            Some(connection) => {
                self.created.fetch_add(1, Ordering::SeqCst);
                let connection: Arc<dyn PeerConnection> = connection.clone();
                Ok(connection)
            }
            None => Err(Error::Environment("RTCPeerConnection unavailable".to_string())),
        }
    }
}

/// Scripted signaling reply
#[derive(Debug, Clone)]
pub enum Reply {
    Answer(SignalingAnswer),
    Status(u16, String),
}

/// Exchange observed by `SpySignaling`
#[derive(Debug, Clone)]
pub struct ExchangeCall {
    pub endpoint: String,
    pub offer_sdp: String,
    /// Gathering state of the connection at the moment of the call
    pub gathering: GatheringState,
}

/// Signaling transport with a scripted reply
pub struct SpySignaling {
    events: EventLog,
    connection: Arc<SpyConnection>,
    reply: Reply,
    calls: Mutex<Vec<ExchangeCall>>,
    teardowns: Mutex<Vec<String>>,
}

impl SpySignaling {
    pub fn new(events: EventLog, connection: Arc<SpyConnection>, reply: Reply) -> Self {
        Self {
            events,
            connection,
            reply,
            calls: Mutex::new(Vec::new()),
            teardowns: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<ExchangeCall> {
        self.calls.lock().clone()
    }

    pub fn teardowns(&self) -> Vec<String> {
        self.teardowns.lock().clone()
    }
}

#[async_trait]
impl SignalingTransport for SpySignaling {
    async fn exchange(&self, endpoint: &str, offer_sdp: &str) -> Result<SignalingAnswer> {
        self.events.push(Event::Exchange(endpoint.to_string()));
        self.calls.lock().push(ExchangeCall {
            endpoint: endpoint.to_string(),
            offer_sdp: offer_sdp.to_string(),
            gathering: self.connection.gathering_state(),
        });

        match &self.reply {
            Reply::Answer(answer) => Ok(answer.clone()),
            Reply::Status(status, reason) => Err(Error::Signaling {
                status: *status,
                reason: reason.clone(),
            }),
        }
    }

    async fn teardown(&self, resource: &str) -> Result<()> {
        self.teardowns.lock().push(resource.to_string());
        Ok(())
    }
}

/// Sink that records what the negotiator asked of it
#[derive(Default)]
pub struct RecordingSink {
    url: Option<String>,
    reject_play: bool,
    bound: Mutex<Vec<InboundStream>>,
    plays: AtomicUsize,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_url(url: &str) -> Arc<Self> {
        Arc::new(Self {
            url: Some(url.to_string()),
            ..Default::default()
        })
    }

    /// Sink that refuses every `play` (autoplay blocked)
    pub fn blocking() -> Arc<Self> {
        Arc::new(Self {
            reject_play: true,
            ..Default::default()
        })
    }

    pub fn bound(&self) -> Vec<InboundStream> {
        self.bound.lock().clone()
    }

    pub fn plays(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlaybackSink for RecordingSink {
    fn signaling_url(&self) -> Option<String> {
        self.url.clone()
    }

    fn bind(&self, stream: InboundStream) {
        self.bound.lock().push(stream);
    }

    async fn play(&self) -> std::result::Result<(), PlaybackError> {
        self.plays.fetch_add(1, Ordering::SeqCst);
        if self.reject_play {
            Err(PlaybackError::Blocked("autoplay disabled".to_string()))
        } else {
            Ok(())
        }
    }
}

/// A complete set of spies wired into a negotiator
pub struct Fixture {
    pub events: EventLog,
    pub connection: Arc<SpyConnection>,
    pub factory: Arc<SpyFactory>,
    pub signaling: Arc<SpySignaling>,
    pub negotiator: Negotiator,
}

impl Fixture {
    pub fn new(script: GatheringScript, reply: Reply) -> Self {
        Self::with_connection(EventLog::default(), script, reply, None)
    }

    /// Like `answering`, but `step` of the peer connection fails
    pub fn failing_at(step: FailingStep, reply: Reply) -> Self {
        Self::with_connection(
            EventLog::default(),
            GatheringScript::Delayed {
                states: vec![GatheringState::Gathering, GatheringState::Complete],
                step: Duration::from_millis(5),
            },
            reply,
            Some(step),
        )
    }

    fn with_connection(
        events: EventLog,
        script: GatheringScript,
        reply: Reply,
        failing: Option<FailingStep>,
    ) -> Self {
        let connection = match failing {
            Some(step) => SpyConnection::failing(events.clone(), script, step),
            None => SpyConnection::new(events.clone(), script),
        };
        let factory = Arc::new(SpyFactory::new(Arc::clone(&connection)));
        let signaling = Arc::new(SpySignaling::new(
            events.clone(),
            Arc::clone(&connection),
            reply,
        ));

        let negotiator = Negotiator::new(
            WhepClientConfig::default(),
            factory.clone(),
            signaling.clone(),
        );

        Self {
            events,
            connection,
            factory,
            signaling,
            negotiator,
        }
    }

    /// Gathering completes shortly after the local description is set; answer is `SPY_ANSWER`
    pub fn answering() -> Self {
        Self::new(
            GatheringScript::Delayed {
                states: vec![GatheringState::Gathering, GatheringState::Complete],
                step: Duration::from_millis(5),
            },
            Reply::Answer(SignalingAnswer::new(SPY_ANSWER)),
        )
    }
}

/// Install a test log subscriber (idempotent)
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}
