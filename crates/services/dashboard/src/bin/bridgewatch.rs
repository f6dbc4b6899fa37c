//! Headless bridge monitor
//!
//! Checks for (or establishes) an admin session, polls the bridge state and
//! pulls the camera feed over WHEP until Ctrl+C.
//!
//! # Usage
//!
//! ```bash
//! # Watch a local monitor as an anonymous viewer
//! cargo run -p bridgewatch-dashboard --bin bridgewatch
//!
//! # Log in, use a dedicated media server endpoint, emit JSON logs
//! cargo run -p bridgewatch-dashboard --bin bridgewatch -- \
//!   --base-url http://bridge.local:8000 \
//!   --username admin --password secret \
//!   --webrtc-url http://bridge.local:8889/camera/whep \
//!   --log-format json
//! ```

use anyhow::Context;
use bridgewatch_dashboard::{
    AdminSession, ApiClient, BridgeStatus, RtpDrainSink, SessionClient, StatePoller,
    StatusTracker,
};
use bridgewatch_whep::{NegotiatedSession, Negotiator, WhepClientConfig};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Bridgewatch headless dashboard
///
/// Polls the bridge state and receives the camera feed.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Monitor base URL
    #[arg(long, default_value = "http://127.0.0.1:8000", env = "BRIDGEWATCH_BASE_URL")]
    base_url: String,

    /// WHEP endpoint override (path or absolute URL; default /camera/whep)
    #[arg(long, env = "BRIDGEWATCH_WEBRTC_URL")]
    webrtc_url: Option<String>,

    /// Admin username (login is skipped without credentials)
    #[arg(long, env = "BRIDGEWATCH_USERNAME")]
    username: Option<String>,

    /// Admin password
    #[arg(long, env = "BRIDGEWATCH_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Seconds between state fetches
    #[arg(long, default_value_t = 10, env = "BRIDGEWATCH_POLL_INTERVAL_SECS")]
    poll_interval_secs: u64,

    /// STUN/TURN servers (comma-separated; default none)
    #[arg(long, value_delimiter = ',', env = "BRIDGEWATCH_ICE_SERVERS")]
    ice_servers: Vec<String>,

    /// Do not pull the camera feed
    #[arg(long)]
    no_video: bool,

    /// Log output format
    #[arg(long, value_enum, default_value = "text", env = "BRIDGEWATCH_LOG_FORMAT")]
    log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per line
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_tracing(args.log_format);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        base_url = %args.base_url,
        "Bridgewatch starting"
    );

    let api = ApiClient::new(&args.base_url).context("invalid --base-url")?;
    let sessions = SessionClient::from_api(api.clone());
    let session = establish_session(&sessions, &args).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Ctrl+C received, shutting down"),
            Err(e) => error!("Failed to listen for Ctrl+C: {}; shutting down", e),
        }
        let _ = shutdown_tx.send(true);
    });

    let poller = StatePoller::new(api, Duration::from_secs(args.poll_interval_secs))?;
    let poll_shutdown = shutdown_rx.clone();
    let poll_task = tokio::spawn(async move {
        let mut tracker = StatusTracker::new();
        poller
            .run(
                move |status| report_status(&mut tracker, status),
                wait_for_shutdown(poll_shutdown),
            )
            .await;
    });

    let video = if args.no_video {
        None
    } else {
        tokio::select! {
            result = start_video(&args) => match result {
                Ok(video) => Some(video),
                Err(e) => {
                    error!("Unable to start camera feed: {:#}", e);
                    None
                }
            },
            _ = wait_for_shutdown(shutdown_rx.clone()) => None,
        }
    };

    wait_for_shutdown(shutdown_rx).await;

    if let Err(e) = poll_task.await {
        warn!("State poller task failed: {}", e);
    }

    if let Some((feed, sink)) = video {
        sink.shutdown();
        if let Err(e) = feed.close().await {
            warn!("Failed to close camera feed: {}", e);
        }
    }

    if let Some(session) = session {
        if let Err(e) = sessions.logout(session).await {
            warn!("Logout failed: {}", e);
        }
    }

    info!("Bridgewatch stopped");
    Ok(())
}

/// Reuse a session from the cookie store, or log in when credentials are given
async fn establish_session(
    sessions: &SessionClient,
    args: &Args,
) -> anyhow::Result<Option<AdminSession>> {
    let session = match sessions.current_session().await {
        Ok(Some(session)) => Some(session),
        Ok(None) => match (&args.username, &args.password) {
            (Some(username), Some(password)) => Some(
                sessions
                    .login(username, password)
                    .await
                    .context("admin login failed")?,
            ),
            _ => None,
        },
        Err(e) => {
            warn!("Could not check admin session: {}", e);
            None
        }
    };

    match &session {
        Some(session) => info!(
            username = %session.username(),
            role = %session.role(),
            "Admin session active"
        ),
        None => info!("No admin session; continuing as viewer"),
    }

    Ok(session)
}

async fn start_video(args: &Args) -> anyhow::Result<(NegotiatedSession, Arc<RtpDrainSink>)> {
    let config = WhepClientConfig::new(&args.base_url).with_ice_servers(args.ice_servers.clone());
    let negotiator = Negotiator::from_config(config)?;

    let sink = Arc::new(RtpDrainSink::new(args.webrtc_url.clone()));
    let feed = negotiator.negotiate(sink.clone()).await?;

    info!(
        endpoint = %feed.endpoint(),
        resource = ?feed.resource(),
        "Camera feed negotiated"
    );

    Ok((feed, sink))
}

fn report_status(tracker: &mut StatusTracker, status: Option<BridgeStatus>) {
    match status {
        Some(status) => {
            if tracker.observe(Some(&status)) {
                info!(
                    bridge_state = %status.bridge_state,
                    timestamp = %status.timestamp,
                    last_event_id = %status.last_event_id,
                    "Bridge state"
                );
            } else {
                debug!("Bridge state unchanged: {}", status.bridge_state);
            }
        }
        None => debug!("No bridge state recorded yet"),
    }
}

async fn wait_for_shutdown(mut shutdown: watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

fn init_tracing(format: LogFormat) {
    // Initialize tracing with EnvFilter for RUST_LOG support
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);
    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}
