//! Bridge state polling

use crate::client::ApiClient;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Current-state endpoint
pub const STATE_PATH: &str = "/api/v1/state";

/// Default interval between state fetches
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Position of the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BridgeState {
    /// Deck down, open to road traffic
    Closed,
    /// Raising
    Opening,
    /// Fully raised
    Open,
    /// Lowering
    Closing,
    /// Reported as UNKNOWN, or a value this client does not recognize
    #[serde(other)]
    Unknown,
}

impl BridgeState {
    /// Wire name of the state
    pub fn as_str(&self) -> &'static str {
        match self {
            BridgeState::Closed => "CLOSED",
            BridgeState::Opening => "OPENING",
            BridgeState::Open => "OPEN",
            BridgeState::Closing => "CLOSING",
            BridgeState::Unknown => "UNKNOWN",
        }
    }

    /// True while the bridge is moving
    pub fn is_transitioning(&self) -> bool {
        matches!(self, BridgeState::Opening | BridgeState::Closing)
    }
}

impl fmt::Display for BridgeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Latest recorded bridge state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeStatus {
    /// ID of the state record
    pub state_id: String,
    /// Bridge position
    pub bridge_state: BridgeState,
    /// When the state was recorded
    #[serde(with = "crate::timestamp")]
    pub timestamp: DateTime<Utc>,
    /// Event that produced this state
    pub last_event_id: String,
}

/// Tracks the last seen bridge state to report only changes
#[derive(Debug, Default)]
pub struct StatusTracker {
    last: Option<BridgeState>,
}

impl StatusTracker {
    /// Tracker that has seen nothing yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a poll result; returns `true` if the bridge state changed
    ///
    /// An empty result (no state recorded yet) never counts as a change.
    pub fn observe(&mut self, status: Option<&BridgeStatus>) -> bool {
        match status {
            Some(status) if self.last != Some(status.bridge_state) => {
                self.last = Some(status.bridge_state);
                true
            }
            _ => false,
        }
    }

    /// Last reported bridge state
    pub fn last(&self) -> Option<BridgeState> {
        self.last
    }
}

/// Periodic fetcher of the current bridge state
#[derive(Debug, Clone)]
pub struct StatePoller {
    api: ApiClient,
    interval: Duration,
}

impl StatePoller {
    /// Create a poller
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `interval` is zero.
    pub fn new(api: ApiClient, interval: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(Error::InvalidConfig(
                "poll interval must be greater than 0".to_string(),
            ));
        }

        Ok(Self { api, interval })
    }

    /// Time between fetches
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Fetch the current state once
    ///
    /// `Ok(None)` means the service has no state recorded yet.
    pub async fn fetch(&self) -> Result<Option<BridgeStatus>> {
        let url = self.api.endpoint(STATE_PATH)?;
        let response = self.api.http().get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::unexpected(status));
        }

        Ok(response.json().await?)
    }

    /// Poll until `shutdown` resolves
    ///
    /// Fetches immediately, then once per interval. Each successful fetch is
    /// passed to `handler`; failures are logged and polling continues. A
    /// fetch still in flight when `shutdown` resolves is dropped.
    pub async fn run<F, S>(&self, mut handler: F, shutdown: S)
    where
        F: FnMut(Option<BridgeStatus>),
        S: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!("Polling bridge state every {:?}", self.interval);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {}
            }

            // A fetch in flight is abandoned on shutdown
            tokio::select! {
                _ = &mut shutdown => break,
                result = self.fetch() => match result {
                    Ok(status) => {
                        debug!("Fetched bridge state: {:?}", status);
                        handler(status);
                    }
                    Err(e) => warn!("Error fetching bridge status: {}", e),
                },
            }
        }

        info!("State poller stopped");
    }
}
