//! Bridge monitor dashboard clients
//!
//! Client-side counterparts of the bridge monitor dashboard:
//!
//! - [`SessionClient`]: admin login/logout and current-session lookup
//! - [`StatePoller`]: periodic `GET /api/v1/state`
//! - [`RtpDrainSink`]: headless playback sink for the WHEP camera feed
//!
//! # Example
//!
//! ```no_run
//! use bridgewatch_dashboard::{ApiClient, SessionClient, StatePoller, DEFAULT_POLL_INTERVAL};
//!
//! # async fn example() -> bridgewatch_dashboard::Result<()> {
//! let api = ApiClient::new("http://127.0.0.1:8000")?;
//!
//! let sessions = SessionClient::from_api(api.clone());
//! let session = sessions.login("admin", "secret").await?;
//! println!("{} ({})", session.username(), session.role());
//!
//! let poller = StatePoller::new(api, DEFAULT_POLL_INTERVAL)?;
//! if let Some(status) = poller.fetch().await? {
//!     println!("bridge is {}", status.bridge_state);
//! }
//!
//! sessions.logout(session).await?;
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all)]

pub mod client;
pub mod error;
pub mod session;
pub mod state;
pub mod timestamp;
pub mod viewer;

pub use client::ApiClient;
pub use error::{Error, Result};
pub use session::{AdminProfile, AdminRole, AdminSession, SessionClient};
pub use state::{BridgeState, BridgeStatus, StatePoller, StatusTracker, DEFAULT_POLL_INTERVAL};
pub use viewer::RtpDrainSink;

/// Get the version of this crate
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
