//! Configuration types for the WHEP client

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Signaling path used when the playback sink declares no override
pub const DEFAULT_ENDPOINT: &str = "/camera/whep";

/// Main configuration for a WHEP negotiator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhepClientConfig {
    /// Origin that relative signaling paths are resolved against (http:// or https://)
    pub base_url: String,

    /// Signaling path or URL used when the sink has no override (default: /camera/whep)
    pub default_endpoint: String,

    /// STUN/TURN server URLs (default: none, host candidates only)
    pub ice_servers: Vec<String>,

    /// Timeout for each signaling HTTP request in seconds (default: 30)
    pub request_timeout_secs: u64,

    /// Log a warning each time ICE gathering has been pending this long (default: 10).
    /// The wait itself is never aborted.
    pub gathering_stall_warning_secs: Option<u64>,
}

impl Default for WhepClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            default_endpoint: DEFAULT_ENDPOINT.to_string(),
            ice_servers: Vec::new(),
            request_timeout_secs: 30,
            gathering_stall_warning_secs: Some(10),
        }
    }
}

impl WhepClientConfig {
    /// Create a configuration for the given origin with all other defaults
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            ..Default::default()
        }
    }

    /// Validate configuration parameters
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `base_url` is not an http:// or https:// URL
    /// - `default_endpoint` is empty
    /// - an ICE server URL is not a stun:, turn: or turns: URL
    /// - `request_timeout_secs` is zero
    pub fn validate(&self) -> crate::Result<()> {
        use crate::Error;

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(Error::InvalidConfig(format!(
                "base_url must start with http:// or https://, got {}",
                self.base_url
            )));
        }

        if self.default_endpoint.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "default_endpoint cannot be empty".to_string(),
            ));
        }

        for server in &self.ice_servers {
            if !["stun:", "turn:", "turns:"]
                .iter()
                .any(|scheme| server.starts_with(scheme))
            {
                return Err(Error::InvalidConfig(format!(
                    "ICE server must be a stun:, turn: or turns: URL, got {}",
                    server
                )));
            }
        }

        if self.request_timeout_secs == 0 {
            return Err(Error::InvalidConfig(
                "request_timeout_secs must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Timeout applied to each signaling request
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Interval between stall warnings while waiting on ICE gathering
    pub fn gathering_stall_warning(&self) -> Option<Duration> {
        self.gathering_stall_warning_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// Set the default signaling endpoint
    ///
    /// Useful for chaining with [`WhepClientConfig::new`].
    pub fn with_default_endpoint(mut self, endpoint: &str) -> Self {
        self.default_endpoint = endpoint.to_string();
        self
    }

    /// Set STUN/TURN servers
    pub fn with_ice_servers(mut self, ice_servers: Vec<String>) -> Self {
        self.ice_servers = ice_servers;
        self
    }

    /// Disable the ICE gathering stall warning
    pub fn without_stall_warning(mut self) -> Self {
        self.gathering_stall_warning_secs = None;
        self
    }
}
