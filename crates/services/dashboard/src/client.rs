//! Shared HTTP client for the bridge monitor API

use crate::error::{Error, Result};
use std::time::Duration;
use url::Url;

/// Timeout applied to every API request
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client bound to one bridge monitor origin
///
/// Clones share the connection pool and the cookie store, so a session
/// established through one clone is visible to all of them.
#[derive(Debug, Clone)]
pub struct ApiClient {
    /// Base URL (e.g., "http://127.0.0.1:8000")
    base_url: Url,

    /// Reqwest HTTP client with cookie store
    http: reqwest::Client,
}

impl ApiClient {
    /// Create a new API client
    ///
    /// # Arguments
    ///
    /// * `base_url` - Server base URL (e.g., "http://localhost:8000")
    pub fn new(base_url: &str) -> Result<Self> {
        if base_url.is_empty() {
            return Err(Error::InvalidUrl("base_url cannot be empty".to_string()));
        }

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(Error::InvalidUrl(format!(
                "base_url must start with http:// or https://, got: {}",
                base_url
            )));
        }

        let base_url =
            Url::parse(base_url).map_err(|e| Error::InvalidUrl(format!("{}: {}", base_url, e)))?;

        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self { base_url, http })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Underlying HTTP client
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Resolve an API path against the base URL
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::InvalidUrl(format!("{}: {}", path, e)))
    }
}
