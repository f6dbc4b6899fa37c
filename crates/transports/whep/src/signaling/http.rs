//! HTTP signaling client

use super::{SignalingAnswer, SignalingTransport};
use crate::config::WhepClientConfig;
use crate::{Error, Result};
use async_trait::async_trait;
use hyper::ext::ReasonPhrase;
use hyper::http::Extensions;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::StatusCode;
use tracing::{debug, info, warn};
use url::Url;

/// Content type of offer and answer bodies
pub const SDP_CONTENT_TYPE: &str = "application/sdp";

/// WHEP signaling over HTTP
///
/// Relative endpoints (e.g. `/camera/whep`) are resolved against the base URL;
/// absolute endpoints are used as given.
#[derive(Debug, Clone)]
pub struct HttpSignaling {
    /// Origin for relative endpoints
    base_url: Url,

    /// Reqwest HTTP client
    client: reqwest::Client,
}

impl HttpSignaling {
    /// Create a new HTTP signaling client
    ///
    /// # Arguments
    ///
    /// * `base_url` - Origin relative endpoints are resolved against (e.g. "http://localhost:8000")
    /// * `timeout` - Per-request timeout
    pub fn new(base_url: &str, timeout: std::time::Duration) -> Result<Self> {
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(Error::InvalidConfig(format!(
                "Signaling base_url must start with http:// or https://, got: {}",
                base_url
            )));
        }

        let base_url = Url::parse(base_url)
            .map_err(|e| Error::InvalidConfig(format!("Invalid base_url {}: {}", base_url, e)))?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Environment(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { base_url, client })
    }

    /// Create a client from a WHEP client configuration
    pub fn from_config(config: &WhepClientConfig) -> Result<Self> {
        Self::new(&config.base_url, config.request_timeout())
    }

    /// Resolve an endpoint path or URL to an absolute URL
    pub fn resolve(&self, endpoint: &str) -> Result<Url> {
        match Url::parse(endpoint) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => self
                .base_url
                .join(endpoint)
                .map_err(|e| Error::InvalidConfig(format!("Invalid endpoint {}: {}", endpoint, e))),
            Err(e) => Err(Error::InvalidConfig(format!(
                "Invalid endpoint {}: {}",
                endpoint, e
            ))),
        }
    }

    /// Error for a non-success response
    ///
    /// hyper keeps the reason phrase in the response extensions only when it
    /// differs from the canonical one.
    fn status_error(status: StatusCode, extensions: &Extensions) -> Error {
        let sent = extensions
            .get::<ReasonPhrase>()
            .and_then(|phrase| std::str::from_utf8(phrase.as_bytes()).ok());

        Error::Signaling {
            status: status.as_u16(),
            reason: sent
                .or_else(|| status.canonical_reason())
                .unwrap_or("Unknown")
                .to_string(),
        }
    }
}

#[async_trait]
impl SignalingTransport for HttpSignaling {
    async fn exchange(&self, endpoint: &str, offer_sdp: &str) -> Result<SignalingAnswer> {
        let url = self.resolve(endpoint)?;

        debug!("POST offer ({} bytes) to {}", offer_sdp.len(), url);

        let response = self
            .client
            .post(url.clone())
            .header(CONTENT_TYPE, SDP_CONTENT_TYPE)
            .body(offer_sdp.to_owned())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let err = Self::status_error(status, response.extensions());
            warn!("Signaling endpoint {} rejected the offer: {}", url, err);
            return Err(err);
        }

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| match url.join(value) {
                // Some proxies point Location back at the endpoint itself
                Ok(resolved) if resolved == url => {
                    debug!("Location names the signaling endpoint; no session resource");
                    None
                }
                Ok(resolved) => Some(resolved.to_string()),
                Err(e) => {
                    warn!("Ignoring unparseable Location header {:?}: {}", value, e);
                    None
                }
            });

        let sdp = response.text().await?;

        info!(
            "Signaling endpoint {} answered {} ({} bytes of SDP)",
            url,
            status,
            sdp.len()
        );

        Ok(SignalingAnswer { sdp, location })
    }

    async fn teardown(&self, resource: &str) -> Result<()> {
        let url = self.resolve(resource)?;

        debug!("DELETE session resource {}", url);

        let response = self.client.delete(url).send().await?;
        let status = response.status();

        // The resource may already be gone on the server side
        if status.is_success() || status == StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(Self::status_error(status, response.extensions()))
        }
    }
}
