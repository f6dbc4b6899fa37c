//! Admin session service client
//!
//! The service authenticates with an `admin_session` cookie set by
//! `POST /api/v1/admin/login`. The cookie lives in the [`ApiClient`]'s cookie
//! store; callers hold the resulting [`AdminSession`] value and hand it back
//! to [`SessionClient::logout`].

use crate::client::ApiClient;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

/// Login endpoint
pub const LOGIN_PATH: &str = "/api/v1/admin/login";

/// Logout endpoint
pub const LOGOUT_PATH: &str = "/api/v1/admin/logout";

/// Current-admin endpoint
pub const CURRENT_ADMIN_PATH: &str = "/api/v1/admin/me";

const REJECTED_DETAIL: &str = "Invalid username or password";

/// Admin permission level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AdminRole {
    /// Read-only access
    Viewer,
    /// May modify bridge data
    Editor,
    /// Full access, including admin user management
    Admin,
}

impl AdminRole {
    /// Role name as sent by the service
    pub fn as_str(&self) -> &'static str {
        match self {
            AdminRole::Viewer => "VIEWER",
            AdminRole::Editor => "EDITOR",
            AdminRole::Admin => "ADMIN",
        }
    }

    /// Editors and admins may change bridge data
    pub fn can_edit(&self) -> bool {
        matches!(self, AdminRole::Editor | AdminRole::Admin)
    }

    /// Only admins may manage other admin accounts
    pub fn can_manage_admins(&self) -> bool {
        matches!(self, AdminRole::Admin)
    }
}

impl fmt::Display for AdminRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_active() -> bool {
    true
}

/// Admin account as reported by the service
///
/// The login response only carries `id`, `username` and `role`; the
/// current-admin endpoint adds the timestamps and the active flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminProfile {
    /// Account ID
    pub id: i64,
    /// Login name
    pub username: String,
    /// Permission level
    pub role: AdminRole,
    /// Account creation time
    #[serde(default, with = "crate::timestamp::option")]
    pub created_at: Option<DateTime<Utc>>,
    /// Last profile update
    #[serde(default, with = "crate::timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Previous successful login, if any
    #[serde(default, with = "crate::timestamp::option")]
    pub last_login_at: Option<DateTime<Utc>>,
    /// Disabled accounts cannot log in
    #[serde(default = "default_active")]
    pub is_active: bool,
}

/// An authenticated admin session
///
/// Obtained from [`SessionClient::login`] or [`SessionClient::current_session`]
/// and consumed by [`SessionClient::logout`].
#[derive(Debug, Clone, PartialEq)]
pub struct AdminSession {
    profile: AdminProfile,
}

impl AdminSession {
    /// Full profile of the logged-in admin
    pub fn profile(&self) -> &AdminProfile {
        &self.profile
    }

    /// Login name of the logged-in admin
    pub fn username(&self) -> &str {
        &self.profile.username
    }

    /// Permission level of the logged-in admin
    pub fn role(&self) -> AdminRole {
        self.profile.role
    }
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    message: String,
    admin: AdminProfile,
}

/// Error body; `detail` is a string for auth failures and a list for validation failures
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<serde_json::Value>,
}

/// Client for the admin session endpoints
#[derive(Debug, Clone)]
pub struct SessionClient {
    api: ApiClient,
}

impl SessionClient {
    /// Create a session client with its own cookie store
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self::from_api(ApiClient::new(base_url)?))
    }

    /// Create a session client sharing an existing API client (and its cookies)
    pub fn from_api(api: ApiClient) -> Self {
        Self { api }
    }

    /// Underlying API client
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Look up the session held by the cookie store, if any
    ///
    /// Any non-success status means "not logged in".
    pub async fn current_session(&self) -> Result<Option<AdminSession>> {
        let url = self.api.endpoint(CURRENT_ADMIN_PATH)?;
        let response = self.api.http().get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            debug!("No active admin session ({})", status);
            return Ok(None);
        }

        let profile: AdminProfile = response.json().await?;
        debug!("Active admin session for {}", profile.username);

        Ok(Some(AdminSession { profile }))
    }

    /// Log in and store the session cookie
    ///
    /// # Errors
    ///
    /// Returns [`Error::LoginRejected`] with the service's `detail` (or a
    /// generic message) when the service answers with an error status.
    pub async fn login(&self, username: &str, password: &str) -> Result<AdminSession> {
        let url = self.api.endpoint(LOGIN_PATH)?;
        let response = self
            .api
            .http()
            .post(url)
            .json(&LoginRequest { username, password })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|body| body.detail)
                .and_then(|detail| detail.as_str().map(str::to_string))
                .unwrap_or_else(|| REJECTED_DETAIL.to_string());

            warn!("Login for {} rejected: {} {}", username, status.as_u16(), detail);

            return Err(Error::LoginRejected {
                status: status.as_u16(),
                detail,
            });
        }

        let body: LoginResponse = response.json().await?;
        info!(
            username = %body.admin.username,
            role = %body.admin.role,
            message = %body.message,
            "Admin login accepted"
        );

        Ok(AdminSession {
            profile: body.admin,
        })
    }

    /// End the session
    ///
    /// The session is considered ended even if the service answers with an
    /// error status; that case is only logged.
    pub async fn logout(&self, session: AdminSession) -> Result<()> {
        let url = self.api.endpoint(LOGOUT_PATH)?;
        let response = self.api.http().post(url).send().await?;

        let status = response.status();
        if status.is_success() {
            info!("Logged out {}", session.username());
        } else {
            warn!("Logout for {} answered {}", session.username(), status);
        }

        Ok(())
    }
}
