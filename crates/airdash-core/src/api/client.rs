//! HTTP client for the dashboard's auth, profile and favorites endpoints.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Method, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info, warn};
use url::Url;

use super::envelope::{decode, decode_nested, unwrap_envelope};
use super::error::{ApiError, Endpoint};
use crate::config::Config;
use crate::models::{
    AccountState, Credential, PasswordUpdate, ProfileUpdate, RecentCity, RegisterRequest, Role,
    Session, StatusEvent, StatusReport, StoredAuth,
};
use crate::store::{RecentStore, TokenStore};

const USER_AGENT: &str = concat!("airdash/", env!("CARGO_PKG_VERSION"));

/// Error message used when an authenticated call is attempted without a credential.
pub const NO_TOKEN_MESSAGE: &str = "Không có token";

#[derive(Deserialize)]
struct SignInData {
    token: String,
    user: Session,
}

/// Client for the session-related REST endpoints.
///
/// Owns the only write path to the credential store: sign-in persists the
/// credential before returning, and a 401 on an authenticated call removes
/// the credential that was used for it.
#[derive(Debug, Clone)]
pub struct SessionClient {
    http: reqwest::Client,
    base_url: Url,
    tokens: TokenStore,
    recent: RecentStore,
}

impl SessionClient {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        tokens: TokenStore,
        recent: RecentStore,
    ) -> Result<Self> {
        let base_url =
            Url::parse(base_url).with_context(|| format!("Invalid API base URL: {base_url}"))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("API base URL cannot have paths appended: {base_url}");
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url,
            tokens,
            recent,
        })
    }

    /// Client for the configured API, using the stores under `AIRDASH_HOME`.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.resolved_api_base_url()?,
            config.request_timeout(),
            TokenStore::at_default_path(),
            RecentStore::at_default_path(),
        )
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn recent(&self) -> &RecentStore {
        &self.recent
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Reads the persisted credential and profile, if any.
    pub fn restore(&self) -> Option<StoredAuth> {
        self.tokens.read()
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<StoredAuth, ApiError> {
        let request = self
            .http
            .post(self.url(&["auth", "login"]))
            .json(&json!({ "email": email.trim(), "password": password }));
        let data = self.send(request, Endpoint::SignIn).await?;
        let SignInData { token, user } = decode(data, "login response")?;
        self.establish(token, user)
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<(), ApiError> {
        let request = self
            .http
            .post(self.url(&["auth", "register"]))
            .json(request);
        self.send(request, Endpoint::Public).await.map(drop)
    }

    /// Clears the credential and the recently viewed list.
    ///
    /// Purely local; both stores are attempted even if the first fails.
    pub fn logout(&self) -> Result<()> {
        let tokens = self.tokens.clear();
        let recent = self.recent.clear();
        tokens.and(recent)
    }

    /// Completes a Google sign-in with the token handed back by the redirect.
    pub async fn handle_google_callback(&self, token: &str) -> Result<StoredAuth, ApiError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(ApiError::InvalidCredentials(
                "missing token in Google callback".to_string(),
            ));
        }

        let request = self.http.get(self.url(&["auth", "me"])).bearer_auth(token);
        let data = self.send(request, Endpoint::SignIn).await?;
        let user = decode_nested(data, "user", "profile")?;
        self.establish(token.to_string(), user)
    }

    /// Where the browser must be sent to start a Google sign-in.
    pub fn google_auth_url(&self) -> String {
        self.url(&["auth", "google"]).to_string()
    }

    pub async fn fetch_profile(&self) -> Result<Session, ApiError> {
        let data = self
            .send_authed(Method::GET, &["auth", "me"], None, Endpoint::Authenticated)
            .await?;
        decode_nested(data, "user", "profile")
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<Session, ApiError> {
        if update.is_empty() {
            return Err(ApiError::Validation("nothing to update".to_string()));
        }
        let data = self
            .send_authed(
                Method::PUT,
                &["auth", "profile"],
                Some(to_body(update)?),
                Endpoint::Authenticated,
            )
            .await?;
        decode_nested(data, "user", "profile")
    }

    pub async fn update_password(&self, update: &PasswordUpdate) -> Result<(), ApiError> {
        if update.new_password.is_empty() {
            return Err(ApiError::Validation("new password is empty".to_string()));
        }
        self.send_authed(
            Method::PUT,
            &["auth", "password"],
            Some(to_body(update)?),
            Endpoint::Authenticated,
        )
        .await
        .map(drop)
    }

    /// Checks whether the account behind the stored credential is still usable.
    ///
    /// `known_role` is the role the session was established with; a different
    /// role on the server is reported as `RoleChanged`.
    pub async fn get_status(&self, known_role: Role) -> Result<StatusReport, ApiError> {
        let fetched = self
            .send_authed(Method::GET, &["auth", "me"], None, Endpoint::Status)
            .await
            .and_then(|data| decode_nested::<Session>(data, "user", "profile"));

        match fetched {
            Ok(user) => Ok(status_of(user, known_role)),
            Err(err) => match err.status_event() {
                Some(event) => Ok(StatusReport::terminal(event)),
                None => Err(err),
            },
        }
    }

    pub async fn add_favorite(&self, city_id: &str) -> Result<(), ApiError> {
        self.send_authed(
            Method::POST,
            &["users", "favorites", city_id],
            None,
            Endpoint::Authenticated,
        )
        .await
        .map(drop)
    }

    pub async fn remove_favorite(&self, city_id: &str) -> Result<(), ApiError> {
        self.send_authed(
            Method::DELETE,
            &["users", "favorites", city_id],
            None,
            Endpoint::Authenticated,
        )
        .await
        .map(drop)
    }

    pub async fn forgot_password(&self, email: &str) -> Result<(), ApiError> {
        self.post_public(&["auth", "forgot-password"], json!({ "email": email.trim() }))
            .await
    }

    pub async fn reset_password(&self, token: &str, password: &str) -> Result<(), ApiError> {
        self.post_public(
            &["auth", "reset-password"],
            json!({ "token": token.trim(), "password": password }),
        )
        .await
    }

    /// Returns false when the reset link is expired or unknown.
    pub async fn check_reset_token(&self, token: &str) -> Result<bool, ApiError> {
        let request = self
            .http
            .get(self.url(&["auth", "check-reset-token", token.trim()]));
        match self.send(request, Endpoint::Public).await {
            Ok(data) => Ok(data.get("valid").and_then(Value::as_bool).unwrap_or(true)),
            Err(ApiError::Validation(message)) => {
                debug!(%message, "reset token rejected");
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    pub async fn verify_email(&self, token: &str) -> Result<(), ApiError> {
        self.post_public(&["auth", "verify-email"], json!({ "token": token.trim() }))
            .await
    }

    pub async fn resend_verification(&self, email: &str) -> Result<(), ApiError> {
        self.post_public(
            &["auth", "resend-verification"],
            json!({ "email": email.trim() }),
        )
        .await
    }

    /// Replaces the stored profile, keeping the credential.
    pub fn persist_user(&self, user: &Session) -> Result<bool> {
        self.tokens.update_user(user)
    }

    pub fn load_recent(&self) -> Vec<RecentCity> {
        self.recent.load()
    }

    pub fn save_recent(&self, cities: &[RecentCity]) -> Result<()> {
        self.recent.save(cities)
    }

    pub fn clear_recent(&self) -> Result<()> {
        self.recent.clear()
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // Checked in `new`: the base URL always accepts path segments.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn establish(&self, token: String, user: Session) -> Result<StoredAuth, ApiError> {
        if user.is_suspended() {
            return Err(ApiError::AccountSuspended(format!(
                "account {} is suspended",
                user.email
            )));
        }

        let stored = StoredAuth {
            credential: Credential::new(token),
            user,
        };
        self.tokens
            .save(&stored)
            .map_err(|err| ApiError::Storage(format!("{err:#}")))?;
        info!(
            user = %stored.user.email,
            role = %stored.user.role,
            token = %stored.credential.masked(),
            "signed in"
        );
        Ok(stored)
    }

    async fn post_public(&self, segments: &[&str], body: Value) -> Result<(), ApiError> {
        let request = self.http.post(self.url(segments)).json(&body);
        self.send(request, Endpoint::Public).await.map(drop)
    }

    async fn send_authed(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<Value>,
        endpoint: Endpoint,
    ) -> Result<Value, ApiError> {
        let Some(stored) = self.tokens.read() else {
            return Err(ApiError::Unauthorized(NO_TOKEN_MESSAGE.to_string()));
        };
        let token = stored.credential.token;

        let mut request = self
            .http
            .request(method, self.url(segments))
            .bearer_auth(&token);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let result = self.send(request, endpoint).await;
        if let Err(ApiError::Unauthorized(message)) = &result {
            self.invalidate(&token, message);
        }
        result
    }

    async fn send(&self, request: RequestBuilder, endpoint: Endpoint) -> Result<Value, ApiError> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        unwrap_envelope(status, &body, endpoint)
    }

    /// Drops the rejected credential unless a newer one replaced it meanwhile.
    fn invalidate(&self, token: &str, reason: &str) {
        match self.tokens.clear_if(token) {
            Ok(true) => info!(reason, "credential rejected, cleared"),
            Ok(false) => debug!("rejected credential was already replaced"),
            Err(err) => warn!(error = %format!("{err:#}"), "failed to clear rejected credential"),
        }
    }
}

fn to_body<T: Serialize>(value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|err| ApiError::Decode(format!("request body: {err}")))
}

fn status_of(user: Session, known_role: Role) -> StatusReport {
    if user.status == AccountState::Deleted {
        StatusReport::terminal(StatusEvent::AccountDeleted)
    } else if user.is_suspended() {
        StatusReport::terminal(StatusEvent::AccountSuspended)
    } else if user.role != known_role {
        StatusReport::terminal(StatusEvent::RoleChanged)
    } else {
        StatusReport::ok(user)
    }
}
