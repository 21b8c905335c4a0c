//! The I/O seam of the session runtime.
//!
//! The runtime only talks to the backend API and the local stores through
//! this trait. `SessionClient` is the production implementation; tests
//! script their own.

use std::future::Future;

use airdash_core::api::{ApiError, SessionClient};
use airdash_core::models::{
    PasswordUpdate, ProfileUpdate, RecentCity, RegisterRequest, Role, Session, StatusReport,
    StoredAuth,
};
use anyhow::Result;

pub trait SessionBackend: Send + Sync + 'static {
    /// Reads the stored credential and profile, if any.
    fn restore(&self) -> Option<StoredAuth>;
    fn load_recent(&self) -> Vec<RecentCity>;
    fn save_recent(&self, cities: &[RecentCity]) -> Result<()>;
    fn clear_recent(&self) -> Result<()>;
    /// Rewrites the stored profile, keeping the credential.
    fn persist_user(&self, user: &Session) -> Result<()>;
    /// Overwrites the stored credential and profile.
    fn store_auth(&self, stored: &StoredAuth) -> Result<()>;
    /// Drops the stored credential only if it is still `token`.
    fn discard_credential(&self, token: &str) -> Result<()>;
    /// Drops the stored credential and recent list.
    fn logout(&self) -> Result<()>;

    fn login(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<StoredAuth, ApiError>> + Send;
    fn handle_google_callback(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<StoredAuth, ApiError>> + Send;
    fn register(
        &self,
        request: &RegisterRequest,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;
    fn update_profile(
        &self,
        update: &ProfileUpdate,
    ) -> impl Future<Output = Result<Session, ApiError>> + Send;
    fn update_password(
        &self,
        update: &PasswordUpdate,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;
    fn get_status(
        &self,
        known_role: Role,
    ) -> impl Future<Output = Result<StatusReport, ApiError>> + Send;
    fn add_favorite(&self, city_id: &str) -> impl Future<Output = Result<(), ApiError>> + Send;
    fn remove_favorite(&self, city_id: &str)
    -> impl Future<Output = Result<(), ApiError>> + Send;
}

impl SessionBackend for SessionClient {
    fn restore(&self) -> Option<StoredAuth> {
        SessionClient::restore(self)
    }

    fn load_recent(&self) -> Vec<RecentCity> {
        SessionClient::load_recent(self)
    }

    fn save_recent(&self, cities: &[RecentCity]) -> Result<()> {
        SessionClient::save_recent(self, cities)
    }

    fn clear_recent(&self) -> Result<()> {
        SessionClient::clear_recent(self)
    }

    fn persist_user(&self, user: &Session) -> Result<()> {
        if !SessionClient::persist_user(self, user)? {
            tracing::debug!("no stored session to update");
        }
        Ok(())
    }

    fn store_auth(&self, stored: &StoredAuth) -> Result<()> {
        self.tokens().save(stored)
    }

    fn discard_credential(&self, token: &str) -> Result<()> {
        if !self.tokens().clear_if(token)? {
            tracing::debug!("stored credential already replaced");
        }
        Ok(())
    }

    fn logout(&self) -> Result<()> {
        SessionClient::logout(self)
    }

    fn login(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<StoredAuth, ApiError>> + Send {
        SessionClient::login(self, email, password)
    }

    fn handle_google_callback(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<StoredAuth, ApiError>> + Send {
        SessionClient::handle_google_callback(self, token)
    }

    fn register(
        &self,
        request: &RegisterRequest,
    ) -> impl Future<Output = Result<(), ApiError>> + Send {
        SessionClient::register(self, request)
    }

    fn update_profile(
        &self,
        update: &ProfileUpdate,
    ) -> impl Future<Output = Result<Session, ApiError>> + Send {
        SessionClient::update_profile(self, update)
    }

    fn update_password(
        &self,
        update: &PasswordUpdate,
    ) -> impl Future<Output = Result<(), ApiError>> + Send {
        SessionClient::update_password(self, update)
    }

    fn get_status(
        &self,
        known_role: Role,
    ) -> impl Future<Output = Result<StatusReport, ApiError>> + Send {
        SessionClient::get_status(self, known_role)
    }

    fn add_favorite(&self, city_id: &str) -> impl Future<Output = Result<(), ApiError>> + Send {
        SessionClient::add_favorite(self, city_id)
    }

    fn remove_favorite(
        &self,
        city_id: &str,
    ) -> impl Future<Output = Result<(), ApiError>> + Send {
        SessionClient::remove_favorite(self, city_id)
    }
}
