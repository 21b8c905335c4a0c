//! `SessionContext`: the cloneable handle UI code talks to.
//!
//! Reads come from the latest published snapshot. Mutations are sent to
//! the runtime as commands; async operations await the runtime's reply.
//! Dropping the last handle shuts the runtime down.

use std::fmt;
use std::sync::Arc;

use airdash_core::api::ApiError;
use airdash_core::models::{
    CityRef, PasswordUpdate, ProfileUpdate, RecentCity, RegisterRequest, Session, StatusEvent,
};
use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::debug;

use crate::backend::SessionBackend;
use crate::events::{ActivityKind, Command, Reply, Screen, SessionEvent, SignIn};
use crate::features::auth::ErrorCode;
use crate::features::favorites::{FavoriteOutcome, SkipReason};
use crate::features::modal::ModalKind;
use crate::runtime::SessionRuntime;
use crate::state::{SessionSnapshot, Settings};

const STOPPED: &str = "session runtime stopped";

#[derive(Clone)]
pub struct SessionContext {
    inbox: mpsc::UnboundedSender<SessionEvent>,
    snapshot: watch::Receiver<SessionSnapshot>,
    stopped: CancellationToken,
    _guard: Arc<DropGuard>,
}

impl SessionContext {
    /// Spawns the session runtime and returns the first handle to it.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start<B: SessionBackend>(backend: Arc<B>, settings: Settings) -> Self {
        let runtime = SessionRuntime::new(backend, settings);
        let ctx = Self {
            inbox: runtime.inbox(),
            snapshot: runtime.subscribe(),
            stopped: runtime.shutdown_token(),
            _guard: Arc::new(runtime.shutdown_token().drop_guard()),
        };
        tokio::spawn(runtime.run());
        ctx
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    /// A receiver that is notified whenever the snapshot changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.clone()
    }

    pub fn user(&self) -> Option<Session> {
        self.snapshot.borrow().user.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.snapshot.borrow().is_loading
    }

    pub fn is_authenticated(&self) -> bool {
        self.snapshot.borrow().is_authenticated
    }

    pub fn is_account_deleted(&self) -> bool {
        self.snapshot.borrow().is_account_deleted()
    }

    pub fn is_account_suspended(&self) -> bool {
        self.snapshot.borrow().is_account_suspended()
    }

    pub fn is_role_changed(&self) -> bool {
        self.snapshot.borrow().is_role_changed()
    }

    pub fn screen(&self) -> Screen {
        self.snapshot.borrow().screen
    }

    pub fn recent_cities(&self) -> Vec<RecentCity> {
        self.snapshot.borrow().recent.clone()
    }

    /// Waits until the stored credential has been resolved.
    pub async fn wait_until_loaded(&self) -> SessionSnapshot {
        let mut rx = self.snapshot.clone();
        let loaded = rx
            .wait_for(|snapshot| !snapshot.is_loading)
            .await
            .map(|snapshot| snapshot.clone());
        loaded.unwrap_or_else(|_| rx.borrow().clone())
    }

    // ------------------------------------------------------------------
    // Auth
    // ------------------------------------------------------------------

    pub async fn login(&self, email: &str, password: &str) -> Result<Session, ApiError> {
        let request = SignIn::Password {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.request(|reply| Command::SignIn { request, reply })
            .await
            .unwrap_or_else(|| Err(stopped()))
    }

    /// Completes a Google sign-in with the token from the OAuth redirect.
    pub async fn handle_google_callback(&self, token: &str) -> Result<Session, ApiError> {
        let request = SignIn::Google {
            token: token.to_string(),
        };
        self.request(|reply| Command::SignIn { request, reply })
            .await
            .unwrap_or_else(|| Err(stopped()))
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<(), ApiError> {
        self.request(|reply| Command::Register { request, reply })
            .await
            .unwrap_or_else(|| Err(stopped()))
    }

    /// Ends the session. Returns once the stores have been cleared.
    pub async fn logout(&self) {
        self.request(|reply| Command::Logout { reply }).await;
    }

    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<Session, ApiError> {
        self.request(|reply| Command::UpdateProfile { update, reply })
            .await
            .unwrap_or_else(|| Err(stopped()))
    }

    pub async fn update_password(&self, update: PasswordUpdate) -> Result<(), ApiError> {
        self.request(|reply| Command::UpdatePassword { update, reply })
            .await
            .unwrap_or_else(|| Err(stopped()))
    }

    // ------------------------------------------------------------------
    // Favorites
    // ------------------------------------------------------------------

    pub async fn add_favorite(&self, city_id: &str) -> FavoriteOutcome {
        let city_id = city_id.to_string();
        self.request(|reply| Command::AddFavorite {
            city_id,
            at: Utc::now(),
            reply,
        })
        .await
        .unwrap_or(FavoriteOutcome::Skipped(SkipReason::SessionEnded))
    }

    pub async fn remove_favorite(&self, city_id: &str) -> FavoriteOutcome {
        let city_id = city_id.to_string();
        self.request(|reply| Command::RemoveFavorite {
            city_id,
            at: Utc::now(),
            reply,
        })
        .await
        .unwrap_or(FavoriteOutcome::Skipped(SkipReason::SessionEnded))
    }

    // ------------------------------------------------------------------
    // Account status
    // ------------------------------------------------------------------

    /// Checks the account status now, unless a check ran within the
    /// activity gap or one is in flight (then `None`).
    pub async fn check_account_status(&self) -> Option<StatusEvent> {
        let at = Instant::now();
        self.request(|reply| Command::CheckStatus { at, reply })
            .await
            .flatten()
    }

    pub fn report_activity(&self, kind: ActivityKind) {
        self.send(SessionEvent::Activity {
            kind,
            at: Instant::now(),
        });
    }

    /// Feeds the global error listener.
    pub fn report_error(&self, message: impl Into<String>, code: Option<ErrorCode>) {
        self.command(Command::ReportError {
            message: message.into(),
            code,
        });
    }

    pub fn hide_account_deleted_modal(&self) {
        self.command(Command::CloseModal(ModalKind::Deleted));
    }

    pub fn hide_account_suspended_modal(&self) {
        self.command(Command::CloseModal(ModalKind::Suspended));
    }

    pub fn hide_role_changed_modal(&self) {
        self.command(Command::CloseModal(ModalKind::RoleChanged));
    }

    pub fn set_screen(&self, screen: Screen) {
        self.command(Command::SetScreen(screen));
    }

    // ------------------------------------------------------------------
    // Recently viewed
    // ------------------------------------------------------------------

    pub fn add_recent_city(&self, city: CityRef) {
        self.command(Command::AddRecentCity {
            city,
            at: Utc::now(),
        });
    }

    pub fn clear_recent_cities(&self) {
        self.command(Command::ClearRecentCities);
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Asks the runtime to stop once the commands sent before this one
    /// have been handled.
    pub fn shutdown(&self) {
        self.command(Command::Shutdown);
    }

    /// Stops the runtime and waits until everything sent before has been
    /// handled, including store writes.
    pub async fn close(&self) {
        self.shutdown();
        self.stopped().await;
    }

    pub fn is_running(&self) -> bool {
        !self.stopped.is_cancelled()
    }

    /// Resolves once the runtime has been asked to stop.
    pub async fn stopped(&self) {
        self.stopped.cancelled().await;
    }

    async fn request<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> Option<T> {
        let (reply, rx) = Reply::channel();
        if !self.send(make(reply).into()) {
            return None;
        }
        rx.await.ok()
    }

    fn command(&self, command: Command) {
        self.send(command.into());
    }

    fn send(&self, event: SessionEvent) -> bool {
        if self.inbox.send(event).is_err() {
            debug!("{STOPPED}; event dropped");
            return false;
        }
        true
    }
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("snapshot", &*self.snapshot.borrow())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

fn stopped() -> ApiError {
    ApiError::Network(STOPPED.to_string())
}
