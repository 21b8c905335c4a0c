//! Scripted backend shared by the runtime tests.

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use airdash_core::api::ApiError;
use airdash_core::models::{
    AccountState, Credential, PasswordUpdate, ProfileUpdate, RecentCity, RegisterRequest, Role,
    Session, StatusEvent, StatusReport, StoredAuth,
};
use airdash_session::{SessionBackend, SessionContext, SessionSnapshot, Settings};

pub const EMAIL: &str = "an@example.com";
pub const PASSWORD: &str = "correct horse";
pub const TOKEN: &str = "eyJhbGciOiJIUzI1NiJ9.fake.signature";

/// What the server says about the account on the next status check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Account {
    Active,
    Suspended,
    Deleted,
    Unauthorized,
    Unreachable,
}

struct FakeState {
    account: Account,
    server_user: Session,
    stored: Option<StoredAuth>,
    recent: Vec<RecentCity>,
    latency: Duration,
    fail_favorites: bool,
}

pub struct FakeBackend {
    state: Mutex<FakeState>,
    status_calls: AtomicUsize,
    favorite_calls: AtomicUsize,
}

pub fn user() -> Session {
    Session {
        user_id: "u1".to_string(),
        email: EMAIL.to_string(),
        first_name: "An".to_string(),
        last_name: "Nguyen".to_string(),
        role: Role::User,
        favorites: BTreeSet::from(["hanoi".to_string()]),
        has_password: true,
        status: AccountState::Active,
        is_active: true,
    }
}

impl FakeBackend {
    /// A backend with nothing stored locally.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(FakeState {
                account: Account::Active,
                server_user: user(),
                stored: None,
                recent: Vec::new(),
                latency: Duration::from_millis(50),
                fail_favorites: false,
            }),
            status_calls: AtomicUsize::new(0),
            favorite_calls: AtomicUsize::new(0),
        })
    }

    /// A backend whose token store already holds a session.
    pub fn with_stored_session() -> Arc<Self> {
        let backend = Self::new();
        backend.lock().stored = Some(StoredAuth {
            credential: Credential::new(TOKEN),
            user: user(),
        });
        backend
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn set_account(&self, account: Account) {
        self.lock().account = account;
    }

    pub fn set_latency(&self, latency: Duration) {
        self.lock().latency = latency;
    }

    pub fn fail_favorites(&self, fail: bool) {
        self.lock().fail_favorites = fail;
    }

    pub fn edit_server_user(&self, edit: impl FnOnce(&mut Session)) {
        edit(&mut self.lock().server_user);
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn favorite_calls(&self) -> usize {
        self.favorite_calls.load(Ordering::SeqCst)
    }

    pub fn stored(&self) -> Option<StoredAuth> {
        self.lock().stored.clone()
    }

    pub fn saved_recent(&self) -> Vec<RecentCity> {
        self.lock().recent.clone()
    }

    fn latency(&self) -> Duration {
        self.lock().latency
    }

    fn sign_in(&self) -> StoredAuth {
        let mut state = self.lock();
        let auth = StoredAuth {
            credential: Credential::new(TOKEN),
            user: state.server_user.clone(),
        };
        state.stored = Some(auth.clone());
        auth
    }
}

impl SessionBackend for FakeBackend {
    fn restore(&self) -> Option<StoredAuth> {
        self.lock().stored.clone()
    }

    fn load_recent(&self) -> Vec<RecentCity> {
        self.lock().recent.clone()
    }

    fn save_recent(&self, cities: &[RecentCity]) -> anyhow::Result<()> {
        self.lock().recent = cities.to_vec();
        Ok(())
    }

    fn clear_recent(&self) -> anyhow::Result<()> {
        self.lock().recent.clear();
        Ok(())
    }

    fn persist_user(&self, user: &Session) -> anyhow::Result<()> {
        if let Some(auth) = self.lock().stored.as_mut() {
            auth.user = user.clone();
        }
        Ok(())
    }

    fn store_auth(&self, stored: &StoredAuth) -> anyhow::Result<()> {
        self.lock().stored = Some(stored.clone());
        Ok(())
    }

    fn discard_credential(&self, token: &str) -> anyhow::Result<()> {
        let mut state = self.lock();
        if state
            .stored
            .as_ref()
            .is_some_and(|stored| stored.credential.token == token)
        {
            state.stored = None;
        }
        Ok(())
    }

    fn logout(&self) -> anyhow::Result<()> {
        let mut state = self.lock();
        state.stored = None;
        state.recent.clear();
        Ok(())
    }

    async fn login(&self, email: &str, password: &str) -> Result<StoredAuth, ApiError> {
        tokio::time::sleep(self.latency()).await;
        if email != EMAIL || password != PASSWORD {
            return Err(ApiError::InvalidCredentials(
                "Email hoặc mật khẩu không đúng".to_string(),
            ));
        }
        Ok(self.sign_in())
    }

    async fn handle_google_callback(&self, token: &str) -> Result<StoredAuth, ApiError> {
        tokio::time::sleep(self.latency()).await;
        if token.is_empty() {
            return Err(ApiError::InvalidCredentials("missing token".to_string()));
        }
        Ok(self.sign_in())
    }

    async fn register(&self, request: &RegisterRequest) -> Result<(), ApiError> {
        tokio::time::sleep(self.latency()).await;
        if request.email == self.lock().server_user.email {
            return Err(ApiError::Validation("Email đã được sử dụng".to_string()));
        }
        Ok(())
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> Result<Session, ApiError> {
        tokio::time::sleep(self.latency()).await;
        let mut state = self.lock();
        if let Some(first_name) = &update.first_name {
            state.server_user.first_name.clone_from(first_name);
        }
        if let Some(last_name) = &update.last_name {
            state.server_user.last_name.clone_from(last_name);
        }
        Ok(state.server_user.clone())
    }

    async fn update_password(&self, update: &PasswordUpdate) -> Result<(), ApiError> {
        tokio::time::sleep(self.latency()).await;
        if update.new_password.len() < 6 {
            return Err(ApiError::Validation(
                "Mật khẩu phải có ít nhất 6 ký tự".to_string(),
            ));
        }
        Ok(())
    }

    async fn get_status(&self, known_role: Role) -> Result<StatusReport, ApiError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.latency()).await;
        let state = self.lock();
        match state.account {
            Account::Active if state.server_user.role != known_role => {
                Ok(StatusReport::terminal(StatusEvent::RoleChanged))
            }
            Account::Active => Ok(StatusReport::ok(state.server_user.clone())),
            Account::Suspended => Ok(StatusReport::terminal(StatusEvent::AccountSuspended)),
            Account::Deleted => Ok(StatusReport::terminal(StatusEvent::AccountDeleted)),
            Account::Unauthorized => Err(ApiError::Unauthorized("jwt expired".to_string())),
            Account::Unreachable => Err(ApiError::Network("connection refused".to_string())),
        }
    }

    async fn add_favorite(&self, city_id: &str) -> Result<(), ApiError> {
        self.edit_favorite(city_id, true).await
    }

    async fn remove_favorite(&self, city_id: &str) -> Result<(), ApiError> {
        self.edit_favorite(city_id, false).await
    }
}

impl FakeBackend {
    async fn edit_favorite(&self, city_id: &str, add: bool) -> Result<(), ApiError> {
        self.favorite_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.latency()).await;
        let mut state = self.lock();
        if state.fail_favorites {
            return Err(ApiError::Server {
                status: 500,
                message: "Internal Server Error".to_string(),
            });
        }
        if add {
            state.server_user.favorites.insert(city_id.to_string());
        } else {
            state.server_user.favorites.remove(city_id);
        }
        Ok(())
    }
}

/// Starts a runtime over `backend` with default timings.
pub async fn start(backend: &Arc<FakeBackend>) -> SessionContext {
    let ctx = SessionContext::start(Arc::clone(backend), Settings::default());
    ctx.wait_until_loaded().await;
    ctx
}

/// Starts a runtime and signs in with the scripted password.
pub async fn start_signed_in() -> (Arc<FakeBackend>, SessionContext) {
    let backend = FakeBackend::new();
    let ctx = start(&backend).await;
    ctx.login(EMAIL, PASSWORD).await.unwrap();
    (backend, ctx)
}

/// Waits (in paused time) until the snapshot satisfies `check`.
pub async fn wait_for(
    ctx: &SessionContext,
    within: Duration,
    what: &str,
    check: impl FnMut(&SessionSnapshot) -> bool,
) -> SessionSnapshot {
    let mut rx = ctx.subscribe();
    tokio::time::timeout(within, rx.wait_for(check))
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {what}"))
        .expect("session runtime stopped")
        .clone()
}
