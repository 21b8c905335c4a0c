//! Session state (owned by the runtime, mutated only by the reducer) and
//! the read-only snapshot published to context handles.

use std::time::Duration;

use airdash_core::config::Config;
use airdash_core::models::{RecentCity, Session, StoredAuth};

use crate::events::Screen;
use crate::features::favorites::FavoritesState;
use crate::features::modal::{ModalKind, ModalState};
use crate::features::monitor::{MonitorState, MonitorTimer};

/// Timing and capacity knobs, taken from the `[monitor]`, `[modal]` and
/// `[recent]` config sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub global_interval: Duration,
    pub protected_interval: Duration,
    pub activity_gap: Duration,
    pub countdown_secs: u8,
    pub recent_capacity: usize,
    pub clock_interval: Duration,
}

impl Settings {
    pub fn interval(&self, timer: MonitorTimer) -> Duration {
        match timer {
            MonitorTimer::Global => self.global_interval,
            MonitorTimer::Protected => self.protected_interval,
        }
    }

    pub fn countdown(&self) -> Duration {
        Duration::from_secs(u64::from(self.countdown_secs))
    }
}

impl From<&Config> for Settings {
    fn from(config: &Config) -> Self {
        Self {
            global_interval: config.monitor.global_interval(),
            protected_interval: config.monitor.protected_interval(),
            activity_gap: config.monitor.activity_gap(),
            countdown_secs: config.modal.countdown_secs,
            recent_capacity: config.recent.capacity,
            clock_interval: config.recent.refresh_interval(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

#[derive(Debug)]
pub struct SessionState {
    pub settings: Settings,
    /// Credential and profile; present iff authenticated.
    pub auth: Option<StoredAuth>,
    /// True until the stored credential has been resolved at boot.
    pub is_loading: bool,
    /// Bumped whenever the session starts or ends.
    pub epoch: u64,
    /// Counter for modal episodes.
    pub episodes: u64,
    pub screen: Screen,
    pub modal: ModalState,
    pub monitor: MonitorState,
    pub favorites: FavoritesState,
    pub recent: Vec<RecentCity>,
}

impl SessionState {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            auth: None,
            is_loading: true,
            epoch: 0,
            episodes: 0,
            screen: Screen::default(),
            modal: ModalState::Hidden,
            monitor: MonitorState::default(),
            favorites: FavoritesState::default(),
            recent: Vec::new(),
        }
    }

    pub fn user(&self) -> Option<&Session> {
        self.auth.as_ref().map(|auth| &auth.user)
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth.is_some()
    }
}

/// What context handles observe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub user: Option<Session>,
    pub is_loading: bool,
    pub is_authenticated: bool,
    pub modal: ModalState,
    pub screen: Screen,
    pub recent: Vec<RecentCity>,
}

impl SessionSnapshot {
    pub fn is_account_deleted(&self) -> bool {
        self.modal.kind() == Some(ModalKind::Deleted)
    }

    pub fn is_account_suspended(&self) -> bool {
        self.modal.kind() == Some(ModalKind::Suspended)
    }

    pub fn is_role_changed(&self) -> bool {
        self.modal.kind() == Some(ModalKind::RoleChanged)
    }

    /// Seconds left on the account notice, if one is showing.
    pub fn countdown(&self) -> Option<u8> {
        match self.modal {
            ModalState::Showing { remaining, .. } => Some(remaining),
            ModalState::Hidden => None,
        }
    }
}

impl From<&SessionState> for SessionSnapshot {
    fn from(state: &SessionState) -> Self {
        Self {
            user: state.user().cloned(),
            is_loading: state.is_loading,
            is_authenticated: state.is_authenticated(),
            modal: state.modal,
            screen: state.screen,
            recent: state.recent.clone(),
        }
    }
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self::from(&SessionState::new(Settings::default()))
    }
}
