//! Account notification modal.
//!
//! `Hidden -> Showing -> Hidden`. The first terminal status wins; while a
//! notice is showing every other status is ignored. Leaving `Showing`
//! lands on the login screen unless a new session has started since.

use airdash_core::models::StatusEvent;
use tracing::{debug, info};

use crate::effects::SessionEffect;
use crate::events::Screen;
use crate::features::auth;
use crate::state::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalKind {
    Deleted,
    Suspended,
    RoleChanged,
}

impl ModalKind {
    pub fn from_status(event: StatusEvent) -> Option<Self> {
        match event {
            StatusEvent::Ok => None,
            StatusEvent::AccountDeleted => Some(ModalKind::Deleted),
            StatusEvent::AccountSuspended => Some(ModalKind::Suspended),
            StatusEvent::RoleChanged => Some(ModalKind::RoleChanged),
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ModalKind::Deleted => "Tài khoản đã bị xóa",
            ModalKind::Suspended => "Tài khoản đã bị khóa",
            ModalKind::RoleChanged => "Quyền truy cập đã thay đổi",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModalState {
    #[default]
    Hidden,
    Showing {
        kind: ModalKind,
        /// Seconds left before the forced redirect.
        remaining: u8,
        /// Identifies the timer pair that belongs to this notice.
        episode: u64,
    },
}

impl ModalState {
    pub fn is_showing(&self) -> bool {
        matches!(self, ModalState::Showing { .. })
    }

    pub fn kind(&self) -> Option<ModalKind> {
        match self {
            ModalState::Showing { kind, .. } => Some(*kind),
            ModalState::Hidden => None,
        }
    }

    pub fn episode(&self) -> Option<u64> {
        match self {
            ModalState::Showing { episode, .. } => Some(*episode),
            ModalState::Hidden => None,
        }
    }
}

/// Handles a terminal status. Entering `Showing` ends the session.
pub fn enter(state: &mut SessionState, event: StatusEvent) -> Vec<SessionEffect> {
    let Some(kind) = ModalKind::from_status(event) else {
        return vec![];
    };
    if let ModalState::Showing { kind: active, .. } = state.modal {
        debug!(?kind, ?active, "account notice already showing");
        return vec![];
    }

    state.episodes += 1;
    state.modal = ModalState::Showing {
        kind,
        remaining: state.settings.countdown_secs,
        episode: state.episodes,
    };
    info!(?kind, "account notice shown, ending session");
    auth::end_session(state)
}

pub fn on_tick(state: &mut SessionState, episode: u64) {
    let expired = match &mut state.modal {
        ModalState::Showing {
            remaining,
            episode: active,
            ..
        } if *active == episode => {
            *remaining = remaining.saturating_sub(1);
            *remaining == 0
        }
        _ => false,
    };
    if expired {
        redirect(state);
    }
}

/// The deadline redirects even if ticks stalled.
pub fn on_deadline(state: &mut SessionState, episode: u64) {
    if state.modal.episode() == Some(episode) {
        redirect(state);
    }
}

/// Closing is only possible through the redirect.
pub fn close(state: &mut SessionState, kind: ModalKind) {
    if state.modal.kind() == Some(kind) {
        redirect(state);
    }
}

fn redirect(state: &mut SessionState) {
    let kind = state.modal.kind();
    state.modal = ModalState::Hidden;
    if state.is_authenticated() {
        debug!(?kind, "notice ended after a new sign-in");
        return;
    }
    info!(?kind, "redirecting to login");
    state.screen = Screen::Login;
}
