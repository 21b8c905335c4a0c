//! Auth feature reducer.
//!
//! Sign-in results, logout, profile mutations and the global error
//! listener. Every path that ends a session goes through `end_session`.

use airdash_core::api::ApiError;
use airdash_core::models::{Session, StatusEvent, StoredAuth};
use tracing::{debug, info, warn};

use crate::effects::SessionEffect;
use crate::events::Reply;
use crate::features::modal::{self, ModalState};
use crate::state::SessionState;

const SIGN_IN_SUPERSEDED: &str = "the session changed before sign-in completed";

/// Structured error codes a reporter can attach instead of relying on text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Unauthorized,
}

const AUTH_ERROR_MARKERS: &[&str] = &["token", "xác thực", "authentication", "no token"];

/// Returns true if a reported error means the credential is unusable.
pub fn is_auth_error(message: &str, code: Option<ErrorCode>) -> bool {
    if code == Some(ErrorCode::Unauthorized) {
        return true;
    }
    let lowered = message.to_lowercase();
    AUTH_ERROR_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
}

/// Drops the in-memory session, bumps the epoch and clears the stores.
///
/// Results of requests issued before this point are discarded on arrival.
pub fn end_session(state: &mut SessionState) -> Vec<SessionEffect> {
    state.auth = None;
    state.is_loading = false;
    state.recent.clear();
    state.epoch += 1;
    state.monitor.reset();
    state.favorites.clear();
    vec![SessionEffect::ClearSession]
}

pub fn logout(state: &mut SessionState, reason: &str) -> Vec<SessionEffect> {
    if let Some(user) = state.user() {
        info!(user = %user.email, reason, "logging out");
    } else {
        debug!(reason, "logout without a session");
    }
    end_session(state)
}

/// Global error listener: logs out on authentication errors while signed in.
pub fn on_error_reported(
    state: &mut SessionState,
    message: &str,
    code: Option<ErrorCode>,
) -> Vec<SessionEffect> {
    if !state.is_authenticated() || !is_auth_error(message, code) {
        debug!(message, "ignoring reported error");
        return vec![];
    }
    logout(state, "authentication error reported")
}

/// Adopts a sign-in result issued under `epoch`.
///
/// A result that settles after a logout (or another sign-in) is dropped,
/// and the credential it stored is rolled back to match memory.
pub fn on_signed_in(
    state: &mut SessionState,
    epoch: u64,
    result: Result<StoredAuth, ApiError>,
    reply: Reply<Result<Session, ApiError>>,
) -> Vec<SessionEffect> {
    match result {
        Ok(stored) if epoch != state.epoch => {
            debug!(token = %stored.credential.masked(), "discarding superseded sign-in");
            reply.send(Err(ApiError::Unauthorized(SIGN_IN_SUPERSEDED.to_string())));
            match &state.auth {
                Some(current) => vec![SessionEffect::StoreAuth {
                    stored: current.clone(),
                }],
                None => vec![SessionEffect::DiscardCredential {
                    token: stored.credential.token,
                }],
            }
        }
        Ok(stored) => {
            if state.modal.is_showing() {
                info!(kind = ?state.modal.kind(), "signed in again, closing account notice");
                state.modal = ModalState::Hidden;
            }
            let user = stored.user.clone();
            state.auth = Some(stored);
            state.epoch += 1;
            state.is_loading = false;
            state.monitor.reset();
            state.favorites.clear();
            reply.send(Ok(user));
            vec![]
        }
        Err(err) => {
            debug!(error = %err, "sign-in failed");
            reply.send(Err(err));
            vec![]
        }
    }
}

/// Handles a failure of an authenticated call, logging out on `Unauthorized`.
pub fn on_call_failed(state: &mut SessionState, err: &ApiError) -> Vec<SessionEffect> {
    if err.forces_logout() {
        logout(state, "credential rejected")
    } else {
        vec![]
    }
}

pub fn on_profile_updated(
    state: &mut SessionState,
    epoch: u64,
    result: Result<Session, ApiError>,
    reply: Reply<Result<Session, ApiError>>,
) -> Vec<SessionEffect> {
    if epoch != state.epoch {
        debug!("discarding profile update from an ended session");
        reply.send(result);
        return vec![];
    }

    match result {
        Ok(fresh) => {
            // A role change is reported through the notice, never adopted.
            if let Some(known) = state.user().map(|user| user.role)
                && known != fresh.role
            {
                info!(?known, fresh = ?fresh.role, "profile update revealed a role change");
                reply.send(Ok(fresh));
                return modal::enter(state, StatusEvent::RoleChanged);
            }
            let mut effects = vec![];
            if let Some(auth) = state.auth.as_mut() {
                auth.user = fresh.clone();
                effects.push(SessionEffect::PersistUser { user: fresh.clone() });
            }
            reply.send(Ok(fresh));
            effects
        }
        Err(err) => {
            let effects = on_call_failed(state, &err);
            reply.send(Err(err));
            effects
        }
    }
}

pub fn on_password_updated(
    state: &mut SessionState,
    epoch: u64,
    result: Result<(), ApiError>,
    reply: Reply<Result<(), ApiError>>,
) -> Vec<SessionEffect> {
    if epoch != state.epoch {
        debug!("discarding password update from an ended session");
        reply.send(result);
        return vec![];
    }

    match result {
        Ok(()) => {
            let mut effects = vec![];
            if let Some(auth) = state.auth.as_mut() {
                auth.user.has_password = true;
                effects.push(SessionEffect::PersistUser {
                    user: auth.user.clone(),
                });
            }
            reply.send(Ok(()));
            effects
        }
        Err(err) => {
            if !err.forces_logout() {
                warn!(error = %err, "password update failed");
            }
            let effects = on_call_failed(state, &err);
            reply.send(Err(err));
            effects
        }
    }
}
