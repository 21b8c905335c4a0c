//! Optimistic favorite edits.
//!
//! The edit is applied to the in-memory session before the server call and
//! inverse-applied if the call fails. One edit per city may be in flight.

use std::collections::HashSet;
use std::fmt;

use airdash_core::api::ApiError;
use airdash_core::models::Session;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::effects::SessionEffect;
use crate::events::Reply;
use crate::features::auth;
use crate::state::SessionState;

/// A reversible change to the session.
pub trait Optimistic {
    fn apply(&self, user: &mut Session);
    fn revert(&self, user: &mut Session);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteDirection {
    Add,
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FavoriteEdit {
    pub city_id: String,
    pub direction: FavoriteDirection,
    pub requested_at: DateTime<Utc>,
    /// Membership before the edit was applied.
    was_member: bool,
}

impl FavoriteEdit {
    pub fn new(
        user: &Session,
        city_id: impl Into<String>,
        direction: FavoriteDirection,
        requested_at: DateTime<Utc>,
    ) -> Self {
        let city_id = city_id.into();
        let was_member = user.is_favorite(&city_id);
        Self {
            city_id,
            direction,
            requested_at,
            was_member,
        }
    }

    /// Returns true if applying the edit would change nothing.
    pub fn is_noop(&self) -> bool {
        match self.direction {
            FavoriteDirection::Add => self.was_member,
            FavoriteDirection::Remove => !self.was_member,
        }
    }
}

impl Optimistic for FavoriteEdit {
    fn apply(&self, user: &mut Session) {
        match self.direction {
            FavoriteDirection::Add => user.favorites.insert(self.city_id.clone()),
            FavoriteDirection::Remove => user.favorites.remove(&self.city_id),
        };
    }

    fn revert(&self, user: &mut Session) {
        if self.was_member {
            user.favorites.insert(self.city_id.clone());
        } else {
            user.favorites.remove(&self.city_id);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotAuthenticated,
    AlreadyInState,
    InFlight,
    SessionEnded,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotAuthenticated => write!(f, "not signed in"),
            SkipReason::AlreadyInState => write!(f, "nothing to change"),
            SkipReason::InFlight => write!(f, "an edit for this city is in progress"),
            SkipReason::SessionEnded => write!(f, "session ended"),
        }
    }
}

/// What happened to a favorite request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FavoriteOutcome {
    Confirmed,
    RolledBack(ApiError),
    Skipped(SkipReason),
}

/// City ids with an edit awaiting the server.
#[derive(Debug, Default, Clone)]
pub struct FavoritesState {
    in_flight: HashSet<String>,
}

impl FavoritesState {
    pub fn is_pending(&self, city_id: &str) -> bool {
        self.in_flight.contains(city_id)
    }

    pub fn clear(&mut self) {
        self.in_flight.clear();
    }

    /// Keeps local membership for cities whose edit has not settled yet,
    /// so a status refresh cannot undo an optimistic change.
    pub fn preserve_pending(&self, local: &Session, fresh: &mut Session) {
        for city_id in &self.in_flight {
            if local.is_favorite(city_id) {
                fresh.favorites.insert(city_id.clone());
            } else {
                fresh.favorites.remove(city_id);
            }
        }
    }
}

pub fn request(
    state: &mut SessionState,
    city_id: String,
    direction: FavoriteDirection,
    at: DateTime<Utc>,
    reply: Reply<FavoriteOutcome>,
) -> Vec<SessionEffect> {
    let epoch = state.epoch;
    let Some(current) = state.auth.as_mut() else {
        debug!(%city_id, "favorite edit without a session");
        reply.send(FavoriteOutcome::Skipped(SkipReason::NotAuthenticated));
        return vec![];
    };
    if state.favorites.in_flight.contains(&city_id) {
        reply.send(FavoriteOutcome::Skipped(SkipReason::InFlight));
        return vec![];
    }

    let edit = FavoriteEdit::new(&current.user, city_id, direction, at);
    if edit.is_noop() {
        reply.send(FavoriteOutcome::Skipped(SkipReason::AlreadyInState));
        return vec![];
    }

    edit.apply(&mut current.user);
    state.favorites.in_flight.insert(edit.city_id.clone());
    vec![SessionEffect::SyncFavorite { epoch, edit, reply }]
}

pub fn settle(
    state: &mut SessionState,
    epoch: u64,
    edit: FavoriteEdit,
    result: Result<(), ApiError>,
    reply: Reply<FavoriteOutcome>,
) -> Vec<SessionEffect> {
    if epoch != state.epoch {
        debug!(city_id = %edit.city_id, "favorite edit settled after the session ended");
        reply.send(FavoriteOutcome::Skipped(SkipReason::SessionEnded));
        return vec![];
    }

    state.favorites.in_flight.remove(&edit.city_id);
    let Some(current) = state.auth.as_mut() else {
        reply.send(FavoriteOutcome::Skipped(SkipReason::SessionEnded));
        return vec![];
    };

    match result {
        Ok(()) => {
            let user = current.user.clone();
            reply.send(FavoriteOutcome::Confirmed);
            vec![SessionEffect::PersistUser { user }]
        }
        Err(err) => {
            edit.revert(&mut current.user);
            warn!(
                city_id = %edit.city_id,
                direction = ?edit.direction,
                error = %err,
                "favorite edit rolled back"
            );
            let effects = auth::on_call_failed(state, &err);
            reply.send(FavoriteOutcome::RolledBack(err));
            effects
        }
    }
}
