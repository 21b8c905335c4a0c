//! Session effect types.
//!
//! Effects are commands returned by the reducer that the runtime executes:
//! API calls (spawned, results come back as events) and store writes
//! (executed in place). Timers are not effects; the runtime derives them
//! from state after every event.

use airdash_core::api::ApiError;
use airdash_core::models::{
    PasswordUpdate, ProfileUpdate, RecentCity, RegisterRequest, Role, Session, StatusEvent,
    StoredAuth,
};

use crate::events::{Reply, SignIn};
use crate::features::favorites::{FavoriteEdit, FavoriteOutcome};

#[derive(Debug)]
pub enum SessionEffect {
    /// Poll the account status endpoint.
    CheckStatus {
        epoch: u64,
        known_role: Role,
        reply: Reply<Option<StatusEvent>>,
    },
    /// Sign in; `epoch` is the session the request was issued under.
    SignIn {
        epoch: u64,
        request: SignIn,
        reply: Reply<Result<Session, ApiError>>,
    },
    /// Registration touches no session state; the reply is sent by the task.
    Register {
        request: RegisterRequest,
        reply: Reply<Result<(), ApiError>>,
    },
    UpdateProfile {
        epoch: u64,
        update: ProfileUpdate,
        reply: Reply<Result<Session, ApiError>>,
    },
    UpdatePassword {
        epoch: u64,
        update: PasswordUpdate,
        reply: Reply<Result<(), ApiError>>,
    },
    /// Send an optimistic favorite edit to the server.
    SyncFavorite {
        epoch: u64,
        edit: FavoriteEdit,
        reply: Reply<FavoriteOutcome>,
    },

    // Store writes
    PersistUser { user: Session },
    /// Rewrite the stored credential and profile.
    StoreAuth { stored: StoredAuth },
    /// Drop the stored credential if it is still `token`.
    DiscardCredential { token: String },
    PersistRecent { cities: Vec<RecentCity> },
    ClearRecent,
    /// Drop the stored credential and recent list.
    ClearSession,

    /// Answer a command once the effects before it have run.
    Ack(Reply<()>),

    /// Stop the runtime.
    Shutdown,
}
