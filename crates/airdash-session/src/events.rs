//! Session events and reply channels.
//!
//! Everything the runtime reacts to is a `SessionEvent`: commands from
//! context handles, timer ticks, user activity and the results of spawned
//! API calls. Results carry the auth epoch they were issued under.

use airdash_core::api::ApiError;
use airdash_core::models::{
    CityRef, PasswordUpdate, ProfileUpdate, RecentCity, RegisterRequest, Session, StatusEvent,
    StatusReport, StoredAuth,
};
use chrono::{DateTime, Utc};
use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::features::auth::ErrorCode;
use crate::features::favorites::{FavoriteEdit, FavoriteOutcome};
use crate::features::modal::ModalKind;
use crate::features::monitor::MonitorTimer;

/// One-shot answer to a command. Dropping it unanswered is allowed.
#[derive(Debug)]
pub struct Reply<T>(Option<oneshot::Sender<T>>);

impl<T> Reply<T> {
    pub fn channel() -> (Self, oneshot::Receiver<T>) {
        let (tx, rx) = oneshot::channel();
        (Self(Some(tx)), rx)
    }

    /// A reply nobody waits for.
    pub fn none() -> Self {
        Self(None)
    }

    pub fn send(self, value: T) {
        if let Some(tx) = self.0 {
            let _ = tx.send(value);
        }
    }
}

/// Screen the user is on. Dashboard and admin are protected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Screen {
    #[default]
    Public,
    Dashboard,
    Admin,
    Login,
}

impl Screen {
    pub fn is_protected(self) -> bool {
        matches!(self, Screen::Dashboard | Screen::Admin)
    }
}

/// User input that counts as activity for the status monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    Click,
    KeyDown,
    MouseMove,
    Scroll,
}

/// How a sign-in is performed.
#[derive(Debug, Clone)]
pub enum SignIn {
    Password { email: String, password: String },
    Google { token: String },
}

/// Requests issued by `SessionContext` handles.
#[derive(Debug)]
pub enum Command {
    SignIn {
        request: SignIn,
        reply: Reply<Result<Session, ApiError>>,
    },
    Register {
        request: RegisterRequest,
        reply: Reply<Result<(), ApiError>>,
    },
    Logout {
        reply: Reply<()>,
    },
    UpdateProfile {
        update: ProfileUpdate,
        reply: Reply<Result<Session, ApiError>>,
    },
    UpdatePassword {
        update: PasswordUpdate,
        reply: Reply<Result<(), ApiError>>,
    },
    AddFavorite {
        city_id: String,
        at: DateTime<Utc>,
        reply: Reply<FavoriteOutcome>,
    },
    RemoveFavorite {
        city_id: String,
        at: DateTime<Utc>,
        reply: Reply<FavoriteOutcome>,
    },
    CheckStatus {
        at: Instant,
        reply: Reply<Option<StatusEvent>>,
    },
    ReportError {
        message: String,
        code: Option<ErrorCode>,
    },
    SetScreen(Screen),
    CloseModal(ModalKind),
    AddRecentCity {
        city: CityRef,
        at: DateTime<Utc>,
    },
    ClearRecentCities,
    Shutdown,
}

#[derive(Debug)]
pub enum SessionEvent {
    /// Boot: what the stores held when the runtime started.
    Restored {
        stored: Option<StoredAuth>,
        recent: Vec<RecentCity>,
        now: DateTime<Utc>,
    },
    Command(Command),
    Activity {
        kind: ActivityKind,
        at: Instant,
    },
    MonitorTick {
        timer: MonitorTimer,
    },
    CountdownTick {
        episode: u64,
    },
    CountdownDeadline {
        episode: u64,
    },
    /// Wall-clock tick that re-renders relative times.
    ClockTick {
        now: DateTime<Utc>,
    },

    // Results of spawned API calls
    StatusChecked {
        epoch: u64,
        result: Result<StatusReport, ApiError>,
        reply: Reply<Option<StatusEvent>>,
    },
    SignedIn {
        epoch: u64,
        result: Result<StoredAuth, ApiError>,
        reply: Reply<Result<Session, ApiError>>,
    },
    ProfileUpdated {
        epoch: u64,
        result: Result<Session, ApiError>,
        reply: Reply<Result<Session, ApiError>>,
    },
    PasswordUpdated {
        epoch: u64,
        result: Result<(), ApiError>,
        reply: Reply<Result<(), ApiError>>,
    },
    FavoriteSettled {
        epoch: u64,
        edit: FavoriteEdit,
        result: Result<(), ApiError>,
        reply: Reply<FavoriteOutcome>,
    },
}

impl From<Command> for SessionEvent {
    fn from(command: Command) -> Self {
        SessionEvent::Command(command)
    }
}
