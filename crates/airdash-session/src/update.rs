//! Session reducer (update function).
//!
//! All state mutations happen here. The runtime calls `update(state, event)`
//! and executes the returned effects. Command replies that need no I/O are
//! answered directly.

use airdash_core::api::{ApiError, NO_TOKEN_MESSAGE};
use airdash_core::models::{RecentCity, Session, StatusEvent, StatusReport, StoredAuth};
use chrono::{DateTime, Utc};
use tracing::{debug, info, trace, warn};

use crate::effects::SessionEffect;
use crate::events::{Command, Reply, SessionEvent};
use crate::features::favorites::{self, FavoriteDirection};
use crate::features::monitor::{self, CheckTrigger};
use crate::features::{auth, modal, recent};
use crate::state::SessionState;

pub fn update(state: &mut SessionState, event: SessionEvent) -> Vec<SessionEffect> {
    match event {
        SessionEvent::Restored {
            stored,
            recent,
            now,
        } => on_restored(state, stored, recent, now),
        SessionEvent::Command(command) => handle_command(state, command),
        SessionEvent::Activity { kind, at } => {
            trace!(?kind, "user activity");
            monitor::request_check(state, CheckTrigger::Activity(at), Reply::none())
        }
        SessionEvent::MonitorTick { timer } => {
            monitor::request_check(state, CheckTrigger::Interval(timer), Reply::none())
        }
        SessionEvent::CountdownTick { episode } => {
            modal::on_tick(state, episode);
            vec![]
        }
        SessionEvent::CountdownDeadline { episode } => {
            modal::on_deadline(state, episode);
            vec![]
        }
        SessionEvent::ClockTick { now } => {
            recent::refresh_formatting(&mut state.recent, now);
            vec![]
        }
        SessionEvent::StatusChecked {
            epoch,
            result,
            reply,
        } => on_status_checked(state, epoch, result, reply),
        SessionEvent::SignedIn {
            epoch,
            result,
            reply,
        } => auth::on_signed_in(state, epoch, result, reply),
        SessionEvent::ProfileUpdated {
            epoch,
            result,
            reply,
        } => auth::on_profile_updated(state, epoch, result, reply),
        SessionEvent::PasswordUpdated {
            epoch,
            result,
            reply,
        } => auth::on_password_updated(state, epoch, result, reply),
        SessionEvent::FavoriteSettled {
            epoch,
            edit,
            result,
            reply,
        } => favorites::settle(state, epoch, edit, result, reply),
    }
}

fn handle_command(state: &mut SessionState, command: Command) -> Vec<SessionEffect> {
    match command {
        Command::SignIn { request, reply } => vec![SessionEffect::SignIn {
            epoch: state.epoch,
            request,
            reply,
        }],
        Command::Register { request, reply } => vec![SessionEffect::Register { request, reply }],
        Command::Logout { reply } => {
            let mut effects = auth::logout(state, "requested");
            effects.push(SessionEffect::Ack(reply));
            effects
        }
        Command::UpdateProfile { update, reply } => {
            if !state.is_authenticated() {
                reply.send(Err(ApiError::Unauthorized(NO_TOKEN_MESSAGE.to_string())));
                return vec![];
            }
            vec![SessionEffect::UpdateProfile {
                epoch: state.epoch,
                update,
                reply,
            }]
        }
        Command::UpdatePassword { update, reply } => {
            if !state.is_authenticated() {
                reply.send(Err(ApiError::Unauthorized(NO_TOKEN_MESSAGE.to_string())));
                return vec![];
            }
            vec![SessionEffect::UpdatePassword {
                epoch: state.epoch,
                update,
                reply,
            }]
        }
        Command::AddFavorite { city_id, at, reply } => {
            favorites::request(state, city_id, FavoriteDirection::Add, at, reply)
        }
        Command::RemoveFavorite { city_id, at, reply } => {
            favorites::request(state, city_id, FavoriteDirection::Remove, at, reply)
        }
        Command::CheckStatus { at, reply } => {
            monitor::request_check(state, CheckTrigger::Manual(at), reply)
        }
        Command::ReportError { message, code } => auth::on_error_reported(state, &message, code),
        Command::SetScreen(screen) => {
            debug!(?screen, "screen changed");
            state.screen = screen;
            vec![]
        }
        Command::CloseModal(kind) => {
            modal::close(state, kind);
            vec![]
        }
        Command::AddRecentCity { city, at } => recent::add(state, city, at),
        Command::ClearRecentCities => recent::clear(state),
        Command::Shutdown => vec![SessionEffect::Shutdown],
    }
}

fn on_restored(
    state: &mut SessionState,
    stored: Option<StoredAuth>,
    mut cities: Vec<RecentCity>,
    now: DateTime<Utc>,
) -> Vec<SessionEffect> {
    cities.truncate(state.settings.recent_capacity);
    recent::refresh_formatting(&mut cities, now);
    state.recent = cities;

    let Some(stored) = stored else {
        debug!("no stored session");
        state.is_loading = false;
        return vec![];
    };

    info!(user = %stored.user.email, "restoring stored session");
    state.auth = Some(stored);
    state.epoch += 1;
    // Loading ends when the boot check settles.
    monitor::request_check(state, CheckTrigger::Boot, Reply::none())
}

fn on_status_checked(
    state: &mut SessionState,
    epoch: u64,
    result: Result<StatusReport, ApiError>,
    reply: Reply<Option<StatusEvent>>,
) -> Vec<SessionEffect> {
    if epoch != state.epoch {
        debug!("discarding status from an ended session");
        reply.send(None);
        return vec![];
    }
    state.monitor.in_flight = false;
    state.is_loading = false;

    match result {
        Ok(StatusReport { event, user }) => {
            let effects = if event.is_terminal() {
                modal::enter(state, event)
            } else {
                refresh_user(state, user)
            };
            reply.send(Some(event));
            effects
        }
        Err(err) if err.forces_logout() => {
            reply.send(None);
            auth::logout(state, "credential rejected by status check")
        }
        Err(err) => {
            warn!(error = %err, "account status check failed");
            reply.send(None);
            vec![]
        }
    }
}

/// Adopts the profile returned by a status check.
fn refresh_user(state: &mut SessionState, fresh: Option<Session>) -> Vec<SessionEffect> {
    let (Some(mut fresh), Some(current)) = (fresh, state.auth.as_mut()) else {
        return vec![];
    };
    state.favorites.preserve_pending(&current.user, &mut fresh);
    if current.user == fresh {
        return vec![];
    }
    current.user = fresh.clone();
    vec![SessionEffect::PersistUser { user: fresh }]
}

#[cfg(test)]
mod tests {
    use airdash_core::models::{CityRef, Credential, Role};
    use tokio::time::Instant;

    use super::*;
    use crate::events::Screen;
    use crate::features::modal::{ModalKind, ModalState};
    use crate::features::monitor::MonitorTimer;
    use crate::state::Settings;
    use crate::test_support::session;

    fn stored() -> StoredAuth {
        StoredAuth {
            credential: Credential::new("token-aaaaaaaaaaaa"),
            user: session(),
        }
    }

    fn restored(state: &mut SessionState) -> Vec<SessionEffect> {
        update(
            state,
            SessionEvent::Restored {
                stored: Some(stored()),
                recent: vec![],
                now: Utc::now(),
            },
        )
    }

    fn check_epoch(effects: &[SessionEffect]) -> u64 {
        match effects {
            [SessionEffect::CheckStatus { epoch, .. }] => *epoch,
            other => panic!("expected one CheckStatus, got {other:?}"),
        }
    }

    #[test]
    fn test_boot_without_credential_is_settled_immediately() {
        let mut state = SessionState::new(Settings::default());
        let effects = update(
            &mut state,
            SessionEvent::Restored {
                stored: None,
                recent: vec![],
                now: Utc::now(),
            },
        );

        assert!(effects.is_empty());
        assert!(!state.is_loading);
        assert!(!state.is_authenticated());
    }

    #[test]
    fn test_boot_with_credential_loads_until_first_check() {
        let mut state = SessionState::new(Settings::default());
        let epoch = check_epoch(&restored(&mut state));
        assert!(state.is_loading);
        assert!(state.is_authenticated());

        let mut fresh = session();
        fresh.first_name = "Bình".to_string();
        let effects = update(
            &mut state,
            SessionEvent::StatusChecked {
                epoch,
                result: Ok(StatusReport::ok(fresh)),
                reply: Reply::none(),
            },
        );

        assert!(!state.is_loading);
        assert_eq!(state.user().unwrap().first_name, "Bình");
        assert!(matches!(
            effects.as_slice(),
            [SessionEffect::PersistUser { .. }]
        ));
    }

    #[test]
    fn test_network_failure_keeps_session() {
        let mut state = SessionState::new(Settings::default());
        let epoch = check_epoch(&restored(&mut state));

        let effects = update(
            &mut state,
            SessionEvent::StatusChecked {
                epoch,
                result: Err(ApiError::Network("connection refused".into())),
                reply: Reply::none(),
            },
        );

        assert!(effects.is_empty());
        assert!(state.is_authenticated());
        assert!(!state.monitor.in_flight);
    }

    #[test]
    fn test_logout_wins_over_in_flight_check() {
        let mut state = SessionState::new(Settings::default());
        let epoch = check_epoch(&restored(&mut state));
        let (reply, _rx) = Reply::channel();
        update(&mut state, Command::Logout { reply }.into());

        let effects = update(
            &mut state,
            SessionEvent::StatusChecked {
                epoch,
                result: Ok(StatusReport::terminal(StatusEvent::AccountSuspended)),
                reply: Reply::none(),
            },
        );

        assert!(effects.is_empty());
        assert_eq!(state.modal, ModalState::Hidden);
        assert!(!state.is_authenticated());
    }

    #[test]
    fn test_terminal_status_shows_notice_and_stops_monitoring() {
        let mut state = SessionState::new(Settings::default());
        let epoch = check_epoch(&restored(&mut state));
        update(&mut state, Command::SetScreen(Screen::Dashboard).into());

        let effects = update(
            &mut state,
            SessionEvent::StatusChecked {
                epoch,
                result: Ok(StatusReport::terminal(StatusEvent::RoleChanged)),
                reply: Reply::none(),
            },
        );

        assert!(matches!(effects.as_slice(), [SessionEffect::ClearSession]));
        assert_eq!(state.modal.kind(), Some(ModalKind::RoleChanged));
        assert!(monitor::desired_timers(&state).is_empty());

        let tick = update(
            &mut state,
            SessionEvent::MonitorTick {
                timer: MonitorTimer::Global,
            },
        );
        assert!(tick.is_empty());
    }

    #[test]
    fn test_unauthorized_status_logs_out() {
        let mut state = SessionState::new(Settings::default());
        let epoch = check_epoch(&restored(&mut state));

        let effects = update(
            &mut state,
            SessionEvent::StatusChecked {
                epoch,
                result: Err(ApiError::Unauthorized("jwt expired".into())),
                reply: Reply::none(),
            },
        );

        assert!(matches!(effects.as_slice(), [SessionEffect::ClearSession]));
        assert!(!state.is_authenticated());
        assert!(!state.is_loading);
    }

    #[test]
    fn test_recent_cities_require_session() {
        let mut state = SessionState::new(Settings::default());
        let city = CityRef::new("hanoi", "Hà Nội", "ha-noi");

        let effects = update(
            &mut state,
            Command::AddRecentCity {
                city: city.clone(),
                at: Utc::now(),
            }
            .into(),
        );
        assert!(effects.is_empty());
        assert!(state.recent.is_empty());

        restored(&mut state);
        let effects = update(
            &mut state,
            Command::AddRecentCity {
                city,
                at: Utc::now(),
            }
            .into(),
        );
        assert!(matches!(
            effects.as_slice(),
            [SessionEffect::PersistRecent { cities }] if cities.len() == 1
        ));
        assert_eq!(state.recent[0].formatted_time, "Vừa xong");
    }

    #[test]
    fn test_profile_update_requires_session() {
        let mut state = SessionState::new(Settings::default());
        let (reply, mut rx) = Reply::channel();

        let effects = update(
            &mut state,
            Command::UpdateProfile {
                update: airdash_core::models::ProfileUpdate::default(),
                reply,
            }
            .into(),
        );

        assert!(effects.is_empty());
        assert!(matches!(
            rx.try_recv().unwrap(),
            Err(ApiError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_manual_check_is_throttled() {
        let mut state = SessionState::new(Settings::default());
        let epoch = check_epoch(&restored(&mut state));
        update(
            &mut state,
            SessionEvent::StatusChecked {
                epoch,
                result: Ok(StatusReport::ok(session())),
                reply: Reply::none(),
            },
        );
        let at = Instant::now();

        let first = update(
            &mut state,
            Command::CheckStatus {
                at,
                reply: Reply::none(),
            }
            .into(),
        );
        let (reply, mut rx) = Reply::channel();
        let second = update(&mut state, Command::CheckStatus { at, reply }.into());

        assert_eq!(check_epoch(&first), epoch);
        assert!(second.is_empty());
        assert_eq!(rx.try_recv().unwrap(), None);
        assert_eq!(state.user().unwrap().role, Role::User);
    }
}
