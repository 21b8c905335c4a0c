//! Account status monitor.
//!
//! Decides when the status endpoint is polled. Interval ticks always go
//! through; activity and manual requests are throttled by a monotonic gap.
//! Every path shares one in-flight flag, so overlapping checks are dropped
//! before the gap is consulted.

use std::time::Duration;

use airdash_core::models::StatusEvent;
use tokio::time::Instant;
use tracing::debug;

use crate::effects::SessionEffect;
use crate::events::Reply;
use crate::state::SessionState;

/// The two independent polling timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MonitorTimer {
    /// Runs on every screen while authenticated.
    Global,
    /// Runs only on the dashboard and admin screens.
    Protected,
}

/// What asked for a status check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckTrigger {
    Boot,
    Interval(MonitorTimer),
    Activity(Instant),
    Manual(Instant),
}

impl CheckTrigger {
    /// When a throttled trigger fired; `None` for triggers that bypass the gap.
    fn throttled_at(self) -> Option<Instant> {
        match self {
            CheckTrigger::Activity(at) | CheckTrigger::Manual(at) => Some(at),
            CheckTrigger::Boot | CheckTrigger::Interval(_) => None,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct MonitorState {
    pub in_flight: bool,
    /// When the last throttled check was let through.
    pub last_throttled_check: Option<Instant>,
}

impl MonitorState {
    pub fn reset(&mut self) {
        self.in_flight = false;
        self.last_throttled_check = None;
    }

    /// Applies the activity gap. Returns false if the request must be dropped.
    fn admit(&mut self, at: Instant, gap: Duration) -> bool {
        if let Some(last) = self.last_throttled_check
            && at.saturating_duration_since(last) < gap
        {
            return false;
        }
        self.last_throttled_check = Some(at);
        true
    }
}

/// Timers that should be running for the current state.
pub fn desired_timers(state: &SessionState) -> Vec<MonitorTimer> {
    if !state.is_authenticated() || state.modal.is_showing() {
        return Vec::new();
    }
    if state.screen.is_protected() {
        vec![MonitorTimer::Global, MonitorTimer::Protected]
    } else {
        vec![MonitorTimer::Global]
    }
}

/// Requests a status check. Dropped requests answer `None` right away.
pub fn request_check(
    state: &mut SessionState,
    trigger: CheckTrigger,
    reply: Reply<Option<StatusEvent>>,
) -> Vec<SessionEffect> {
    let Some(role) = state.user().map(|user| user.role) else {
        reply.send(None);
        return vec![];
    };
    if state.modal.is_showing() {
        reply.send(None);
        return vec![];
    }

    // A dropped request must not use up the gap.
    if state.monitor.in_flight {
        debug!(?trigger, "status check already in flight");
        reply.send(None);
        return vec![];
    }

    if let Some(at) = trigger.throttled_at()
        && !state.monitor.admit(at, state.settings.activity_gap)
    {
        debug!(?trigger, "status check throttled");
        reply.send(None);
        return vec![];
    }

    state.monitor.in_flight = true;
    debug!(?trigger, "checking account status");
    vec![SessionEffect::CheckStatus {
        epoch: state.epoch,
        known_role: role,
        reply,
    }]
}

#[cfg(test)]
mod tests {
    use airdash_core::models::{Credential, StoredAuth};

    use super::*;
    use crate::events::Screen;
    use crate::state::Settings;
    use crate::test_support::session;

    fn authed() -> SessionState {
        let mut state = SessionState::new(Settings::default());
        state.auth = Some(StoredAuth {
            credential: Credential::new("token-aaaaaaaaaaaa"),
            user: session(),
        });
        state.is_loading = false;
        state
    }

    fn checks(effects: &[SessionEffect]) -> usize {
        effects
            .iter()
            .filter(|effect| matches!(effect, SessionEffect::CheckStatus { .. }))
            .count()
    }

    #[test]
    fn test_unauthenticated_never_checks() {
        let mut state = SessionState::new(Settings::default());
        let effects = request_check(
            &mut state,
            CheckTrigger::Interval(MonitorTimer::Global),
            Reply::none(),
        );
        assert!(effects.is_empty());
        assert!(desired_timers(&state).is_empty());
    }

    #[test]
    fn test_activity_inside_gap_is_dropped() {
        let mut state = authed();
        let start = Instant::now();

        let first = request_check(&mut state, CheckTrigger::Activity(start), Reply::none());
        state.monitor.in_flight = false;
        let second = request_check(
            &mut state,
            CheckTrigger::Manual(start + Duration::from_secs(4)),
            Reply::none(),
        );
        let third = request_check(
            &mut state,
            CheckTrigger::Activity(start + Duration::from_secs(5)),
            Reply::none(),
        );

        assert_eq!(checks(&first), 1);
        assert_eq!(checks(&second), 0);
        assert_eq!(checks(&third), 1);
    }

    #[test]
    fn test_interval_ignores_gap_but_not_in_flight() {
        let mut state = authed();
        let now = Instant::now();

        let activity = request_check(&mut state, CheckTrigger::Activity(now), Reply::none());
        let interval = request_check(
            &mut state,
            CheckTrigger::Interval(MonitorTimer::Global),
            Reply::none(),
        );
        state.monitor.in_flight = false;
        let after = request_check(
            &mut state,
            CheckTrigger::Interval(MonitorTimer::Protected),
            Reply::none(),
        );

        assert_eq!(checks(&activity), 1);
        assert_eq!(checks(&interval), 0);
        assert_eq!(checks(&after), 1);
    }

    #[test]
    fn test_protected_timer_follows_screen() {
        let mut state = authed();
        assert_eq!(desired_timers(&state), [MonitorTimer::Global]);

        state.screen = Screen::Admin;
        assert_eq!(
            desired_timers(&state),
            [MonitorTimer::Global, MonitorTimer::Protected]
        );
    }

    #[test]
    fn test_activity_dropped_in_flight_keeps_gap_open() {
        let mut state = authed();
        let start = Instant::now();

        let interval = request_check(
            &mut state,
            CheckTrigger::Interval(MonitorTimer::Global),
            Reply::none(),
        );
        let during = request_check(&mut state, CheckTrigger::Activity(start), Reply::none());
        state.monitor.in_flight = false;
        let after = request_check(
            &mut state,
            CheckTrigger::Activity(start + Duration::from_secs(1)),
            Reply::none(),
        );

        assert_eq!(checks(&interval), 1);
        assert_eq!(checks(&during), 0);
        assert_eq!(checks(&after), 1);
    }
}
