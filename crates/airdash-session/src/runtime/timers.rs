//! Timer tasks owned by the runtime.
//!
//! Each timer is a spawned task posting events to the inbox. The runtime
//! keeps a `DropGuard` per timer; dropping the guard cancels the task.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::debug;

use crate::events::SessionEvent;
use crate::features::monitor::MonitorTimer;

pub(crate) type InboxSender = mpsc::UnboundedSender<SessionEvent>;

#[derive(Default)]
pub(crate) struct Timers {
    monitors: BTreeMap<MonitorTimer, DropGuard>,
    countdown: Option<(u64, DropGuard)>,
    clock: Option<DropGuard>,
}

impl Timers {
    /// Starts and stops monitor timers so exactly `desired` are running.
    pub fn sync_monitors(
        &mut self,
        desired: &[MonitorTimer],
        period: impl Fn(MonitorTimer) -> Duration,
        inbox: &InboxSender,
        parent: &CancellationToken,
    ) {
        self.monitors.retain(|timer, _| {
            let keep = desired.contains(timer);
            if !keep {
                debug!(?timer, "stopping status timer");
            }
            keep
        });

        for &timer in desired {
            if self.monitors.contains_key(&timer) {
                continue;
            }
            debug!(?timer, "starting status timer");
            let guard = spawn_interval(period(timer), inbox.clone(), parent, move || {
                SessionEvent::MonitorTick { timer }
            });
            self.monitors.insert(timer, guard);
        }
    }

    /// Keeps one ticker/deadline pair for the showing notice, if any.
    pub fn sync_countdown(
        &mut self,
        episode: Option<u64>,
        length: Duration,
        inbox: &InboxSender,
        parent: &CancellationToken,
    ) {
        let running = self.countdown.as_ref().map(|(active, _)| *active);
        if running == episode {
            return;
        }
        self.countdown = None;

        if let Some(episode) = episode {
            debug!(episode, "starting countdown");
            let token = parent.child_token();
            spawn_ticker(
                Duration::from_secs(1),
                inbox.clone(),
                token.clone(),
                move || SessionEvent::CountdownTick { episode },
            );
            spawn_deadline(length, inbox.clone(), token.clone(), move || {
                SessionEvent::CountdownDeadline { episode }
            });
            self.countdown = Some((episode, token.drop_guard()));
        }
    }

    /// Starts the wall-clock ticker for relative times.
    pub fn start_clock(&mut self, period: Duration, inbox: &InboxSender, parent: &CancellationToken) {
        self.clock = Some(spawn_interval(period, inbox.clone(), parent, || {
            SessionEvent::ClockTick { now: Utc::now() }
        }));
    }

    pub fn clear(&mut self) {
        self.monitors.clear();
        self.countdown = None;
        self.clock = None;
    }

    #[cfg(test)]
    pub fn running_monitors(&self) -> Vec<MonitorTimer> {
        self.monitors.keys().copied().collect()
    }
}

fn spawn_interval<F>(
    period: Duration,
    inbox: InboxSender,
    parent: &CancellationToken,
    make_event: F,
) -> DropGuard
where
    F: Fn() -> SessionEvent + Send + 'static,
{
    let token = parent.child_token();
    spawn_ticker(period, inbox, token.clone(), make_event);
    token.drop_guard()
}

fn spawn_ticker<F>(period: Duration, inbox: InboxSender, token: CancellationToken, make_event: F)
where
    F: Fn() -> SessionEvent + Send + 'static,
{
    tokio::spawn(async move {
        // First tick one period from now, not immediately.
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                () = token.cancelled() => break,
                _ = ticker.tick() => {
                    if inbox.send(make_event()).is_err() {
                        break;
                    }
                }
            }
        }
    });
}

fn spawn_deadline<F>(after: Duration, inbox: InboxSender, token: CancellationToken, make_event: F)
where
    F: FnOnce() -> SessionEvent + Send + 'static,
{
    tokio::spawn(async move {
        tokio::select! {
            () = token.cancelled() => {}
            () = time::sleep(after) => {
                let _ = inbox.send(make_event());
            }
        }
    });
}
