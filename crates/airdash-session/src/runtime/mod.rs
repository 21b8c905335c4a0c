//! Session runtime: owns the state, runs the event loop, executes effects.
//!
//! This is the "Elm runtime" boundary: all side effects happen here.
//! The reducer stays pure and produces effects; this module executes them.
//!
//! ## Inbox Pattern
//!
//! Context handles, timers and spawned API calls all post `SessionEvent`s
//! to one unbounded inbox. The runtime processes them strictly in order,
//! so the state has a single writer.
//!
//! After every event the runtime reconciles timers with the new state
//! and publishes a `SessionSnapshot` on a watch channel.

mod timers;

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use timers::{InboxSender, Timers};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::SessionBackend;
use crate::effects::SessionEffect;
use crate::events::{SessionEvent, SignIn};
use crate::features::favorites::FavoriteDirection;
use crate::features::monitor;
use crate::state::{SessionSnapshot, SessionState, Settings};
use crate::update;

pub struct SessionRuntime<B> {
    state: SessionState,
    backend: Arc<B>,
    /// Inbox sender - handles, timers and tasks send events here.
    inbox_tx: InboxSender,
    inbox_rx: mpsc::UnboundedReceiver<SessionEvent>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
    timers: Timers,
    /// Cancelled on shutdown; parent of every timer and task token.
    shutdown: CancellationToken,
}

impl<B: SessionBackend> SessionRuntime<B> {
    pub fn new(backend: Arc<B>, settings: Settings) -> Self {
        let state = SessionState::new(settings);
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, _) = watch::channel(SessionSnapshot::from(&state));
        Self {
            state,
            backend,
            inbox_tx,
            inbox_rx,
            snapshot_tx,
            timers: Timers::default(),
            shutdown: CancellationToken::new(),
        }
    }

    pub(crate) fn inbox(&self) -> InboxSender {
        self.inbox_tx.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Restores the stored session, then processes the inbox until shutdown.
    pub async fn run(mut self) {
        let stored = self.backend.restore();
        let recent = self.backend.load_recent();
        self.dispatch(SessionEvent::Restored {
            stored,
            recent,
            now: Utc::now(),
        });
        self.timers.start_clock(
            self.state.settings.clock_interval,
            &self.inbox_tx,
            &self.shutdown,
        );

        loop {
            let event = tokio::select! {
                biased;
                () = self.shutdown.cancelled() => None,
                event = self.inbox_rx.recv() => event,
            };
            let Some(event) = event else {
                break;
            };
            self.dispatch(event);
        }

        self.timers.clear();
        info!("session runtime stopped");
    }

    fn dispatch(&mut self, event: SessionEvent) {
        let effects = update::update(&mut self.state, event);
        for effect in effects {
            self.execute_effect(effect);
        }
        self.sync_timers();
        self.publish();
    }

    /// Starts and stops timers so they match the current state.
    fn sync_timers(&mut self) {
        let desired = monitor::desired_timers(&self.state);
        let settings = &self.state.settings;
        self.timers.sync_monitors(
            &desired,
            |timer| settings.interval(timer),
            &self.inbox_tx,
            &self.shutdown,
        );
        self.timers.sync_countdown(
            self.state.modal.episode(),
            settings.countdown(),
            &self.inbox_tx,
            &self.shutdown,
        );
    }

    fn publish(&self) {
        let next = SessionSnapshot::from(&self.state);
        self.snapshot_tx.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }

    fn execute_effect(&mut self, effect: SessionEffect) {
        match effect {
            SessionEffect::CheckStatus {
                epoch,
                known_role,
                reply,
            } => {
                let backend = Arc::clone(&self.backend);
                self.spawn_effect(move || async move {
                    let result = backend.get_status(known_role).await;
                    SessionEvent::StatusChecked {
                        epoch,
                        result,
                        reply,
                    }
                });
            }
            SessionEffect::SignIn {
                epoch,
                request,
                reply,
            } => {
                let backend = Arc::clone(&self.backend);
                self.spawn_effect(move || async move {
                    let result = match request {
                        SignIn::Password { email, password } => {
                            backend.login(&email, &password).await
                        }
                        SignIn::Google { token } => backend.handle_google_callback(&token).await,
                    };
                    SessionEvent::SignedIn {
                        epoch,
                        result,
                        reply,
                    }
                });
            }
            SessionEffect::Register { request, reply } => {
                let backend = Arc::clone(&self.backend);
                let cancel = self.shutdown.child_token();
                tokio::spawn(async move {
                    tokio::select! {
                        () = cancel.cancelled() => {}
                        result = backend.register(&request) => reply.send(result),
                    }
                });
            }
            SessionEffect::UpdateProfile {
                epoch,
                update,
                reply,
            } => {
                let backend = Arc::clone(&self.backend);
                self.spawn_effect(move || async move {
                    let result = backend.update_profile(&update).await;
                    SessionEvent::ProfileUpdated {
                        epoch,
                        result,
                        reply,
                    }
                });
            }
            SessionEffect::UpdatePassword {
                epoch,
                update,
                reply,
            } => {
                let backend = Arc::clone(&self.backend);
                self.spawn_effect(move || async move {
                    let result = backend.update_password(&update).await;
                    SessionEvent::PasswordUpdated {
                        epoch,
                        result,
                        reply,
                    }
                });
            }
            SessionEffect::SyncFavorite { epoch, edit, reply } => {
                let backend = Arc::clone(&self.backend);
                self.spawn_effect(move || async move {
                    let result = match edit.direction {
                        FavoriteDirection::Add => backend.add_favorite(&edit.city_id).await,
                        FavoriteDirection::Remove => backend.remove_favorite(&edit.city_id).await,
                    };
                    SessionEvent::FavoriteSettled {
                        epoch,
                        edit,
                        result,
                        reply,
                    }
                });
            }

            SessionEffect::PersistUser { user } => {
                if let Err(err) = self.backend.persist_user(&user) {
                    warn!(error = %format!("{err:#}"), "failed to persist session");
                }
            }
            SessionEffect::StoreAuth { stored } => {
                if let Err(err) = self.backend.store_auth(&stored) {
                    warn!(error = %format!("{err:#}"), "failed to store credential");
                }
            }
            SessionEffect::DiscardCredential { token } => {
                if let Err(err) = self.backend.discard_credential(&token) {
                    warn!(error = %format!("{err:#}"), "failed to discard credential");
                }
            }
            SessionEffect::PersistRecent { cities } => {
                if let Err(err) = self.backend.save_recent(&cities) {
                    warn!(error = %format!("{err:#}"), "failed to persist recent cities");
                }
            }
            SessionEffect::ClearRecent => {
                if let Err(err) = self.backend.clear_recent() {
                    warn!(error = %format!("{err:#}"), "failed to clear recent cities");
                }
            }
            SessionEffect::ClearSession => {
                if let Err(err) = self.backend.logout() {
                    warn!(error = %format!("{err:#}"), "failed to clear stored session");
                }
            }

            SessionEffect::Ack(reply) => reply.send(()),
            SessionEffect::Shutdown => {
                debug!("shutdown requested");
                self.shutdown.cancel();
            }
        }
    }

    /// Spawns an async task whose result is posted back to the inbox.
    /// The task is dropped if the runtime shuts down first.
    fn spawn_effect<F, Fut>(&self, f: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = SessionEvent> + Send + 'static,
    {
        let tx = self.inbox_tx.clone();
        let cancel = self.shutdown.child_token();
        tokio::spawn(async move {
            tokio::select! {
                () = cancel.cancelled() => {}
                event = f() => {
                    let _ = tx.send(event);
                }
            }
        });
    }
}
