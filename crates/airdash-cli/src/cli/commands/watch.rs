//! `airdash watch`: keeps the session runtime alive and reports what it
//! sees until interrupted or redirected to the login screen.

use airdash_core::config::Config;
use airdash_session::{Screen, SessionSnapshot};
use anyhow::{Context, Result};

use super::{display_name, require_user, start_session};
use crate::cli::WatchScreen;

impl From<WatchScreen> for Screen {
    fn from(screen: WatchScreen) -> Self {
        match screen {
            WatchScreen::Public => Screen::Public,
            WatchScreen::Dashboard => Screen::Dashboard,
            WatchScreen::Admin => Screen::Admin,
        }
    }
}

pub async fn run(config: &Config, screen: WatchScreen) -> Result<()> {
    let ctx = start_session(config).await?;
    let user = match require_user(&ctx) {
        Ok(user) => user,
        Err(err) => {
            ctx.close().await;
            return Err(err);
        }
    };

    println!("Watching {} (Ctrl+C to stop)", display_name(&user));
    ctx.set_screen(screen.into());

    let mut snapshots = ctx.subscribe();
    let mut last = describe(&snapshots.borrow_and_update());
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                result.context("listen for Ctrl+C")?;
                break;
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                let line = describe(&snapshot);
                if line != last {
                    println!("{line}");
                    last = line;
                }
                if snapshot.screen == Screen::Login {
                    break;
                }
                if !snapshot.is_authenticated && !snapshot.modal.is_showing() {
                    break;
                }
            }
        }
    }

    ctx.close().await;
    Ok(())
}

fn describe(snapshot: &SessionSnapshot) -> String {
    if let (Some(kind), Some(remaining)) = (snapshot.modal.kind(), snapshot.countdown()) {
        return format!("{}. Redirecting to login in {remaining}s", kind.title());
    }
    if snapshot.screen == Screen::Login {
        return "Redirected to login.".to_string();
    }
    match &snapshot.user {
        Some(user) => format!(
            "Signed in as {} ({} favorites)",
            display_name(user),
            user.favorites.len()
        ),
        None => "Signed out.".to_string(),
    }
}
