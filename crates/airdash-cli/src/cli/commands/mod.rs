//! CLI command handlers.

pub mod account;
pub mod auth;
pub mod config;
pub mod favorites;
pub mod recent;
pub mod watch;

use std::io::{self, BufRead, IsTerminal, Write};
use std::sync::Arc;

use airdash_core::api::SessionClient;
use airdash_core::config::Config;
use airdash_core::models::Session;
use airdash_session::{SessionContext, Settings};
use anyhow::{Context, Result, bail};

/// Starts the session runtime and waits for the stored session to resolve.
async fn start_session(config: &Config) -> Result<SessionContext> {
    let client = SessionClient::from_config(config).context("create API client")?;
    let ctx = SessionContext::start(Arc::new(client), Settings::from(config));
    ctx.wait_until_loaded().await;
    Ok(ctx)
}

/// Returns the signed-in user, or explains why there is none.
fn require_user(ctx: &SessionContext) -> Result<Session> {
    let snapshot = ctx.snapshot();
    if let Some(kind) = snapshot.modal.kind() {
        bail!("{}. Please sign in again.", kind.title());
    }
    snapshot
        .user
        .context("Not signed in. Run `airdash login` first.")
}

/// Uses the given password or reads one line from stdin.
fn read_password(given: Option<String>) -> Result<String> {
    if let Some(password) = given {
        return Ok(password);
    }

    let stdin = io::stdin();
    if stdin.is_terminal() {
        eprint!("Password: ");
        io::stderr().flush().ok();
    }
    let mut line = String::new();
    stdin
        .lock()
        .read_line(&mut line)
        .context("read password from stdin")?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        bail!("Password is required");
    }
    Ok(password)
}

fn display_name(user: &Session) -> String {
    let name = format!("{} {}", user.first_name, user.last_name);
    let name = name.trim();
    if name.is_empty() {
        user.email.clone()
    } else {
        format!("{name} <{}>", user.email)
    }
}
