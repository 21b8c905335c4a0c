//! Sign-in, sign-out and account info.

use airdash_core::api::{ApiError, SessionClient};
use airdash_core::config::Config;
use anyhow::{Context, Result};
use tracing::debug;

use super::{display_name, read_password, require_user, start_session};

/// Skips opening a browser for `login --google` when set.
const NO_BROWSER_ENV: &str = "AIRDASH_NO_BROWSER";

pub async fn login(config: &Config, email: &str, password: Option<String>) -> Result<()> {
    let password = read_password(password)?;
    let ctx = start_session(config).await?;

    let user = ctx
        .login(email, &password)
        .await
        .map_err(with_hint)
        .context("Sign-in failed")?;
    ctx.close().await;

    println!("Signed in as {}", display_name(&user));
    Ok(())
}

/// Prints (and opens) the Google sign-in URL, or completes the sign-in
/// when the callback token is given.
pub async fn login_google(config: &Config, token: Option<&str>) -> Result<()> {
    let Some(token) = token else {
        let client = SessionClient::from_config(config).context("create API client")?;
        let url = client.google_auth_url();
        println!("Open this URL to sign in with Google:\n  {url}");
        if std::env::var_os(NO_BROWSER_ENV).is_none()
            && let Err(err) = open::that(&url)
        {
            debug!(error = %err, "could not open a browser");
        }
        println!("Then run: airdash login --google --token <token>");
        return Ok(());
    };

    let ctx = start_session(config).await?;
    let user = ctx
        .handle_google_callback(token)
        .await
        .context("Google sign-in failed")?;
    ctx.close().await;

    println!("Signed in as {}", display_name(&user));
    Ok(())
}

pub async fn logout(config: &Config) -> Result<()> {
    let ctx = start_session(config).await?;
    let was_signed_in = ctx.is_authenticated();
    ctx.logout().await;
    ctx.close().await;

    if was_signed_in {
        println!("Signed out.");
    } else {
        println!("Not signed in.");
    }
    Ok(())
}

pub async fn whoami(config: &Config) -> Result<()> {
    let ctx = start_session(config).await?;
    let user = require_user(&ctx);
    ctx.close().await;
    let user = user?;

    println!("{}", display_name(&user));
    println!("role: {}", user.role);
    if !user.favorites.is_empty() {
        let favorites: Vec<&str> = user.favorites.iter().map(String::as_str).collect();
        println!("favorites: {}", favorites.join(", "));
    }
    Ok(())
}

/// Adds what the user can do about a rejected sign-in.
fn with_hint(err: ApiError) -> anyhow::Error {
    match err {
        ApiError::AccountNotVerified(_) => anyhow::Error::new(err)
            .context("Verify your email first, or run `airdash resend-verification <email>`"),
        ApiError::AccountSuspended(_) => anyhow::Error::new(err)
            .context("Your account is suspended. Contact an administrator to restore access"),
        other => anyhow::Error::new(other),
    }
}
