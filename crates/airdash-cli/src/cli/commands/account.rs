//! Account commands that need no session: registration, email
//! verification and password recovery.

use airdash_core::api::SessionClient;
use airdash_core::config::Config;
use airdash_core::models::RegisterRequest;
use anyhow::{Context, Result, bail};

use super::read_password;

fn client(config: &Config) -> Result<SessionClient> {
    SessionClient::from_config(config).context("create API client")
}

pub async fn register(
    config: &Config,
    email: String,
    first_name: String,
    last_name: String,
    password: Option<String>,
) -> Result<()> {
    let password = read_password(password)?;
    let request = RegisterRequest {
        email,
        password,
        first_name,
        last_name,
    };
    client(config)?
        .register(&request)
        .await
        .context("Registration failed")?;

    println!(
        "Account created. Check {} for a verification link.",
        request.email
    );
    Ok(())
}

pub async fn verify_email(config: &Config, token: &str) -> Result<()> {
    client(config)?
        .verify_email(token)
        .await
        .context("Email verification failed")?;
    println!("Email verified. You can now sign in.");
    Ok(())
}

pub async fn resend_verification(config: &Config, email: &str) -> Result<()> {
    client(config)?
        .resend_verification(email)
        .await
        .context("Could not resend the verification mail")?;
    println!("Verification mail sent to {email}.");
    Ok(())
}

pub async fn forgot_password(config: &Config, email: &str) -> Result<()> {
    client(config)?
        .forgot_password(email)
        .await
        .context("Could not request a password reset")?;
    println!("If an account exists for {email}, a reset link has been sent.");
    Ok(())
}

pub async fn reset_password(
    config: &Config,
    token: &str,
    password: Option<String>,
    check: bool,
) -> Result<()> {
    let client = client(config)?;

    if check {
        let valid = client
            .check_reset_token(token)
            .await
            .context("Could not check the reset link")?;
        if !valid {
            bail!("Reset link is invalid or has expired");
        }
        println!("Reset link is valid.");
        return Ok(());
    }

    let password = read_password(password)?;
    client
        .reset_password(token, &password)
        .await
        .context("Password reset failed")?;
    println!("Password updated. You can now sign in.");
    Ok(())
}
