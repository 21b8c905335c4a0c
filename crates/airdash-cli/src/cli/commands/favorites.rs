//! Favorite city commands.

use airdash_core::config::Config;
use airdash_session::{FavoriteOutcome, SessionContext, SkipReason};
use anyhow::{Result, bail};

use super::{require_user, start_session};

pub async fn list(config: &Config) -> Result<()> {
    let ctx = start_session(config).await?;
    let user = require_user(&ctx);
    ctx.close().await;

    let user = user?;
    if user.favorites.is_empty() {
        println!("No favorite cities.");
    }
    for city_id in &user.favorites {
        println!("{city_id}");
    }
    Ok(())
}

pub async fn add(config: &Config, city_id: &str) -> Result<()> {
    let ctx = start_session(config).await?;
    let outcome = edit(&ctx, city_id, true).await;
    ctx.close().await;

    match outcome? {
        FavoriteOutcome::Skipped(SkipReason::AlreadyInState) => {
            println!("{city_id} is already a favorite.");
        }
        _ => println!("Added {city_id} to favorites."),
    }
    Ok(())
}

pub async fn remove(config: &Config, city_id: &str) -> Result<()> {
    let ctx = start_session(config).await?;
    let outcome = edit(&ctx, city_id, false).await;
    ctx.close().await;

    match outcome? {
        FavoriteOutcome::Skipped(SkipReason::AlreadyInState) => {
            println!("{city_id} is not a favorite.");
        }
        _ => println!("Removed {city_id} from favorites."),
    }
    Ok(())
}

/// Runs one edit; rollbacks and missing sessions become errors.
async fn edit(ctx: &SessionContext, city_id: &str, add: bool) -> Result<FavoriteOutcome> {
    require_user(ctx)?;
    let outcome = if add {
        ctx.add_favorite(city_id).await
    } else {
        ctx.remove_favorite(city_id).await
    };

    match outcome {
        FavoriteOutcome::RolledBack(err) => {
            Err(anyhow::Error::new(err).context(format!("Failed to update favorite {city_id}")))
        }
        FavoriteOutcome::Skipped(reason @ SkipReason::AlreadyInState) => {
            Ok(FavoriteOutcome::Skipped(reason))
        }
        FavoriteOutcome::Skipped(reason) => bail!("Favorite {city_id} not changed: {reason}"),
        FavoriteOutcome::Confirmed => Ok(FavoriteOutcome::Confirmed),
    }
}
