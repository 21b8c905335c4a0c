//! Recently viewed city commands.

use airdash_core::config::Config;
use airdash_core::models::CityRef;
use anyhow::Result;

use super::{require_user, start_session};

pub async fn list(config: &Config) -> Result<()> {
    let ctx = start_session(config).await?;
    let cities = ctx.recent_cities();
    ctx.close().await;

    if cities.is_empty() {
        println!("No recently viewed cities.");
        return Ok(());
    }
    for city in cities {
        println!("{} ({})  {}", city.name, city.id, city.formatted_time);
    }
    Ok(())
}

pub async fn add(config: &Config, id: String, name: String, slug: Option<String>) -> Result<()> {
    let ctx = start_session(config).await?;
    if let Err(err) = require_user(&ctx) {
        ctx.close().await;
        return Err(err);
    }

    let slug = slug.unwrap_or_else(|| id.clone());
    ctx.add_recent_city(CityRef::new(id, name.clone(), slug));
    ctx.close().await;

    println!("Recorded a view of {name}.");
    Ok(())
}

pub async fn clear(config: &Config) -> Result<()> {
    let ctx = start_session(config).await?;
    ctx.clear_recent_cities();
    ctx.close().await;

    println!("Cleared recently viewed cities.");
    Ok(())
}
