//! Recently viewed cities, persisted as a JSON array (most-recent-first).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::warn;

use super::{remove_if_exists, write_private};
use crate::config::paths;
use crate::models::RecentCity;

#[derive(Debug, Clone)]
pub struct RecentStore {
    path: PathBuf,
}

impl RecentStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `${AIRDASH_HOME}/recent_cities.json`.
    pub fn at_default_path() -> Self {
        Self::new(paths::recent_cities_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the list; a missing or unreadable file yields an empty list.
    pub fn load(&self) -> Vec<RecentCity> {
        if !self.path.exists() {
            return Vec::new();
        }

        let parsed = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))
            .and_then(|contents| {
                serde_json::from_str::<Vec<RecentCity>>(&contents)
                    .with_context(|| format!("Failed to parse {}", self.path.display()))
            });

        match parsed {
            Ok(cities) => cities,
            Err(err) => {
                warn!(error = %format!("{err:#}"), "discarding unreadable recent cities");
                Vec::new()
            }
        }
    }

    pub fn save(&self, cities: &[RecentCity]) -> Result<()> {
        let contents =
            serde_json::to_string_pretty(cities).context("Failed to serialize recent cities")?;
        write_private(&self.path, &contents)
    }

    pub fn clear(&self) -> Result<()> {
        remove_if_exists(&self.path)
    }
}
