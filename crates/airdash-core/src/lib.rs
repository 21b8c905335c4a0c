//! Core airdash library (config, data model, HTTP client, client-side stores).

pub mod api;
pub mod config;
pub mod models;
pub mod relative_time;
pub mod store;
