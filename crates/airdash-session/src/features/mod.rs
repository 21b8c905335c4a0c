//! Feature slices of the session reducer.

pub mod auth;
pub mod favorites;
pub mod modal;
pub mod monitor;
pub mod recent;
