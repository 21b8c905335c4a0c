//! Dashboard REST API access.

mod client;
mod envelope;
mod error;

pub use client::{NO_TOKEN_MESSAGE, SessionClient};
pub use error::ApiError;
