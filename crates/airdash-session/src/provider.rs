//! Process-wide session context.
//!
//! The binary installs one context at boot; everything else reads it
//! through `context()`, which fails fast when nothing was installed.

use std::sync::OnceLock;

use thiserror::Error;

use crate::context::SessionContext;

static CONTEXT: OnceLock<SessionContext> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("session context used outside its provider; call provider::install at startup")]
    Missing,
    #[error("a session context is already installed")]
    AlreadyInstalled,
}

pub fn install(ctx: SessionContext) -> Result<(), ProviderError> {
    CONTEXT.set(ctx).map_err(|_| ProviderError::AlreadyInstalled)
}

pub fn context() -> Result<&'static SessionContext, ProviderError> {
    CONTEXT.get().ok_or(ProviderError::Missing)
}
