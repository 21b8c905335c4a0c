//! Client session runtime for airdash.
//!
//! A single actor owns the session state. `SessionContext` handles send it
//! commands and observe snapshots; the runtime polls account status,
//! drives the account notice countdown and keeps the local stores in sync.

pub mod backend;
pub mod context;
pub mod effects;
pub mod events;
pub mod features;
pub mod provider;
pub mod runtime;
pub mod state;
pub mod update;

pub use backend::SessionBackend;
pub use context::SessionContext;
pub use events::{ActivityKind, Screen};
pub use features::auth::ErrorCode;
pub use features::favorites::{FavoriteOutcome, SkipReason};
pub use features::modal::{ModalKind, ModalState};
pub use state::{SessionSnapshot, Settings};
