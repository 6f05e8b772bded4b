//! Player identity and session management for Heartfield.
//!
//! This crate handles everything between "a socket opened" and "a known
//! player is talking to us":
//!
//! 1. **Identity gate** — verifies the bearer token with the external
//!    [`IdentityProvider`] and looks the subject up in the [`UserStore`]
//!    ([`IdentityGate`]).
//! 2. **Session registry** — one [`PlayerSession`] per subject, rebound to
//!    a fresh connection id on every reconnect ([`SessionRegistry`]).
//! 3. **Document storage** — the [`DocumentStore`] seam that sessions and
//!    rooms are mirrored to, plus in-memory implementations.
//!
//! # How it fits in the stack
//!
//! ```text
//! Room Layer (above)  ← keys rosters, hands and shields by UserId
//!     ↕
//! Session Layer (this crate)  ← identity and connection bookkeeping
//!     ↕
//! Protocol Layer (below)  ← UserId, ConnectionId
//! ```

#![allow(async_fn_in_trait)]

mod auth;
mod error;
mod memory;
mod registry;
mod session;
mod store;

pub use auth::{
    Claims, Identity, IdentityGate, IdentityProvider, UserRecord, UserStore,
};
pub use error::SessionError;
pub use memory::{MemoryStore, MemoryUserStore};
pub use registry::SessionRegistry;
pub use session::PlayerSession;
pub use store::{DocumentStore, StoreError};
