//! Rooms and game rules for Heartfield.
//!
//! A room is one two-player game: a roster, a board of colored tiles, two
//! decks, per-player hands, and at most one shield. This crate owns every
//! rule that touches that state and the registry that keeps rooms alive.
//!
//! # Key types
//!
//! - [`Room`] / [`GameState`] — the aggregate and its serializable state
//! - [`Card`] — the closed set of cards and their effects
//! - [`ClientAction`] / [`RoomEvent`] — what players send and receive
//! - [`RoomRegistry`] — rooms by code, mirrored to a document store
//! - [`TurnLockManager`] — per-room, owner-tagged, non-blocking locks
//!
//! # How it fits in the stack
//!
//! ```text
//! Server (above)  ← lock → apply_action → save → broadcast
//!     ↕
//! Room Layer (this crate)  ← rules, effects, end detection, migration
//!     ↕
//! Session Layer (below)  ← Identity, DocumentStore
//! ```

mod actions;
mod card;
mod config;
mod effects;
mod end;
mod error;
mod event;
mod game;
mod lock;
mod migration;
mod registry;
mod state;
mod store;

pub use actions::RoomEvents;
pub use card::{Card, DrawKind, HeartCard, MagicCard, TileColor, MAX_HEART_VALUE};
pub use config::{GamePhase, RoomConfig};
pub use effects::EffectResult;
pub use end::{
    GameEndCheck, GameOutcome, REASON_DECKS_EMPTY, REASON_OPPONENT_LEFT,
    REASON_TILES_FILLED,
};
pub use error::RoomError;
pub use event::{ClientAction, RoomEvent};
pub use lock::{TurnLockGuard, TurnLockManager};
pub use migration::MigrationOutcome;
pub use registry::{JoinOutcome, LeaveOutcome, RoomRegistry};
pub use state::{
    generate_tiles, Deck, GameState, PlacedHeart, Player, PlayerActions, Room,
    Shield, Tile, SHIELD_DURATION,
};
pub use store::{room_from_document, room_to_document, validate_document};
