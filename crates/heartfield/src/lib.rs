//! # Heartfield
//!
//! Authoritative real-time session engine for a two-player tile and card
//! game.
//!
//! Clients connect over WebSocket, present a bearer token from an external
//! identity provider, and join rooms by six-character code. The server owns
//! all game truth: rosters, turn order, hands, the board, decks and
//! shields. Rules live in `heartfield-room`; this crate wires the layers
//! together and runs one task per connection.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use heartfield::prelude::*;
//!
//! // Implement IdentityProvider and UserStore for your auth backend, then:
//! // let server = HeartfieldServerBuilder::new()
//! //     .config(ServerConfig::from_env())
//! //     .build(provider, users, session_store, room_store)
//! //     .await?;
//! // server.run().await
//! ```

mod admission;
mod config;
mod error;
mod handler;
mod outbox;
mod server;

pub use admission::{AdmissionControl, AdmissionError};
pub use config::ServerConfig;
pub use error::HeartfieldError;
pub use server::{HeartfieldServer, HeartfieldServerBuilder, PROTOCOL_VERSION};

/// Everything needed to run a server and talk to it.
pub mod prelude {
    pub use crate::{
        AdmissionError, HeartfieldError, HeartfieldServer,
        HeartfieldServerBuilder, PROTOCOL_VERSION, ServerConfig,
    };
    pub use heartfield_protocol::{
        CardId, Codec, ConnectionId, Envelope, JsonCodec, Payload, Recipient,
        RoomCode, SystemMessage, UserId,
    };
    pub use heartfield_room::{
        Card, ClientAction, DrawKind, GamePhase, Room, RoomConfig, RoomError,
        RoomEvent,
    };
    pub use heartfield_session::{
        Claims, DocumentStore, IdentityProvider, MemoryStore, MemoryUserStore,
        SessionError, UserRecord, UserStore,
    };
}
