//! Wire protocol for Heartfield.
//!
//! This crate defines the "language" clients and the session engine speak:
//!
//! - **Identifiers** ([`UserId`], [`RoomCode`], [`CardId`]) — the keys
//!   every other layer indexes by, validated at construction.
//! - **Types** ([`Envelope`], [`SystemMessage`], [`Payload`]) — the message
//!   structures that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those messages
//!   are converted to/from bytes.
//! - **Validation** ([`validate_room_code`], [`validate_player_name`]) —
//!   checks applied to raw client input.
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope) → Session (identity) → Room (game)
//! ```

mod clock;
mod codec;
mod error;
mod ids;
mod types;
mod validation;

pub use clock::now_millis;
pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use heartfield_transport::ConnectionId;
pub use ids::{CardId, RoomCode, UserId, ROOM_CODE_LEN, USER_ID_LEN};
pub use types::{Envelope, Payload, Recipient, SystemMessage};
pub use validation::{
    validate_player_name, validate_room_code, MAX_PLAYER_NAME_LEN,
};
