//! Error types for the room layer.

use heartfield_protocol::{CardId, RoomCode};
use heartfield_session::StoreError;

use crate::DrawKind;

/// Errors that can occur during room operations.
///
/// Every variant except [`RoomError::Storage`] rejects a single action
/// and leaves the room unchanged.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    // -- Validation --
    #[error("room code is required")]
    MissingRoomCode,

    /// A room document is missing a required field or has the wrong shape.
    #[error("invalid room data: {0}")]
    InvalidRoomData(String),

    #[error("room {0} not found")]
    RoomNotFound(RoomCode),

    // -- Membership --
    #[error("room {0} is full")]
    RoomFull(RoomCode),

    #[error("player is not in room {0}")]
    NotInRoom(RoomCode),

    #[error("player is already in room {0}")]
    AlreadyInAnotherRoom(RoomCode),

    // -- Turn / state --
    #[error("game has not started")]
    GameNotStarted,

    #[error("game has already started")]
    GameAlreadyStarted,

    #[error("not every player is ready")]
    PlayersNotReady,

    #[error("it is not your turn")]
    NotYourTurn,

    /// Another action for this room is being processed.
    #[error("another action is in progress for this room")]
    TurnInProgress,

    #[error("already drew a {0} card this turn")]
    DrawLimitReached(DrawKind),

    #[error("the {0} deck is empty")]
    DeckEmpty(DrawKind),

    #[error("heart placement limit reached for this turn")]
    HeartLimitReached,

    #[error("magic card limit reached for this turn")]
    MagicLimitReached,

    // -- Card legality --
    #[error("card {0} is not in your hand")]
    CardNotInHand(CardId),

    #[error("tile {0} not found")]
    TileNotFound(u32),

    #[error("tile {0} is already occupied")]
    TileAlreadyOccupied(u32),

    #[error("only heart cards can be placed on tiles")]
    OnlyHeartCardsPlaceable,

    #[error("card {0} is not a magic card")]
    NotAMagicCard(CardId),

    #[error("this card needs a target tile")]
    MissingTarget,

    #[error("wind must target a tile holding an opponent's heart")]
    InvalidTargetForWind,

    #[error("recycle can only target an empty tile")]
    InvalidTargetForRecycle,

    #[error("opponent is protected by a shield")]
    OpponentProtectedByShield,

    #[error("tiles are protected by the opponent's shield")]
    TileProtectedByShield,

    #[error("opponent already has an active shield")]
    OpponentShieldActive,

    // -- Storage --
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl RoomError {
    /// Stable machine-readable name sent to clients.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingRoomCode => "MissingRoomCode",
            Self::InvalidRoomData(_) => "InvalidRoomData",
            Self::RoomNotFound(_) => "RoomNotFound",
            Self::RoomFull(_) => "RoomFull",
            Self::NotInRoom(_) => "NotInRoom",
            Self::AlreadyInAnotherRoom(_) => "AlreadyInAnotherRoom",
            Self::GameNotStarted => "GameNotStarted",
            Self::GameAlreadyStarted => "GameAlreadyStarted",
            Self::PlayersNotReady => "PlayersNotReady",
            Self::NotYourTurn => "NotYourTurn",
            Self::TurnInProgress => "TurnInProgress",
            Self::DrawLimitReached(_) => "DrawLimitReached",
            Self::DeckEmpty(_) => "DeckEmpty",
            Self::HeartLimitReached => "HeartLimitReached",
            Self::MagicLimitReached => "MagicLimitReached",
            Self::CardNotInHand(_) => "CardNotInHand",
            Self::TileNotFound(_) => "TileNotFound",
            Self::TileAlreadyOccupied(_) => "TileAlreadyOccupied",
            Self::OnlyHeartCardsPlaceable => "OnlyHeartCardsPlaceable",
            Self::NotAMagicCard(_) => "NotAMagicCard",
            Self::MissingTarget => "MissingTarget",
            Self::InvalidTargetForWind => "InvalidTargetForWind",
            Self::InvalidTargetForRecycle => "InvalidTargetForRecycle",
            Self::OpponentProtectedByShield => "OpponentProtectedByShield",
            Self::TileProtectedByShield => "TileProtectedByShield",
            Self::OpponentShieldActive => "OpponentShieldActive",
            Self::Storage(_) => "StorageError",
        }
    }

    /// HTTP-style status code.
    pub fn status(&self) -> u16 {
        match self {
            Self::RoomNotFound(_) | Self::TileNotFound(_) => 404,
            Self::NotYourTurn | Self::NotInRoom(_) => 403,
            Self::RoomFull(_)
            | Self::AlreadyInAnotherRoom(_)
            | Self::GameNotStarted
            | Self::GameAlreadyStarted
            | Self::PlayersNotReady
            | Self::TurnInProgress => 409,
            Self::Storage(_) => 500,
            _ => 400,
        }
    }
}
