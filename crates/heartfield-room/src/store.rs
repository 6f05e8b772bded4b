//! The room ↔ document boundary.
//!
//! This is the only place that converts between typed [`Room`]s and the
//! `serde_json::Value` documents kept in the room collection.

use serde_json::Value;

use crate::{Room, RoomConfig, RoomError};

/// Serializes `room` into its stored document shape.
pub fn room_to_document(room: &Room) -> Result<Value, RoomError> {
    let doc = serde_json::to_value(room)
        .map_err(|e| RoomError::InvalidRoomData(e.to_string()))?;
    validate_document(&doc)?;
    Ok(doc)
}

/// Rebuilds a room from a stored document, applying `config`.
///
/// # Errors
/// [`RoomError::InvalidRoomData`] if the document fails
/// [`validate_document`] or does not parse as a room.
pub fn room_from_document(
    doc: Value,
    config: &RoomConfig,
) -> Result<Room, RoomError> {
    validate_document(&doc)?;
    let mut room: Room = serde_json::from_value(doc)
        .map_err(|e| RoomError::InvalidRoomData(e.to_string()))?;
    room.config = RoomConfig {
        max_players: room.max_players,
        ..config.clone()
    };
    Ok(room)
}

/// Checks that a document has a string `code`, an array `players` and an
/// object `gameState`.
pub fn validate_document(doc: &Value) -> Result<(), RoomError> {
    if !doc.get("code").is_some_and(Value::is_string) {
        return Err(RoomError::InvalidRoomData(
            "code is missing or not a string".into(),
        ));
    }
    if !doc.get("players").is_some_and(Value::is_array) {
        return Err(RoomError::InvalidRoomData(
            "players is missing or not an array".into(),
        ));
    }
    if !doc.get("gameState").is_some_and(Value::is_object) {
        return Err(RoomError::InvalidRoomData(
            "gameState is missing or not an object".into(),
        ));
    }
    Ok(())
}
