//! Identifier newtypes shared by every layer.
//!
//! All three wrap a `String` and serialize transparently, so a `UserId`
//! is just `"65f0c0ffee..."` on the wire and inside stored documents.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{validate_room_code, ProtocolError};

/// Length of a room code.
pub const ROOM_CODE_LEN: usize = 6;

/// Length of a well-formed user-store key (hex characters).
pub const USER_ID_LEN: usize = 24;

// ---------------------------------------------------------------------------
// UserId
// ---------------------------------------------------------------------------

/// The identity of an authenticated subject.
///
/// Stable per subject, but a room may *migrate* a roster entry from one
/// `UserId` to another when a client re-authenticates mid-game.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if this id is a 24-character hex key the user store
    /// can be queried with.
    pub fn is_storage_key(&self) -> bool {
        self.0.len() == USER_ID_LEN
            && self.0.bytes().all(|b| b.is_ascii_hexdigit())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// RoomCode
// ---------------------------------------------------------------------------

/// A validated, upper-cased six-character room code.
///
/// Deserialization goes through [`RoomCode::parse`], so a stored document
/// with a malformed code is rejected instead of loaded.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct RoomCode(String);

impl RoomCode {
    /// Validates and case-normalizes a raw room code.
    ///
    /// Surrounding whitespace is not trimmed: `" ABC12"` is invalid.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidRoomCode`] unless `raw` is exactly
    /// six ASCII letters or digits.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        if !validate_room_code(Some(raw)) {
            return Err(ProtocolError::InvalidRoomCode(raw.to_string()));
        }
        Ok(Self(raw.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RoomCode {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RoomCode> for String {
    fn from(code: RoomCode) -> Self {
        code.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// CardId
// ---------------------------------------------------------------------------

/// Identifies one card instance within a game.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(String);

impl CardId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
