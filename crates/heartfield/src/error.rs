//! Unified error type for the Heartfield server.

use heartfield_protocol::ProtocolError;
use heartfield_room::RoomError;
use heartfield_session::SessionError;
use heartfield_transport::TransportError;

use crate::AdmissionError;

/// Top-level error that wraps all crate-specific errors.
///
/// The handler turns every rejected request into one of these and sends
/// its [`kind`](Self::kind) and [`status`](Self::status) back to the
/// client as a `SystemMessage::Error`.
#[derive(Debug, thiserror::Error)]
pub enum HeartfieldError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Room(#[from] RoomError),

    #[error(transparent)]
    Admission(#[from] AdmissionError),

    /// A room request came from a player without a seat anywhere.
    #[error("not seated in any room")]
    NotSeated,
}

impl HeartfieldError {
    /// Stable machine-readable name sent to clients.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "TransportError",
            Self::Protocol(ProtocolError::InvalidRoomCode(_)) => "InvalidRoomCode",
            Self::Protocol(_) => "InvalidMessage",
            Self::Session(e) => e.kind(),
            Self::Room(e) => e.kind(),
            Self::Admission(e) => e.kind(),
            Self::NotSeated => "NotInRoom",
        }
    }

    /// HTTP-style status code.
    pub fn status(&self) -> u16 {
        match self {
            Self::Transport(_) => 500,
            Self::Protocol(_) => 400,
            Self::Session(e) => e.status(),
            Self::Room(e) => e.status(),
            Self::Admission(e) => e.status(),
            Self::NotSeated => 403,
        }
    }
}
