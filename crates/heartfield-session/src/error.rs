//! Error types for the session layer.

use heartfield_protocol::UserId;

use crate::StoreError;

/// Errors raised while admitting a connection or tracking its session.
///
/// The four authentication variants are the only ones a client ever
/// sees; underlying causes (database errors, provider responses) are
/// logged and never carried in the message.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No token, an empty token, or a token without a usable subject id.
    #[error("authentication required")]
    AuthenticationRequired,

    /// The subject id is not a well-formed user-store key.
    #[error("invalid identifier format")]
    InvalidIdentifierFormat,

    /// The user store has no record for the subject.
    #[error("user not found")]
    UserNotFound(UserId),

    /// The user store lookup itself failed.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// A session document could not be read or written.
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl SessionError {
    /// Stable machine-readable name sent to clients.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AuthenticationRequired => "AuthenticationRequired",
            Self::InvalidIdentifierFormat => "InvalidIdentifierFormat",
            Self::UserNotFound(_) => "UserNotFound",
            Self::AuthenticationFailed => "AuthenticationFailed",
            Self::Storage(_) => "StorageError",
        }
    }

    /// HTTP-style status code.
    pub fn status(&self) -> u16 {
        match self {
            Self::Storage(_) => 500,
            _ => 401,
        }
    }
}
