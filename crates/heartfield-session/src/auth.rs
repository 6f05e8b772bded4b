//! The identity gate: who is on the other end of this socket?
//!
//! Heartfield never issues or refreshes tokens. Two external collaborators
//! do the real work:
//!
//! - an [`IdentityProvider`] turns a bearer token into [`Claims`]
//!   (JWT verification, an auth service call, ...);
//! - a [`UserStore`] confirms the subject still exists.
//!
//! [`IdentityGate`] runs both in order and maps every failure onto one of
//! four generic [`SessionError`] kinds. It only attaches an [`Identity`] to
//! the connection; it never touches game state.

use heartfield_protocol::{validate_player_name, UserId};
use rand::Rng;

use crate::{SessionError, StoreError};

/// Subject claims extracted from a verified token.
///
/// Every field is optional because providers differ; the gate decides what
/// is mandatory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Claims {
    pub id: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub session_marker: Option<String>,
}

/// A user record as returned by the [`UserStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: UserId,
    pub email: String,
    pub name: String,
}

/// The verified identity attached to a connection after the handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub user_email: String,
    pub user_name: String,
    pub user_session_id: String,
}

/// Verifies a client's bearer token.
///
/// # Example
///
/// ```rust
/// use heartfield_session::{Claims, IdentityProvider};
///
/// /// Treats the token itself as the subject id. Development only.
/// struct DevProvider;
///
/// impl IdentityProvider for DevProvider {
///     async fn verify(&self, token: &str) -> Option<Claims> {
///         Some(Claims {
///             id: Some(token.to_string()),
///             ..Claims::default()
///         })
///     }
/// }
/// ```
pub trait IdentityProvider: Send + Sync + 'static {
    /// Returns the token's claims, or `None` if the token is invalid,
    /// expired, or otherwise rejected.
    fn verify(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Option<Claims>> + Send;
}

/// Looks users up by id.
pub trait UserStore: Send + Sync + 'static {
    /// Returns `Ok(None)` when no user has this id.
    ///
    /// Callers only pass ids that satisfy [`UserId::is_storage_key`].
    fn find_by_id(
        &self,
        id: &UserId,
    ) -> impl std::future::Future<Output = Result<Option<UserRecord>, StoreError>>
    + Send;
}

/// Token verification followed by a user-store lookup.
pub struct IdentityGate<A, U> {
    provider: A,
    users: U,
}

impl<A: IdentityProvider, U: UserStore> IdentityGate<A, U> {
    pub fn new(provider: A, users: U) -> Self {
        Self { provider, users }
    }

    /// Admits a connection presenting `token`.
    ///
    /// # Errors
    /// - [`SessionError::AuthenticationRequired`] — token absent, empty,
    ///   rejected by the provider, or carrying no subject id
    /// - [`SessionError::InvalidIdentifierFormat`] — subject id is not a
    ///   24-hex key; the user store is not queried
    /// - [`SessionError::AuthenticationFailed`] — the lookup errored
    /// - [`SessionError::UserNotFound`] — the lookup found nothing
    pub async fn admit(
        &self,
        token: Option<&str>,
    ) -> Result<Identity, SessionError> {
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(SessionError::AuthenticationRequired)?;

        let claims = self
            .provider
            .verify(token)
            .await
            .ok_or(SessionError::AuthenticationRequired)?;

        let user_id = claims
            .id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(UserId::new)
            .ok_or(SessionError::AuthenticationRequired)?;

        if !user_id.is_storage_key() {
            tracing::debug!(%user_id, "subject id is not a storage key");
            return Err(SessionError::InvalidIdentifierFormat);
        }

        let user = match self.users.find_by_id(&user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                tracing::info!(%user_id, "authenticated subject has no user");
                return Err(SessionError::UserNotFound(user_id));
            }
            Err(e) => {
                tracing::warn!(%user_id, error = %e, "user lookup failed");
                return Err(SessionError::AuthenticationFailed);
            }
        };

        let user_name = validate_player_name(&user.name)
            .or_else(|| claims.name.as_deref().and_then(validate_player_name))
            .unwrap_or_else(|| "Player".to_string());
        let user_email = if user.email.is_empty() {
            claims.email.clone().unwrap_or_default()
        } else {
            user.email
        };
        let user_session_id = claims
            .session_marker
            .filter(|m| !m.is_empty())
            .unwrap_or_else(generate_session_marker);

        Ok(Identity {
            user_id,
            user_email,
            user_name,
            user_session_id,
        })
    }
}

/// Generates a random 32-character hex session marker (128 bits).
///
/// Used when the provider's claims carry no marker of their own.
fn generate_session_marker() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
