//! Development server: in-memory stores and an identity provider that
//! trusts whatever the client claims.
//!
//! Tokens look like `<24 hex id>:<display name>`, e.g.
//! `65f0a1b2c3d4e5f60718293a:Alice`. Never run this outside development.

use std::sync::Arc;

use heartfield::prelude::*;
use heartfield_session::StoreError;

// ---------------------------------------------------------------------------
// Development collaborators
// ---------------------------------------------------------------------------

/// Splits `<id>:<name>` into claims. Anything without a colon is refused.
struct DevProvider;

impl IdentityProvider for DevProvider {
    async fn verify(&self, token: &str) -> Option<Claims> {
        let (id, name) = token.split_once(':')?;
        Some(Claims {
            id: Some(id.to_string()),
            email: Some(format!("{id}@dev.local")),
            name: Some(name.to_string()),
            session_marker: None,
        })
    }
}

/// Knows every well-formed id. Names come from the token.
struct DevUsers;

impl UserStore for DevUsers {
    async fn find_by_id(
        &self,
        id: &UserId,
    ) -> Result<Option<UserRecord>, StoreError> {
        Ok(Some(UserRecord {
            id: id.clone(),
            email: String::new(),
            name: String::new(),
        }))
    }
}

// ---------------------------------------------------------------------------
// Server bootstrap
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = ServerConfig::from_env();
    tracing::info!(addr = %config.bind_addr, "starting heartfield dev server");

    let server = HeartfieldServerBuilder::new()
        .config(config)
        .build(
            DevProvider,
            DevUsers,
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryStore::new()),
        )
        .await?;

    server.run().await?;
    Ok(())
}
