//! Transport abstraction layer for Heartfield.
//!
//! Provides the [`Transport`] and [`Connection`] traits that abstract over
//! the persistent bidirectional channel clients connect through.
//!
//! # Feature Flags
//!
//! - `websocket` (default) — WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{PendingWebSocket, WebSocketConnection, WebSocketTransport};

use std::fmt;
use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

/// Opaque identifier for a connection.
///
/// A reconnecting client always gets a fresh `ConnectionId`, which is how
/// the session layer tells an old socket apart from its replacement.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts new incoming connections.
///
/// Accepting only takes the raw stream off the listener. The protocol
/// upgrade happens later through [`PendingConnection::upgrade`], so a slow
/// peer never holds up the accept loop.
pub trait Transport: Send + Sync + 'static {
    /// An accepted stream that still has to be upgraded.
    type Pending: PendingConnection<
            Connection = Self::Connection,
            Error = Self::Error,
        >;
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for and accepts the next incoming stream.
    async fn accept(&mut self) -> Result<Self::Pending, Self::Error>;

    /// Gracefully shuts down the transport, stopping new connections.
    async fn shutdown(&self) -> Result<(), Self::Error>;
}

/// An accepted stream whose upgrade has not run yet.
pub trait PendingConnection: Send + 'static {
    /// The connection type the upgrade produces.
    type Connection: Connection;
    /// The error type for a failed upgrade.
    type Error: std::error::Error + Send + Sync;

    /// Returns the remote address, known before the upgrade.
    fn peer_addr(&self) -> SocketAddr;

    /// Completes the upgrade. Callers bound this with a timeout.
    async fn upgrade(self) -> Result<Self::Connection, Self::Error>;
}

/// A single connection that can send and receive bytes.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Sends data to the remote peer.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Receives the next message from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Closes the connection.
    async fn close(&self) -> Result<(), Self::Error>;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;

    /// Returns the remote address the connection came from.
    ///
    /// Admission control budgets connections per source address.
    fn peer_addr(&self) -> SocketAddr;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_new_and_into_inner() {
        let id = ConnectionId::new(42);
        assert_eq!(id.into_inner(), 42);
    }

    #[test]
    fn test_connection_id_display() {
        let id = ConnectionId::new(7);
        assert_eq!(id.to_string(), "conn-7");
    }

    #[test]
    fn test_connection_id_serializes_as_plain_number() {
        // Session documents store the current socket id; it must stay a
        // bare number on the wire.
        let json = serde_json::to_string(&ConnectionId::new(9)).unwrap();
        assert_eq!(json, "9");
        let back: ConnectionId = serde_json::from_str("9").unwrap();
        assert_eq!(back, ConnectionId::new(9));
    }

    #[test]
    fn test_connection_id_hash_works_as_map_key() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(ConnectionId::new(1), "alice");
        map.insert(ConnectionId::new(2), "bob");
        assert_eq!(map[&ConnectionId::new(1)], "alice");
    }
}
