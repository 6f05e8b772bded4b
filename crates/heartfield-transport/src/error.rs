//! Error types for the transport layer.

/// Errors that can occur while accepting, reading from, or writing to a
/// client channel.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection was closed.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// Binding the listener or accepting a TCP stream failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// The TCP stream was accepted but the WebSocket upgrade failed.
    #[error("websocket upgrade from {peer} failed: {reason}")]
    UpgradeFailed {
        peer: std::net::SocketAddr,
        reason: String,
    },

    /// The peer did not finish the WebSocket upgrade in time.
    #[error("websocket upgrade from {0} timed out")]
    UpgradeTimedOut(std::net::SocketAddr),
}
