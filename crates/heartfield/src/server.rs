//! `HeartfieldServer` builder and server loop.
//!
//! This is the entry point for running a Heartfield game server. It ties
//! together all the layers: transport → protocol → session → room.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use heartfield_protocol::JsonCodec;
use heartfield_room::{RoomRegistry, TurnLockManager};
use heartfield_session::{
    DocumentStore, IdentityGate, IdentityProvider, SessionRegistry, UserStore,
};
use heartfield_transport::{Transport, WebSocketTransport};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::handler::handle_connection;
use crate::outbox::Outbox;
use crate::{AdmissionControl, HeartfieldError, ServerConfig};

/// The current protocol version. Clients must send this in their
/// handshake or be rejected.
pub const PROTOCOL_VERSION: u32 = 1;

/// Shared server state passed to each connection handler task.
///
/// The registries sit behind `tokio` mutexes because their operations
/// await the document store. Everything else is locked only for
/// synchronous work and never across an `.await`.
pub(crate) struct ServerState<A, U, D> {
    pub(crate) config: ServerConfig,
    pub(crate) gate: IdentityGate<A, U>,
    pub(crate) sessions: tokio::sync::Mutex<SessionRegistry<D>>,
    pub(crate) rooms: tokio::sync::Mutex<RoomRegistry<D>>,
    pub(crate) locks: TurnLockManager,
    pub(crate) codec: JsonCodec,
    pub(crate) started: Instant,
    admission: Mutex<AdmissionControl>,
    outbox: Mutex<Outbox>,
    rng: Mutex<StdRng>,
}

impl<A, U, D> ServerState<A, U, D> {
    pub(crate) fn admission(&self) -> MutexGuard<'_, AdmissionControl> {
        self.admission.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn outbox(&self) -> MutexGuard<'_, Outbox> {
        self.outbox.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` with the server RNG.
    pub(crate) fn with_rng<R>(&self, f: impl FnOnce(&mut StdRng) -> R) -> R {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut rng)
    }

    /// Milliseconds since the server started.
    pub(crate) fn server_time(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

/// Builder for configuring and starting a Heartfield server.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use heartfield::prelude::*;
///
/// let server = HeartfieldServerBuilder::new()
///     .bind("0.0.0.0:8080")
///     .build(my_provider, my_users, Arc::new(sessions), Arc::new(rooms))
///     .await?;
/// server.run().await
/// ```
pub struct HeartfieldServerBuilder {
    config: ServerConfig,
}

impl HeartfieldServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Binds the listener and restores state from the stores.
    ///
    /// `session_store` and `room_store` are the two document collections.
    /// Rooms and active sessions found there are loaded before the first
    /// connection is accepted; unreadable documents are skipped.
    pub async fn build<A, U, D>(
        self,
        provider: A,
        users: U,
        session_store: Arc<D>,
        room_store: Arc<D>,
    ) -> Result<HeartfieldServer<A, U, D>, HeartfieldError>
    where
        A: IdentityProvider,
        U: UserStore,
        D: DocumentStore,
    {
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;

        let mut sessions = SessionRegistry::new(session_store);
        let active = sessions.load_active().await;
        let mut rooms = RoomRegistry::new(room_store, self.config.room.clone());
        let loaded = rooms.load().await;
        tracing::info!(sessions = active, rooms = loaded, "state restored");

        let rng = match self.config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let state = Arc::new(ServerState {
            gate: IdentityGate::new(provider, users),
            sessions: tokio::sync::Mutex::new(sessions),
            rooms: tokio::sync::Mutex::new(rooms),
            locks: TurnLockManager::new(),
            codec: JsonCodec,
            started: Instant::now(),
            admission: Mutex::new(AdmissionControl::new(
                self.config.max_connections_per_address,
            )),
            outbox: Mutex::new(Outbox::new()),
            rng: Mutex::new(rng),
            config: self.config,
        });

        Ok(HeartfieldServer { transport, state })
    }
}

impl Default for HeartfieldServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running Heartfield game server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct HeartfieldServer<A, U, D> {
    transport: WebSocketTransport,
    state: Arc<ServerState<A, U, D>>,
}

impl<A, U, D> HeartfieldServer<A, U, D>
where
    A: IdentityProvider,
    U: UserStore,
    D: DocumentStore,
{
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the server accept loop.
    ///
    /// The loop only takes TCP streams off the listener. Each one gets its
    /// own task, which runs admission, the WebSocket upgrade, the
    /// handshake, and the message loop. Runs until the process is
    /// terminated.
    pub async fn run(mut self) -> Result<(), HeartfieldError> {
        tracing::info!(addr = %self.state.config.bind_addr, "Heartfield server running");

        loop {
            match self.transport.accept().await {
                Ok(pending) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(pending, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
