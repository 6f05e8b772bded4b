//! Per-connection handler: admission, handshake, and message routing.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Take an admission slot for the peer address, then finish the
//!      WebSocket upgrade under the handshake timeout
//!   2. Receive Handshake → validate version → admit the token
//!   3. Bind the session, start the writer task, queue HandshakeAck
//!   4. Loop: receive envelopes → dispatch system or game messages
//!
//! Everything sent after the handshake goes through the [`Outbox`], so
//! replies and room broadcasts share one ordered, sequenced stream.
//!
//! [`Outbox`]: crate::outbox::Outbox

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;

use heartfield_protocol::{
    Codec, ConnectionId, Envelope, JsonCodec, Payload, ProtocolError,
    Recipient, RoomCode, SystemMessage, UserId,
};
use heartfield_room::{ClientAction, RoomError, RoomEvent, RoomEvents};
use heartfield_session::{DocumentStore, Identity, IdentityProvider, UserStore};
use heartfield_transport::{
    Connection, PendingConnection, PendingWebSocket, TransportError,
    WebSocketConnection,
};
use tokio::task::JoinHandle;

use crate::outbox::PayloadRx;
use crate::server::{PROTOCOL_VERSION, ServerState};
use crate::HeartfieldError;

/// Returns the peer's admission slot when the handler exits.
struct AdmissionGuard<A, U, D> {
    addr: IpAddr,
    state: Arc<ServerState<A, U, D>>,
}

impl<A, U, D> Drop for AdmissionGuard<A, U, D> {
    fn drop(&mut self) {
        self.state.admission().release(self.addr);
    }
}

/// Drop guard that disconnects a player's session when the handler exits.
///
/// This ensures cleanup happens even if the handler panics. Since `Drop`
/// is synchronous, we spawn a fire-and-forget task for the async lock.
struct SessionGuard<A, U, D>
where
    A: IdentityProvider,
    U: UserStore,
    D: DocumentStore,
{
    user_id: UserId,
    conn_id: ConnectionId,
    state: Arc<ServerState<A, U, D>>,
}

impl<A, U, D> Drop for SessionGuard<A, U, D>
where
    A: IdentityProvider,
    U: UserStore,
    D: DocumentStore,
{
    fn drop(&mut self) {
        self.state.outbox().unregister(self.conn_id);

        let user_id = self.user_id.clone();
        let conn_id = self.conn_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let mut sessions = state.sessions.lock().await;
            sessions.disconnect(&user_id, conn_id).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<A, U, D>(
    pending: PendingWebSocket,
    state: Arc<ServerState<A, U, D>>,
) -> Result<(), HeartfieldError>
where
    A: IdentityProvider,
    U: UserStore,
    D: DocumentStore,
{
    let peer = pending.peer_addr();
    let addr = peer.ip();

    // --- Step 1: Admission ---
    let admitted = state.admission().try_admit(addr);
    let _admission = admitted.is_ok().then(|| AdmissionGuard {
        addr,
        state: Arc::clone(&state),
    });

    // The upgrade shares the handshake budget; a peer that never sends
    // its upgrade request is dropped here.
    let conn = tokio::time::timeout(
        state.config.handshake_timeout,
        pending.upgrade(),
    )
    .await
    .map_err(|_| TransportError::UpgradeTimedOut(peer))??;
    let conn_id = conn.id();
    tracing::debug!(%conn_id, %addr, "handling new connection");

    if let Err(e) = admitted {
        tracing::warn!(%conn_id, %addr, "connection refused: address over budget");
        let err = HeartfieldError::from(e);
        send_direct(&conn, &*state, &err).await?;
        let _ = conn.close().await;
        return Err(err);
    }

    // --- Step 2: Handshake ---
    let identity = perform_handshake(&conn, &*state).await?;
    let user_id = identity.user_id.clone();

    // --- Step 3: Session + writer ---
    let (session, online) = {
        let mut sessions = state.sessions.lock().await;
        let session = sessions.bind_socket(&identity, conn_id).await;
        (session, sessions.active_count())
    };
    let rx = state.outbox().register(conn_id);
    let _guard = SessionGuard {
        user_id: user_id.clone(),
        conn_id,
        state: Arc::clone(&state),
    };

    let conn = Arc::new(conn);
    let writer = spawn_writer(Arc::clone(&conn), rx, state.codec, state.started);

    let ctx = ConnectionCtx {
        state: &*state,
        conn_id,
        identity,
    };
    ctx.reply(Payload::System(SystemMessage::HandshakeAck {
        user_id: user_id.clone(),
        session_id: session.user_session_id,
        server_time: state.server_time(),
    }));
    tracing::info!(%conn_id, %user_id, online, "player authenticated");

    // --- Step 4: Message loop ---
    loop {
        let data = match tokio::time::timeout(
            state.config.idle_timeout,
            conn.recv(),
        )
        .await
        {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                tracing::info!(%user_id, "connection closed cleanly");
                break;
            }
            Ok(Err(e)) => {
                tracing::debug!(%user_id, error = %e, "recv error");
                break;
            }
            Err(_) => {
                tracing::info!(%user_id, "connection timed out");
                break;
            }
        };

        let envelope: Envelope = match state.codec.decode(&data) {
            Ok(env) => env,
            Err(e) => {
                tracing::debug!(%user_id, error = %e, "failed to decode envelope");
                continue;
            }
        };

        match envelope.payload {
            Payload::System(msg) => match ctx.handle_system_message(msg).await {
                Ok(true) => break,
                Ok(false) => {}
                Err(e) => ctx.reject(&e),
            },
            Payload::Game(data) => {
                if let Err(e) = ctx.handle_game_message(&data).await {
                    ctx.reject(&e);
                }
            }
        }
    }

    // Closing the writer's channel lets it flush what is queued and stop.
    state.outbox().unregister(conn_id);
    let _ = writer.await;
    let _ = conn.close().await;

    // _guard drops here → session disconnect fires.
    Ok(())
}

/// Performs the handshake: receive Handshake, check the version, admit the
/// token. Errors are reported to the client before returning.
async fn perform_handshake<A, U, D>(
    conn: &WebSocketConnection,
    state: &ServerState<A, U, D>,
) -> Result<Identity, HeartfieldError>
where
    A: IdentityProvider,
    U: UserStore,
    D: DocumentStore,
{
    let data = match tokio::time::timeout(
        state.config.handshake_timeout,
        conn.recv(),
    )
    .await
    {
        Ok(Ok(Some(data))) => data,
        Ok(Ok(None)) => {
            return Err(ProtocolError::InvalidMessage(
                "connection closed before handshake".into(),
            )
            .into());
        }
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => {
            return Err(ProtocolError::InvalidMessage(
                "handshake timed out".into(),
            )
            .into());
        }
    };

    let envelope: Envelope = state.codec.decode(&data)?;

    let (version, token) = match envelope.payload {
        Payload::System(SystemMessage::Handshake { version, token }) => {
            (version, token)
        }
        _ => {
            let err: HeartfieldError = ProtocolError::InvalidMessage(
                "first message must be Handshake".into(),
            )
            .into();
            send_direct(conn, state, &err).await?;
            return Err(err);
        }
    };

    if version != PROTOCOL_VERSION {
        let err: HeartfieldError = ProtocolError::InvalidMessage(format!(
            "version mismatch: expected {PROTOCOL_VERSION}, got {version}"
        ))
        .into();
        send_direct(conn, state, &err).await?;
        return Err(err);
    }

    match state.gate.admit(token.as_deref()).await {
        Ok(identity) => Ok(identity),
        Err(e) => {
            tracing::info!(conn_id = %conn.id(), kind = e.kind(), "handshake rejected");
            let err = HeartfieldError::from(e);
            send_direct(conn, state, &err).await?;
            Err(err)
        }
    }
}

/// Drains a connection's outbox, stamping each payload with the next
/// sequence number.
fn spawn_writer(
    conn: Arc<WebSocketConnection>,
    mut rx: PayloadRx,
    codec: JsonCodec,
    started: Instant,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut seq: u64 = 0;
        while let Some(payload) = rx.recv().await {
            let envelope = Envelope {
                seq: next_seq(&mut seq),
                timestamp: started.elapsed().as_millis() as u64,
                payload,
            };
            let bytes = match codec.encode(&envelope) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::error!(conn_id = %conn.id(), error = %e, "failed to encode envelope");
                    continue;
                }
            };
            if let Err(e) = conn.send(&bytes).await {
                tracing::debug!(conn_id = %conn.id(), error = %e, "send failed, stopping writer");
                break;
            }
        }
    })
}

/// One authenticated connection's view of the server.
struct ConnectionCtx<'a, A, U, D> {
    state: &'a ServerState<A, U, D>,
    conn_id: ConnectionId,
    identity: Identity,
}

impl<A, U, D> ConnectionCtx<'_, A, U, D>
where
    A: IdentityProvider,
    U: UserStore,
    D: DocumentStore,
{
    /// Handles a system message. Returns `true` if the connection should close.
    async fn handle_system_message(
        &self,
        msg: SystemMessage,
    ) -> Result<bool, HeartfieldError> {
        match msg {
            SystemMessage::Heartbeat { client_time } => {
                self.reply(Payload::System(SystemMessage::HeartbeatAck {
                    client_time,
                    server_time: self.state.server_time(),
                }));
            }

            SystemMessage::JoinRoom {
                code,
                previous_user_id,
            } => {
                self.join_room(code, previous_user_id).await?;
            }

            SystemMessage::LeaveRoom => {
                self.leave_room().await?;
            }

            SystemMessage::Disconnect { reason } => {
                tracing::info!(user_id = %self.identity.user_id, %reason, "client disconnected");
                return Ok(true);
            }

            _ => {
                tracing::debug!(
                    user_id = %self.identity.user_id,
                    "ignoring unexpected system message"
                );
            }
        }

        Ok(false)
    }

    /// Seats the player in `code`, then tells them and the room.
    async fn join_room(
        &self,
        code: Option<String>,
        previous: Option<UserId>,
    ) -> Result<(), HeartfieldError> {
        let raw = code.ok_or(RoomError::MissingRoomCode)?;
        let code = RoomCode::parse(raw.trim())?;
        let user_id = &self.identity.user_id;

        // Only an offline holder's seat, or the caller's own, can migrate.
        let previous = match previous {
            Some(prev) => {
                let allowed = self
                    .state
                    .sessions
                    .lock()
                    .await
                    .may_take_over(&prev, &self.identity);
                if !allowed {
                    tracing::warn!(%code, %user_id, previous = %prev, "seat takeover refused");
                }
                allowed.then_some(prev)
            }
            None => None,
        };

        let snapshot = {
            let mut rooms = self.state.rooms.lock().await;
            let outcome = self.state.with_rng(|rng| {
                rooms.join(&code, &self.identity, previous.as_ref(), rng)
            })?;
            tracing::info!(%code, %user_id, ?outcome, "join accepted");

            if rooms.save(&code).await.is_err() {
                tracing::warn!(%code, "room kept in memory only");
            }
            rooms
                .get(&code)
                .map(|room| room.snapshot())
                .ok_or_else(|| RoomError::RoomNotFound(code.clone()))?
        };

        self.state.outbox().listen(&code, self.conn_id);
        self.reply(Payload::System(SystemMessage::RoomJoined {
            code: code.clone(),
            user_id: user_id.clone(),
        }));
        self.emit(&code, vec![(Recipient::All, snapshot)])
    }

    /// Takes the player's seat away and tells whoever is left.
    async fn leave_room(&self) -> Result<(), HeartfieldError> {
        let user_id = &self.identity.user_id;

        let (code, events, now_empty) = {
            let mut rooms = self.state.rooms.lock().await;
            let code = rooms
                .room_of(user_id)
                .cloned()
                .ok_or(HeartfieldError::NotSeated)?;
            let outcome = rooms.leave(&code, user_id)?;

            let mut events: RoomEvents = vec![(
                Recipient::All,
                RoomEvent::PlayerLeft {
                    user_id: user_id.clone(),
                },
            )];
            if let Some(forfeit) = outcome.forfeit {
                events.push((Recipient::All, forfeit.into()));
            }

            if outcome.now_empty {
                if let Err(e) = rooms.delete(&code).await {
                    tracing::warn!(%code, error = %e, "empty room not fully deleted");
                }
            } else {
                if rooms.save(&code).await.is_err() {
                    tracing::warn!(%code, "room kept in memory only");
                }
                if let Some(room) = rooms.get(&code) {
                    events.push((Recipient::All, room.snapshot()));
                }
            }
            (code, events, outcome.now_empty)
        };

        self.state.outbox().stop_listening(&code, self.conn_id);
        self.emit(&code, events)?;
        if now_empty {
            self.state.outbox().close_room(&code);
        }
        self.reply(Payload::System(SystemMessage::RoomLeft { code }));
        Ok(())
    }

    /// Decodes a game action and applies it to the player's room.
    ///
    /// Turn actions run under the room's turn lock; a second turn action
    /// arriving while one is in flight is rejected, not queued.
    async fn handle_game_message(&self, data: &[u8]) -> Result<(), HeartfieldError> {
        let action: ClientAction = self.state.codec.decode(data)?;
        let user_id = &self.identity.user_id;

        let code = self
            .state
            .rooms
            .lock()
            .await
            .room_of(user_id)
            .cloned()
            .ok_or(HeartfieldError::NotSeated)?;

        let _turn = if action.is_turn_action() {
            let locks = &self.state.locks;
            let Some(guard) = locks.try_lock(&code, self.conn_id) else {
                tracing::debug!(
                    %code,
                    %user_id,
                    holder = ?locks.holder(&code),
                    "turn lock busy"
                );
                return Err(RoomError::TurnInProgress.into());
            };
            Some(guard)
        } else {
            None
        };

        tracing::debug!(%code, %user_id, ?action, "applying action");
        let events = {
            let mut rooms = self.state.rooms.lock().await;
            let room = rooms
                .get_mut(&code)
                .ok_or_else(|| RoomError::RoomNotFound(code.clone()))?;
            let events = self
                .state
                .with_rng(|rng| room.apply_action(user_id, action, rng))?;

            if rooms.save(&code).await.is_err() {
                tracing::warn!(%code, "room kept in memory only");
            }
            events
        };

        self.emit(&code, events)
    }

    /// Delivers room events: `All` to the room's listeners, `Sender` to
    /// this connection.
    fn emit(&self, code: &RoomCode, events: RoomEvents) -> Result<(), HeartfieldError> {
        for (recipient, event) in events {
            if let RoomEvent::GameOver { reason, is_tie, .. } = &event {
                tracing::info!(%code, %reason, is_tie, "game over");
            }
            let payload = Payload::Game(self.state.codec.encode(&event)?);
            match recipient {
                Recipient::All => {
                    self.state.outbox().broadcast(code, &payload);
                }
                Recipient::Sender => {
                    self.reply(payload);
                }
            }
        }
        Ok(())
    }

    fn reply(&self, payload: Payload) {
        if !self.state.outbox().send_to(self.conn_id, payload) {
            tracing::debug!(conn_id = %self.conn_id, "reply dropped, writer gone");
        }
    }

    /// Reports a rejected request to this connection only.
    fn reject(&self, err: &HeartfieldError) {
        tracing::debug!(
            user_id = %self.identity.user_id,
            kind = err.kind(),
            error = %err,
            "request rejected"
        );
        self.reply(error_payload(err));
    }
}

fn error_payload(err: &HeartfieldError) -> Payload {
    Payload::System(SystemMessage::Error {
        code: err.status(),
        kind: err.kind().to_string(),
        message: err.to_string(),
    })
}

/// Sends an error straight to the socket, before any writer exists.
async fn send_direct<A, U, D>(
    conn: &WebSocketConnection,
    state: &ServerState<A, U, D>,
    err: &HeartfieldError,
) -> Result<(), HeartfieldError> {
    let envelope = Envelope {
        seq: 0,
        timestamp: state.server_time(),
        payload: error_payload(err),
    };
    let bytes = state.codec.encode(&envelope)?;
    conn.send(&bytes).await?;
    Ok(())
}

/// Increments and returns the next sequence number.
fn next_seq(seq: &mut u64) -> u64 {
    let current = *seq;
    *seq += 1;
    current
}
