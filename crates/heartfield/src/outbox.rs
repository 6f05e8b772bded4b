//! Routes outgoing payloads to connection writer tasks.
//!
//! Each connection registers an unbounded sender; its writer task owns the
//! receiving end and stamps sequence numbers. Room membership here is the
//! broadcast audience, separate from the room roster: a player stays on
//! the roster across reconnects but only live connections are listening.

use std::collections::{HashMap, HashSet};

use heartfield_protocol::{ConnectionId, Payload, RoomCode};
use tokio::sync::mpsc;

pub(crate) type PayloadTx = mpsc::UnboundedSender<Payload>;
pub(crate) type PayloadRx = mpsc::UnboundedReceiver<Payload>;

#[derive(Debug, Default)]
pub(crate) struct Outbox {
    writers: HashMap<ConnectionId, PayloadTx>,
    audiences: HashMap<RoomCode, HashSet<ConnectionId>>,
}

impl Outbox {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers a connection and returns the receiver its writer drains.
    pub(crate) fn register(&mut self, conn_id: ConnectionId) -> PayloadRx {
        let (tx, rx) = mpsc::unbounded_channel();
        self.writers.insert(conn_id, tx);
        rx
    }

    /// Drops the connection's writer and every audience it was part of.
    pub(crate) fn unregister(&mut self, conn_id: ConnectionId) {
        self.writers.remove(&conn_id);
        self.audiences.retain(|_, members| {
            members.remove(&conn_id);
            !members.is_empty()
        });
    }

    pub(crate) fn listen(&mut self, code: &RoomCode, conn_id: ConnectionId) {
        self.audiences
            .entry(code.clone())
            .or_default()
            .insert(conn_id);
    }

    pub(crate) fn stop_listening(&mut self, code: &RoomCode, conn_id: ConnectionId) {
        if let Some(members) = self.audiences.get_mut(code) {
            members.remove(&conn_id);
            if members.is_empty() {
                self.audiences.remove(code);
            }
        }
    }

    /// Forgets the audience of a deleted room.
    pub(crate) fn close_room(&mut self, code: &RoomCode) {
        self.audiences.remove(code);
    }

    /// Queues `payload` for one connection. Returns `false` if it is gone.
    pub(crate) fn send_to(&self, conn_id: ConnectionId, payload: Payload) -> bool {
        match self.writers.get(&conn_id) {
            Some(tx) => tx.send(payload).is_ok(),
            None => false,
        }
    }

    /// Queues `payload` for every connection listening to `code`.
    pub(crate) fn broadcast(&self, code: &RoomCode, payload: &Payload) -> usize {
        let Some(members) = self.audiences.get(code) else {
            return 0;
        };
        members
            .iter()
            .filter(|conn_id| self.send_to(**conn_id, payload.clone()))
            .count()
    }
}
