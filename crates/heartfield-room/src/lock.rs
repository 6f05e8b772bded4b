//! The per-room turn lock.
//!
//! Handling a turn action suspends at several `await`s (room registry
//! lock, storage write, broadcast). The turn lock makes the whole
//! acquire → validate → mutate → persist → broadcast sequence exclusive
//! per room.
//!
//! The lock is advisory and never waits: a denied acquire means "reject
//! this action now". Each lock records its owner, so a stale or duplicate
//! release from someone else cannot free it.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use heartfield_protocol::{ConnectionId, RoomCode};

/// Owner-tagged, non-blocking locks keyed by room code.
///
/// Shared across connection tasks behind an `Arc`. The inner `std` mutex
/// is only held for a map lookup, never across an `await`.
#[derive(Debug, Default)]
pub struct TurnLockManager {
    locks: Mutex<HashMap<RoomCode, ConnectionId>>,
}

impl TurnLockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the lock for `code` on behalf of `owner`.
    ///
    /// Returns `false` if the lock is already held, including by `owner`
    /// itself: the lock is not re-entrant.
    pub fn acquire(&self, code: &RoomCode, owner: ConnectionId) -> bool {
        let mut locks = self.lock();
        if locks.contains_key(code) {
            return false;
        }
        locks.insert(code.clone(), owner);
        true
    }

    /// Frees the lock for `code` if `owner` holds it.
    ///
    /// Returns `false` (and leaves the lock alone) otherwise.
    pub fn release(&self, code: &RoomCode, owner: ConnectionId) -> bool {
        let mut locks = self.lock();
        match locks.get(code) {
            Some(holder) if *holder == owner => {
                locks.remove(code);
                true
            }
            Some(holder) => {
                tracing::warn!(%code, %owner, %holder, "release by non-owner ignored");
                false
            }
            None => false,
        }
    }

    /// Acquires the lock and returns a guard that releases it on drop.
    ///
    /// Returns `None` if the lock is held.
    pub fn try_lock(
        &self,
        code: &RoomCode,
        owner: ConnectionId,
    ) -> Option<TurnLockGuard<'_>> {
        self.acquire(code, owner).then(|| TurnLockGuard {
            manager: self,
            code: code.clone(),
            owner,
        })
    }

    /// The connection currently holding `code`'s lock.
    pub fn holder(&self, code: &RoomCode) -> Option<ConnectionId> {
        self.lock().get(code).copied()
    }

    #[cfg(test)]
    fn is_locked(&self, code: &RoomCode) -> bool {
        self.holder(code).is_some()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<RoomCode, ConnectionId>> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Holds a room's turn lock; releases it when dropped.
///
/// Every exit path from a handler, `?` and panics included, frees the
/// room.
#[must_use = "the turn lock is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct TurnLockGuard<'a> {
    manager: &'a TurnLockManager,
    code: RoomCode,
    owner: ConnectionId,
}

impl TurnLockGuard<'_> {
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub fn owner(&self) -> ConnectionId {
        self.owner
    }
}

impl Drop for TurnLockGuard<'_> {
    fn drop(&mut self) {
        self.manager.release(&self.code, self.owner);
    }
}
