//! In-memory implementations of the storage collaborators.
//!
//! Used by the demo server and by tests. Both carry failure switches so
//! tests can drive the storage error paths without a real database.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use heartfield_protocol::UserId;
use serde_json::Value;

use crate::{DocumentStore, StoreError, UserRecord, UserStore};

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// A [`DocumentStore`] backed by a `BTreeMap`.
///
/// `find` returns documents in key order, which keeps test output stable.
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: Mutex<BTreeMap<String, Value>>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// When set, `upsert` and `delete_one` fail with
    /// [`StoreError::WriteFailed`].
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// When set, `find` fails with [`StoreError::Unavailable`].
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Stores `doc` under `key` as-is, bypassing the failure switches.
    pub fn insert_raw(&self, key: &str, doc: Value) {
        self.lock().insert(key.to_string(), doc);
    }

    /// Returns a copy of the document stored under `key`.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.lock().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Value>> {
        self.docs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_write(&self, key: &str) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::WriteFailed {
                key: key.to_string(),
                reason: "writes disabled".into(),
            });
        }
        Ok(())
    }
}

impl DocumentStore for MemoryStore {
    async fn find(&self) -> Result<Vec<Value>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("reads disabled".into()));
        }
        Ok(self.lock().values().cloned().collect())
    }

    async fn upsert(&self, key: &str, doc: Value) -> Result<(), StoreError> {
        self.check_write(key)?;
        self.lock().insert(key.to_string(), doc);
        Ok(())
    }

    async fn delete_one(&self, key: &str) -> Result<bool, StoreError> {
        self.check_write(key)?;
        Ok(self.lock().remove(key).is_some())
    }
}

// ---------------------------------------------------------------------------
// MemoryUserStore
// ---------------------------------------------------------------------------

/// A [`UserStore`] backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: HashMap<UserId, UserRecord>,
    fail_lookups: AtomicBool,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a user, builder style.
    pub fn with_user(mut self, user: UserRecord) -> Self {
        self.users.insert(user.id.clone(), user);
        self
    }

    /// When set, every lookup fails with [`StoreError::Unavailable`].
    pub fn set_fail_lookups(&self, fail: bool) {
        self.fail_lookups.store(fail, Ordering::SeqCst);
    }
}

impl UserStore for MemoryUserStore {
    async fn find_by_id(
        &self,
        id: &UserId,
    ) -> Result<Option<UserRecord>, StoreError> {
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("user store offline".into()));
        }
        Ok(self.users.get(id).cloned())
    }
}
