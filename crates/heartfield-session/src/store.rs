//! The durable document store seam.
//!
//! Heartfield keeps all game truth in memory and mirrors it to a document
//! store after each mutation. The store itself is an external collaborator
//! (a document database in production); this module defines the three
//! calls the engine needs from it.
//!
//! Documents are plain `serde_json::Value`s. Converting between documents
//! and typed values happens in exactly one place per aggregate (the
//! session registry and the room registry), never in game logic.

use serde_json::Value;

/// Errors reported by a [`DocumentStore`] or [`UserStore`](crate::UserStore).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend could not be reached or refused the operation.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// A write was attempted but rejected.
    #[error("write of {key} failed: {reason}")]
    WriteFailed { key: String, reason: String },
}

/// A keyed collection of JSON documents.
///
/// One instance backs one collection (sessions, rooms). Implementations
/// must be shareable across tasks, hence `Send + Sync + 'static` and
/// `Send` futures.
pub trait DocumentStore: Send + Sync + 'static {
    /// Returns every document in the collection.
    fn find(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<Value>, StoreError>> + Send;

    /// Inserts or replaces the document stored under `key`.
    fn upsert(
        &self,
        key: &str,
        doc: Value,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Deletes the document stored under `key`.
    ///
    /// Returns `Ok(false)` if nothing was stored there.
    fn delete_one(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<bool, StoreError>> + Send;
}
