//! The provider SPI: what a storage backend must do.

use std::time::Duration;

use crate::{SessionRef, StoreError};

/// A storage backend for sessions.
///
/// Three operations are enough for the session manager: fetch-or-create,
/// remove, and evict the idle. In-memory, remote-cache and database
/// backends all fit behind this trait, and the manager picks one by the
/// name it was registered under, never by inspecting its type.
///
/// # Trait bounds
///
/// - `Send + Sync` → request threads and the reclamation task call the
///   same provider concurrently.
/// - `'static` → providers live in the registry for the whole process.
///
/// The trait is object safe; the registry stores `Arc<dyn Provider>`.
pub trait Provider: Send + Sync + 'static {
    /// Returns the session `sid`, creating an empty one if it is unknown.
    ///
    /// Concurrent first access to the same new id yields one session:
    /// every caller gets a handle to the same bag.
    ///
    /// # Errors
    /// Backends may fail with [`StoreError::CapacityExhausted`] when a
    /// session limit is configured, or [`StoreError::Backend`].
    fn read(&self, sid: &str) -> Result<SessionRef, StoreError>;

    /// Drops the session `sid`. Removing an unknown id is a no-op.
    fn remove(&self, sid: &str) -> Result<(), StoreError>;

    /// Evicts every session whose last access is at least `max_idle` ago
    /// and returns their ids.
    fn gc(&self, max_idle: Duration) -> Vec<String>;
}
