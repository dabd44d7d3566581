//! The session handle: one client's bag of values.
//!
//! Handlers never own a session. They get a shared [`SessionRef`] from the
//! provider, read and write through it, and drop it at the end of the
//! request. The provider keeps the real ownership.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::StoreError;

/// A value stored in a session.
///
/// The store layer doesn't care what you put in a session, so values are
/// type-erased: `dyn Any` can hold anything `'static`, and `Send + Sync`
/// lets it cross request threads. Use [`insert`](SessionStore::insert) and
/// [`get_as`](SessionStore::get_as) for typed access.
pub type Value = Arc<dyn Any + Send + Sync>;

/// A shared handle to a live session, as returned by
/// [`Provider::read`](crate::Provider::read).
pub type SessionRef = Arc<dyn SessionStore>;

/// The contract every session handle fulfils, whatever the backend.
///
/// # Recency
///
/// Only mutations count as activity. `set` and `delete` tell the owning
/// provider that the session was touched, which pushes back its idle
/// deadline. `get` and the other read helpers do not: a session that is
/// only ever read still expires one idle window after its last write.
pub trait SessionStore: Send + Sync + fmt::Debug {
    /// The session's immutable identifier.
    fn id(&self) -> &str;

    /// Inserts or overwrites `key`, then refreshes the session's recency.
    fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;

    /// Returns the value under `key`, or `None`. Does not refresh recency.
    fn get(&self, key: &str) -> Option<Value>;

    /// Removes `key` if present, then refreshes the session's recency.
    /// Deleting a missing key succeeds.
    fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Every key currently stored, in no particular order.
    fn keys(&self) -> Vec<String>;

    /// Number of stored keys.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

/// Typed helpers.
///
/// These live on the trait object rather than the trait because generic
/// methods would make `SessionStore` unusable as `dyn SessionStore`.
impl dyn SessionStore {
    /// Wraps `value` and stores it under `key`.
    ///
    /// ```rust
    /// use stash_store::{MemoryProvider, Provider};
    ///
    /// let provider = MemoryProvider::new();
    /// let session = provider.read("sid").unwrap();
    /// session.insert("visits", 3u32).unwrap();
    /// assert_eq!(session.get_as::<u32>("visits").as_deref(), Some(&3));
    /// ```
    pub fn insert<T: Any + Send + Sync>(
        &self,
        key: &str,
        value: T,
    ) -> Result<(), StoreError> {
        self.set(key, Arc::new(value))
    }

    /// Returns the value under `key` if it exists and is a `T`.
    pub fn get_as<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        self.get(key)?.downcast::<T>().ok()
    }
}
