//! The in-memory provider: a hash map fused with a recency list.
//!
//! # Data structure
//!
//! ```text
//!            front (most recent)                 back (least recent)
//! recency:   [ s7 ] ⇄ [ s3 ] ⇄ [ s9 ] ⇄ ... ⇄ [ s1 ]
//!              ↑        ↑        ↑               ↑
//! by id:     s7 ──┘   s3 ──┘   s9 ──┘          s1 ──┘
//! ```
//!
//! [`LruCache`] is exactly this pair: a `HashMap` whose values are nodes
//! of an intrusive doubly linked list. It gives us O(1) lookup, O(1)
//! promotion to the front, and O(1) access to the back, and it keeps both
//! halves in sync for us. We create it unbounded; any session limit is
//! enforced by the provider so that a full store rejects new sessions
//! instead of silently dropping the oldest one.
//!
//! # Eviction
//!
//! Because every write moves its session to the front, timestamps are
//! non-increasing from front to back. `gc` therefore pops from the back
//! while the back session is idle and stops at the first fresh one, since
//! everything in front of it is at least as fresh. The cost is O(k) in the
//! number of evicted sessions, not O(n) in the number of live ones.
//!
//! # Locking
//!
//! - One `RwLock` guards the map + list. Lookups of existing sessions take
//!   it shared; creation, promotion, removal and eviction take it
//!   exclusively, each for a constant-size update.
//! - Each session's bag has its own `Mutex`, so handlers writing to
//!   different sessions only meet on the (brief) promotion.
//!
//! The locks are `parking_lot` ones: no poisoning, and no lock is ever held
//! across an `.await`.

use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::{Arc, Weak};
use std::time::Duration;

use lru::LruCache;
use parking_lot::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::{Provider, SessionRef, SessionStore, StoreError, Value};

/// The name the in-memory provider is conventionally registered under.
pub const MEMORY_PROVIDER: &str = "memory";

// ---------------------------------------------------------------------------
// Recency index
// ---------------------------------------------------------------------------

/// A live session plus the instant it was last written.
struct Entry {
    store: Arc<MemoryStore>,
    /// `tokio::time::Instant` so tests can drive the clock with
    /// `tokio::time::pause()`; outside a runtime it is the monotonic clock.
    last_accessed: Instant,
}

/// The map + ordering shared by a provider and all of its sessions.
struct Recency {
    entries: LruCache<String, Entry>,
}

impl Recency {
    /// Marks `store` as written now and moves it to the front.
    ///
    /// The pointer check matters when an id is removed and re-created: a
    /// handle to the old session must not refresh the new one.
    fn touch(&mut self, store: &MemoryStore) {
        let sid = store.id.as_str();
        // `peek_mut` leaves the order alone; only the owning session moves.
        match self.entries.peek_mut(sid) {
            Some(entry) if std::ptr::eq(Arc::as_ptr(&entry.store), store) => {
                entry.last_accessed = Instant::now();
            }
            _ => return,
        }
        self.entries.promote(sid);
        trace!(sid = %store.id, "session promoted");
    }
}

/// `true` once `last_accessed + max_idle <= now`.
///
/// The boundary is inclusive: a session idle for exactly the window is
/// evicted. `saturating_duration_since` avoids overflow for huge windows.
fn is_idle(last_accessed: Instant, now: Instant, max_idle: Duration) -> bool {
    now.saturating_duration_since(last_accessed) >= max_idle
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// One session held by a [`MemoryProvider`].
pub struct MemoryStore {
    id: String,
    values: Mutex<HashMap<String, Value>>,
    /// Back-reference used to report writes. `Weak` so a session handle
    /// kept by a handler doesn't keep a dropped provider alive.
    owner: Weak<RwLock<Recency>>,
}

impl MemoryStore {
    fn touch(&self) {
        if let Some(owner) = self.owner.upgrade() {
            owner.write().touch(self);
        }
    }
}

impl SessionStore for MemoryStore {
    fn id(&self) -> &str {
        &self.id
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        // Release the bag before touching the provider: the two locks are
        // never held together.
        self.values.lock().insert(key.to_string(), value);
        self.touch();
        Ok(())
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.values.lock().get(key).cloned()
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.values.lock().remove(key);
        self.touch();
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.values.lock().keys().cloned().collect()
    }

    fn len(&self) -> usize {
        self.values.lock().len()
    }
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore")
            .field("id", &self.id)
            .field("keys", &self.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// MemoryProvider
// ---------------------------------------------------------------------------

/// Keeps sessions in process memory, ordered by recency of writes.
///
/// Sessions do not survive a restart and are not shared between
/// processes.
pub struct MemoryProvider {
    inner: Arc<RwLock<Recency>>,
    max_sessions: Option<NonZeroUsize>,
}

impl MemoryProvider {
    /// Creates an empty provider with no session limit.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Recency {
                entries: LruCache::unbounded(),
            })),
            max_sessions: None,
        }
    }

    /// Creates an empty provider that refuses to hold more than `max`
    /// sessions at once.
    pub fn with_max_sessions(max: NonZeroUsize) -> Self {
        Self {
            max_sessions: Some(max),
            ..Self::new()
        }
    }

    /// The configured session limit, if any.
    pub fn max_sessions(&self) -> Option<NonZeroUsize> {
        self.max_sessions
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if `sid` is live. Does not refresh recency.
    pub fn contains(&self, sid: &str) -> bool {
        self.inner.read().entries.contains(sid)
    }

    /// When `sid` was last written (or created), if it is live.
    pub fn last_accessed(&self, sid: &str) -> Option<Instant> {
        self.inner
            .read()
            .entries
            .peek(sid)
            .map(|entry| entry.last_accessed)
    }

    /// Live ids from most to least recently written.
    pub fn ids_by_recency(&self) -> Vec<String> {
        self.inner
            .read()
            .entries
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryProvider")
            .field("sessions", &self.len())
            .field("max_sessions", &self.max_sessions)
            .finish()
    }
}

impl Provider for MemoryProvider {
    fn read(&self, sid: &str) -> Result<SessionRef, StoreError> {
        // Fast path: an existing session only needs the shared lock.
        {
            let recency = self.inner.read();
            if let Some(entry) = recency.entries.peek(sid) {
                let store: SessionRef = entry.store.clone();
                return Ok(store);
            }
        }

        let mut recency = self.inner.write();

        // Someone may have created `sid` between the two locks. Re-check
        // so that exactly one session wins.
        if let Some(entry) = recency.entries.peek(sid) {
            let store: SessionRef = entry.store.clone();
            return Ok(store);
        }

        if let Some(max) = self.max_sessions {
            if recency.entries.len() >= max.get() {
                debug!(max = max.get(), "session capacity exhausted");
                return Err(StoreError::CapacityExhausted { max: max.get() });
            }
        }

        let store = Arc::new(MemoryStore {
            id: sid.to_string(),
            values: Mutex::new(HashMap::new()),
            owner: Arc::downgrade(&self.inner),
        });
        recency.entries.put(
            sid.to_string(),
            Entry {
                store: Arc::clone(&store),
                last_accessed: Instant::now(),
            },
        );

        debug!(sid, live = recency.entries.len(), "session created");
        let store: SessionRef = store;
        Ok(store)
    }

    fn remove(&self, sid: &str) -> Result<(), StoreError> {
        if self.inner.write().entries.pop(sid).is_some() {
            debug!(sid, "session removed");
        }
        Ok(())
    }

    fn gc(&self, max_idle: Duration) -> Vec<String> {
        let now = Instant::now();
        let mut recency = self.inner.write();
        let mut evicted = Vec::new();

        loop {
            let expired = match recency.entries.peek_lru() {
                Some((_, entry)) => is_idle(entry.last_accessed, now, max_idle),
                None => false,
            };
            if !expired {
                break;
            }
            if let Some((sid, _)) = recency.entries.pop_lru() {
                trace!(sid = %sid, "session evicted");
                evicted.push(sid);
            }
        }

        if !evicted.is_empty() {
            debug!(
                evicted = evicted.len(),
                live = recency.entries.len(),
                "idle sessions evicted"
            );
        }
        evicted
    }
}

// =========================================================================
// Tests
// =========================================================================
