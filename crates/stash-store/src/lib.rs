//! Session storage for Stash.
//!
//! This crate is the storage-and-eviction engine:
//!
//! 1. **Session handles**: one client's key/value bag ([`SessionStore`])
//! 2. **Providers**: the backend contract that owns every bag and evicts
//!    idle ones ([`Provider`])
//! 3. **The in-memory provider**: a hash map fused with a recency list so
//!    promotion is O(1) and eviction stops at the first fresh session
//!    ([`MemoryProvider`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Session manager (above)  ← picks a provider by name, drives start/stop/gc
//!     ↕
//! Store layer (this crate)  ← owns session bags, tracks recency, evicts
//! ```

mod error;
mod memory;
mod provider;
mod store;

pub use error::StoreError;
pub use memory::{MemoryProvider, MemoryStore, MEMORY_PROVIDER};
pub use provider::Provider;
pub use store::{SessionRef, SessionStore, Value};
