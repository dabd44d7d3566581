//! Session management for Stash.
//!
//! This crate binds a storage provider to a cookie:
//!
//! - [`ProviderRegistry`]: the named providers available to the process,
//!   assembled once at startup through a [`RegistryBuilder`] and frozen
//! - [`SessionManager`]: starts and stops sessions for requests and runs
//!   the background reclamation loop
//! - [`ManagerConfig`]: which provider, which cookie, how long idle
//!   sessions live
//!
//! # How it fits in the stack
//!
//! ```text
//! Application handlers (above)  ← call start/stop, read/write the session
//!     ↕
//! Manager layer (this crate)  ← cookie in, session out; periodic gc
//!     ↕
//! Store layer (below)  ← providers, session bags, recency, eviction
//! ```

mod config;
mod error;
mod manager;
mod registry;

pub use config::{ManagerConfig, DEFAULT_COOKIE_NAME, DEFAULT_MAX_IDLE_SECS};
pub use error::{ManagerError, RegistryError};
pub use manager::SessionManager;
pub use registry::{ProviderRegistry, RegistryBuilder};
