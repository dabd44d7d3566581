//! # Stash
//!
//! Cookie-bound server-side sessions with idle eviction.
//!
//! A client carries nothing but an opaque id in a cookie; everything else
//! lives in a per-session key/value bag on the server. Bags that go unwritten
//! for longer than the idle timeout are evicted by a background loop.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stash::prelude::*;
//!
//! # async fn run() -> Result<(), StashError> {
//! let stash = Stash::builder()
//!     .config(ManagerConfig::default().max_idle_secs(900))
//!     .build()?;
//!
//! let request = RequestCookies::parse("theme=dark");
//! let mut response = ResponseCookies::new();
//! let session = stash.manager().start(&request, &mut response)?;
//! session.insert("visits", 1u64)?;
//! // send response.header_values() as Set-Cookie headers
//! # Ok(())
//! # }
//! ```
//!
//! ## Crates
//!
//! - [`cookie`]: session ids and the cookie wire format
//! - [`store`]: session bags, the provider contract, the in-memory provider
//! - [`reaper`]: the background reclamation loop
//! - [`manager`]: provider registry and session manager

mod builder;
mod error;
pub mod logging;

pub use builder::{Stash, StashBuilder};
pub use error::StashError;

pub use stash_cookie as cookie;
pub use stash_manager as manager;
pub use stash_reaper as reaper;
pub use stash_store as store;

pub mod prelude {
    pub use crate::{Stash, StashBuilder, StashError};
    pub use stash_cookie::{CookieSink, CookieSource, RequestCookies, ResponseCookies, SetCookie};
    pub use stash_manager::{ManagerConfig, ProviderRegistry, SessionManager};
    pub use stash_store::{MemoryProvider, Provider, SessionRef, SessionStore};
}
