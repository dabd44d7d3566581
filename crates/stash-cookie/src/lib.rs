//! Cookie wire contract for Stash.
//!
//! This crate defines the "glue" between HTTP and the session store:
//!
//! - **Ids** ([`SessionIdSource`], [`OsRandomIds`]): how session
//!   identifiers are minted (32 random bytes, URL-safe base64).
//! - **Cookies** ([`SetCookie`], [`RequestCookies`], [`ResponseCookies`]):
//!   how the id travels to the client and back.
//! - **Seams** ([`CookieSource`], [`CookieSink`]): the request/response
//!   abstraction the session manager talks to, so it never depends on a
//!   particular HTTP framework.
//! - **Errors** ([`CookieError`]): what can go wrong along the way.
//!
//! # Architecture
//!
//! ```text
//! HTTP framework (headers) → Cookie layer (this crate) → Session manager
//! ```

mod cookie;
mod error;
mod id;

pub use cookie::{
    path_escape, CookieSink, CookieSource, RequestCookies, ResponseCookies,
    SetCookie,
};
pub use error::CookieError;
pub use id::{OsRandomIds, SessionIdSource, SESSION_ID_BYTES, SESSION_ID_LEN};
