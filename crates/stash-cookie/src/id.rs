//! Session id generation.
//!
//! A session id is the only thing a client ever holds, so it has to be
//! unguessable: 32 bytes (256 bits) straight from the operating system's
//! CSPRNG, encoded as URL-safe base64 without padding so it can sit in a
//! cookie value untouched.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::TryRngCore;
use tracing::warn;

use crate::CookieError;

/// Number of random bytes behind every session id.
pub const SESSION_ID_BYTES: usize = 32;

/// Length of an encoded session id (`ceil(32 * 4 / 3)` without padding).
pub const SESSION_ID_LEN: usize = 43;

/// Produces fresh session identifiers.
///
/// The session manager owns one of these. The default is [`OsRandomIds`];
/// tests swap in deterministic or failing sources.
///
/// # Trait bounds
///
/// - `Send + Sync` → one source is shared by every request-handling thread.
/// - `'static` → it lives as long as the manager that owns it.
pub trait SessionIdSource: Send + Sync + 'static {
    /// Returns a new, unique, cookie-safe session id.
    ///
    /// # Errors
    /// Returns [`CookieError::Entropy`] if the random source is exhausted
    /// or unavailable.
    fn generate(&self) -> Result<String, CookieError>;
}

/// The default id source: 32 bytes from the OS random number generator.
///
/// ```rust
/// use stash_cookie::{OsRandomIds, SessionIdSource, SESSION_ID_LEN};
///
/// let id = OsRandomIds.generate().unwrap();
/// assert_eq!(id.len(), SESSION_ID_LEN);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandomIds;

impl SessionIdSource for OsRandomIds {
    fn generate(&self) -> Result<String, CookieError> {
        let mut bytes = [0u8; SESSION_ID_BYTES];
        // `try_fill_bytes` surfaces OS failures instead of panicking like
        // the infallible `fill_bytes` would.
        OsRng.try_fill_bytes(&mut bytes).map_err(|e| {
            warn!(error = %e, "os random source failed");
            CookieError::Entropy(e.to_string())
        })?;
        Ok(URL_SAFE_NO_PAD.encode(bytes))
    }
}
