//! Error types for the cookie layer.

/// Errors that can occur while minting ids or reading cookies.
#[derive(Debug, thiserror::Error)]
pub enum CookieError {
    /// The random source could not produce bytes for a session id.
    ///
    /// This is a transient condition: the caller should treat it as
    /// "no session available for this request", not as a crash.
    #[error("random source unavailable: {0}")]
    Entropy(String),

    /// A `name=value` pair in a `Cookie` header could not be parsed.
    #[error("malformed cookie pair: {0}")]
    Malformed(String),
}
