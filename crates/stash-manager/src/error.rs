//! Error types for the manager layer.

use stash_cookie::CookieError;
use stash_reaper::ReaperError;
use stash_store::StoreError;

/// Errors raised while assembling a [`ProviderRegistry`](crate::ProviderRegistry).
///
/// These are startup configuration mistakes. The registry rejects the
/// offending registration and stays as it was; the caller is expected to
/// propagate the error out of its startup path rather than run with a
/// registry that is missing what it asked for.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// A provider is already registered under this name.
    #[error("session provider {0:?} registered twice")]
    DuplicateProvider(String),

    /// Provider names must not be empty.
    #[error("session provider name must not be empty")]
    EmptyName,
}

/// Errors that can occur while creating or using a [`SessionManager`](crate::SessionManager).
#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    /// No provider is registered under the configured name.
    #[error("unknown session provider {0:?}")]
    UnknownProvider(String),

    /// The configuration can't be used (empty cookie name, zero idle
    /// timeout, ...).
    #[error("invalid session manager config: {0}")]
    InvalidConfig(String),

    /// A new session id could not be generated. The request simply has no
    /// session this time.
    #[error(transparent)]
    IdGeneration(#[from] CookieError),

    /// The provider failed. Passed through unmodified.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The reclamation loop could not be started (e.g. no Tokio runtime).
    #[error(transparent)]
    Reaper(#[from] ReaperError),
}
