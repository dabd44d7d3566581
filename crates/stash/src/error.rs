//! Unified error type for Stash.

use stash_cookie::CookieError;
use stash_manager::{ManagerError, RegistryError};
use stash_store::StoreError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `stash` meta-crate, you deal with this single error type
/// instead of importing errors from each sub-crate. The `#[from]` attribute
/// on each variant generates the `From` impls, so `?` converts sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum StashError {
    /// Id generation or cookie handling failed.
    #[error(transparent)]
    Cookie(#[from] CookieError),

    /// A provider failed (capacity, backend).
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The provider registry was assembled incorrectly.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The manager could not be created or a request operation failed.
    #[error(transparent)]
    Manager(#[from] ManagerError),
}
