//! Error types for the store layer.

/// Errors a [`Provider`](crate::Provider) or session handle can report.
///
/// Note what is missing: removing an unknown session or deleting an
/// unknown key is never an error. Sessions and keys are ephemeral, so
/// "already gone" is a perfectly good outcome.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The provider refuses to create another session because it already
    /// holds its configured maximum.
    #[error("session capacity exhausted ({max} live sessions)")]
    CapacityExhausted { max: usize },

    /// A non-memory backend (cache, database) failed.
    #[error("storage backend failed: {0}")]
    Backend(String),
}
