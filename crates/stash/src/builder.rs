//! `Stash` builder.
//!
//! This is the usual entry point: it assembles the provider registry,
//! freezes it and starts a session manager over it, collecting every
//! startup mistake into one [`StashError`].

use std::sync::Arc;

use stash_manager::{ManagerConfig, ProviderRegistry, SessionManager};
use stash_store::{MemoryProvider, Provider, MEMORY_PROVIDER};
use tracing::debug;

use crate::StashError;

/// Builder for a [`Stash`].
///
/// # Example
///
/// ```rust,ignore
/// use stash::prelude::*;
///
/// let stash = Stash::builder()
///     .config(ManagerConfig::default().cookie_name("app_sid"))
///     .build()?;
/// let session = stash.manager().start(&request, &mut response)?;
/// ```
pub struct StashBuilder {
    memory_provider: bool,
    providers: Vec<(String, Arc<dyn Provider>)>,
    config: ManagerConfig,
}

impl StashBuilder {
    /// Creates a builder with the in-memory provider and default config.
    pub fn new() -> Self {
        Self {
            memory_provider: true,
            providers: Vec::new(),
            config: ManagerConfig::default(),
        }
    }

    /// Adds a provider under `name`. Duplicates are reported by
    /// [`build`](Self::build).
    pub fn provider<P: Provider>(self, name: impl Into<String>, provider: P) -> Self {
        self.shared_provider(name, Arc::new(provider))
    }

    /// Adds a provider the caller keeps a handle to.
    pub fn shared_provider(mut self, name: impl Into<String>, provider: Arc<dyn Provider>) -> Self {
        self.providers.push((name.into(), provider));
        self
    }

    /// Skips the in-memory provider normally registered under
    /// [`MEMORY_PROVIDER`], e.g. to register a capacity-limited one under
    /// that name instead.
    pub fn without_memory_provider(mut self) -> Self {
        self.memory_provider = false;
        self
    }

    /// Sets the manager configuration.
    pub fn config(mut self, config: ManagerConfig) -> Self {
        self.config = config;
        self
    }

    /// Freezes the registry and starts the manager.
    ///
    /// Must be called inside a Tokio runtime: the manager's reclamation
    /// loop starts here.
    ///
    /// # Errors
    /// - [`StashError::Registry`] for an empty or duplicated provider name
    /// - [`StashError::Manager`] for a bad config, an unknown provider or a
    ///   missing runtime
    pub fn build(self) -> Result<Stash, StashError> {
        let mut registry = ProviderRegistry::builder();
        if self.memory_provider {
            registry.register(MEMORY_PROVIDER, MemoryProvider::new())?;
        }
        for (name, provider) in self.providers {
            registry.register_shared(name, provider)?;
        }
        let registry = registry.build();
        debug!(providers = ?registry.names(), "provider registry frozen");

        let manager = SessionManager::new(&registry, self.config)?;
        Ok(Stash { registry, manager })
    }
}

impl Default for StashBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A frozen provider registry plus the session manager running over it.
#[derive(Debug)]
pub struct Stash {
    registry: ProviderRegistry,
    manager: SessionManager,
}

impl Stash {
    pub fn builder() -> StashBuilder {
        StashBuilder::new()
    }

    pub fn manager(&self) -> &SessionManager {
        &self.manager
    }

    /// The registry the manager was built from. Further managers (for
    /// other cookies) can be created from it.
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn into_parts(self) -> (ProviderRegistry, SessionManager) {
        (self.registry, self.manager)
    }

    /// Stops the manager's reclamation loop.
    pub async fn shutdown(&mut self) {
        self.manager.shutdown().await;
    }
}
