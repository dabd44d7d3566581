//! Named session providers.
//!
//! Providers are registered once, at startup, on a [`RegistryBuilder`].
//! [`RegistryBuilder::build`] freezes the set into a [`ProviderRegistry`],
//! which is cheap to clone and never changes afterwards; managers look
//! their provider up by name when they are created.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use stash_store::{MemoryProvider, Provider, MEMORY_PROVIDER};
use tracing::debug;

use crate::RegistryError;

/// Collects providers before the registry is frozen.
#[derive(Default)]
pub struct RegistryBuilder {
    providers: HashMap<String, Arc<dyn Provider>>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `provider` under `name`.
    ///
    /// # Errors
    /// - [`RegistryError::EmptyName`] for `""`
    /// - [`RegistryError::DuplicateProvider`] if `name` is taken; the
    ///   existing provider is kept
    pub fn register<P: Provider>(
        &mut self,
        name: impl Into<String>,
        provider: P,
    ) -> Result<&mut Self, RegistryError> {
        self.register_shared(name, Arc::new(provider))
    }

    /// Registers a provider the caller keeps a handle to.
    pub fn register_shared(
        &mut self,
        name: impl Into<String>,
        provider: Arc<dyn Provider>,
    ) -> Result<&mut Self, RegistryError> {
        let name = name.into();
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.providers.contains_key(&name) {
            return Err(RegistryError::DuplicateProvider(name));
        }

        debug!(provider = %name, "session provider registered");
        self.providers.insert(name, provider);
        Ok(self)
    }

    /// Freezes the registry.
    pub fn build(self) -> ProviderRegistry {
        ProviderRegistry {
            providers: Arc::new(self.providers),
        }
    }
}

impl fmt::Debug for RegistryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryBuilder")
            .field("providers", &sorted_names(&self.providers))
            .finish()
    }
}

/// An immutable name → provider map.
#[derive(Clone)]
pub struct ProviderRegistry {
    providers: Arc<HashMap<String, Arc<dyn Provider>>>,
}

impl ProviderRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// A registry holding a fresh in-memory provider under
    /// [`MEMORY_PROVIDER`].
    pub fn with_defaults() -> Self {
        let mut providers: HashMap<String, Arc<dyn Provider>> = HashMap::new();
        providers.insert(MEMORY_PROVIDER.to_string(), Arc::new(MemoryProvider::new()));
        Self {
            providers: Arc::new(providers),
        }
    }

    /// Looks a provider up by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        sorted_names(&self.providers)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .finish()
    }
}

fn sorted_names(providers: &HashMap<String, Arc<dyn Provider>>) -> Vec<&str> {
    let mut names: Vec<&str> = providers.keys().map(String::as_str).collect();
    names.sort_unstable();
    names
}
