//! Snapshot source registry
//!
//! The registry maps provider identifiers to factories, so the command
//! surface can select a source by name without a hardcoded if-else chain.
//! It is built once at startup and passed by reference to whoever needs
//! it; there is no process-wide instance.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use hosts_core::{SourceConfig, SourceRegistry};
//!
//! let mut registry = SourceRegistry::new();
//! hosts_source_edgeos::register(&mut registry);
//!
//! let config = SourceConfig::new("edgeos")
//!     .with_flag("address", "192.168.1.1")
//!     .with_flag("username", "ubnt")
//!     .with_flag("password", "ubnt");
//! let source = registry.create_source(&config)?;
//! ```

use std::collections::HashMap;

use crate::config::SourceConfig;
use crate::error::{Error, Result};
use crate::traits::{SnapshotSource, SnapshotSourceFactory};

/// Provider identifier → snapshot source factory
#[derive(Default)]
pub struct SourceRegistry {
    sources: HashMap<&'static str, Box<dyn SnapshotSourceFactory>>,
}

impl SourceRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under its own identifier
    ///
    /// Registering a second factory with the same identifier replaces the
    /// first.
    pub fn register(&mut self, factory: Box<dyn SnapshotSourceFactory>) {
        let id = factory.id();
        if self.sources.insert(id, factory).is_some() {
            tracing::warn!("Snapshot source {} registered twice, keeping the last", id);
        }
    }

    /// Register a factory and return the registry, for chaining
    pub fn with_source(mut self, factory: Box<dyn SnapshotSourceFactory>) -> Self {
        self.register(factory);
        self
    }

    /// Look up a factory by provider identifier
    pub fn get(&self, id: &str) -> Option<&dyn SnapshotSourceFactory> {
        self.sources.get(id).map(|f| f.as_ref())
    }

    /// Check if a provider is registered
    pub fn has_source(&self, id: &str) -> bool {
        self.sources.contains_key(id)
    }

    /// All registered provider identifiers, sorted
    pub fn list_sources(&self) -> Vec<&'static str> {
        let mut ids: Vec<&'static str> = self.sources.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Create a snapshot source from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn SnapshotSource>)`: Created source
    /// - `Err(Error::Config)`: Unknown provider, or flags that do not
    ///   satisfy the provider's flag set
    pub fn create_source(&self, config: &SourceConfig) -> Result<Box<dyn SnapshotSource>> {
        let factory = self.get(&config.provider).ok_or_else(|| {
            Error::config(format!(
                "Unknown provider \"{}\". Registered providers: {}",
                config.provider,
                self.list_sources().join(", ")
            ))
        })?;

        config.validate(factory.flags())?;

        tracing::debug!(
            "Creating {} source with flags {:?}",
            factory.id(),
            config.redacted(factory.flags())
        );

        factory.create(config)
    }
}
