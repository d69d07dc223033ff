use std::collections::HashMap;

use async_trait::async_trait;

use super::provider::{BuiltinDefaultsProvider, DefaultsProvider, ProviderError};

/// Backend-agnostic description of where defaults come from.
///
/// `backend` must match the [`ProviderFactory::backend_name`] of a
/// registered factory. `location` is passed through to that factory
/// unchanged; its meaning is backend-specific.
///
/// | backend    | location examples                  |
/// |------------|------------------------------------|
/// | `builtin`  | ignored                            |
/// | `file`     | `data/`, `/srv/dscr/defaults`      |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultsSource {
    /// Lowercase identifier matching a registered factory (e.g. `"file"`).
    pub backend: String,
    /// Opaque value forwarded to the factory's `create` method.
    pub location: String,
}

impl Default for DefaultsSource {
    fn default() -> Self {
        Self {
            backend: BuiltinProviderFactory::BACKEND.to_string(),
            location: String::new(),
        }
    }
}

/// One implementation per defaults backend, registered with a
/// [`ProviderRegistry`] at startup.
#[async_trait]
pub trait ProviderFactory: Send + Sync {
    /// Unique, lowercase identifier for this backend.
    fn backend_name(&self) -> &'static str;

    /// Build a provider for `source`. Implementations may validate the
    /// location here; the data itself is read lazily by the provider.
    async fn create(
        &self,
        source: &DefaultsSource,
    ) -> Result<Box<dyn DefaultsProvider>, ProviderError>;
}

/// Factory for [`BuiltinDefaultsProvider`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinProviderFactory;

impl BuiltinProviderFactory {
    pub const BACKEND: &'static str = "builtin";
}

#[async_trait]
impl ProviderFactory for BuiltinProviderFactory {
    fn backend_name(&self) -> &'static str {
        Self::BACKEND
    }

    async fn create(
        &self,
        _source: &DefaultsSource,
    ) -> Result<Box<dyn DefaultsProvider>, ProviderError> {
        Ok(Box::new(BuiltinDefaultsProvider))
    }
}

/// Registry of [`ProviderFactory`] instances, keyed by backend name.
///
/// Typical lifetime:
/// 1. Create with `ProviderRegistry::new()`.
/// 2. Call `register` once per known backend.
/// 3. Call `create` with the configured [`DefaultsSource`].
pub struct ProviderRegistry {
    factories: HashMap<&'static str, Box<dyn ProviderFactory>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// A registry with the builtin backend already registered.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(BuiltinProviderFactory));
        registry
    }

    /// Register a backend factory, replacing any factory of the same name.
    pub fn register(
        &mut self,
        factory: Box<dyn ProviderFactory>,
    ) {
        self.factories.insert(factory.backend_name(), factory);
    }

    /// Names of every registered backend, sorted alphabetically.
    pub fn available_backends(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Dispatch to the factory that matches `source.backend`.
    ///
    /// # Errors
    /// * [`ProviderError::Configuration`] when no factory is registered for
    ///   the requested backend name.
    /// * Any error the chosen factory itself returns.
    pub async fn create(
        &self,
        source: &DefaultsSource,
    ) -> Result<Box<dyn DefaultsProvider>, ProviderError> {
        let factory = self
            .factories
            .get(source.backend.as_str())
            .ok_or_else(|| {
                ProviderError::Configuration(format!(
                    "unknown backend '{}'; available: {:?}",
                    source.backend,
                    self.available_backends()
                ))
            })?;

        factory.create(source).await
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
