use std::collections::BTreeMap;
use std::sync::Arc;

use crate::descriptor::ServiceDescriptor;
use crate::error::{Error, Result};
use crate::handle::ServiceFactory;

/// A registered service: its declarative descriptor plus the factory that
/// instantiates it.
#[derive(Clone)]
pub struct ServiceDefinition {
    descriptor: ServiceDescriptor,
    factory: Arc<dyn ServiceFactory>,
}

impl ServiceDefinition {
    /// The service descriptor.
    #[must_use]
    pub const fn descriptor(&self) -> &ServiceDescriptor {
        &self.descriptor
    }

    /// The instance factory.
    #[must_use]
    pub fn factory(&self) -> Arc<dyn ServiceFactory> {
        self.factory.clone()
    }
}

impl std::fmt::Debug for ServiceDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceDefinition")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// The set of service definitions linked into this process.
///
/// The first registered service becomes the default entry, which the
/// locator `"."` resolves to.
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    services: BTreeMap<String, Arc<ServiceDefinition>>,
    default_entry: Option<String>,
}

impl ServiceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a service definition.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when a service with the same name
    /// is already registered.
    pub fn register(
        &mut self,
        descriptor: ServiceDescriptor,
        factory: Arc<dyn ServiceFactory>,
    ) -> Result<()> {
        let name = descriptor.name().to_string();
        if self.services.contains_key(&name) {
            return Err(Error::Configuration(format!(
                "service '{name}' is already registered"
            )));
        }

        if self.default_entry.is_none() {
            self.default_entry = Some(name.clone());
        }
        self.services.insert(
            name,
            Arc::new(ServiceDefinition {
                descriptor,
                factory,
            }),
        );
        Ok(())
    }

    /// Resolves a service locator to its definition. `"."` resolves the
    /// default entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the locator names no registered
    /// service, or the registry is empty.
    pub fn resolve(&self, locator: &str) -> Result<Arc<ServiceDefinition>> {
        let name = if locator == "." {
            self.default_entry.as_deref().ok_or_else(|| Error::NotFound {
                name: locator.to_string(),
            })?
        } else {
            locator
        };

        self.services
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NotFound {
                name: name.to_string(),
            })
    }

    /// All registered definitions, by name.
    pub fn definitions(&self) -> impl Iterator<Item = &Arc<ServiceDefinition>> {
        self.services.values()
    }
}
