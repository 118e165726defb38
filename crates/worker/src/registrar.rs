use std::sync::Arc;

use helix_discovery::{Component, Discovery, Lease};
use helix_service::ServiceGraph;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// The single registration a worker process holds.
pub struct Registration {
    /// The component handle minting this process's endpoints.
    pub component: Arc<dyn Component>,

    /// The active custom lease, when the service requested one.
    pub lease: Option<Lease>,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("namespace", &self.component.namespace())
            .field("component", &self.component.name())
            .field("lease", &self.lease.as_ref().map(Lease::id))
            .finish()
    }
}

/// Establishes this process's namespace/component identity with the
/// coordination backend. Called exactly once per process.
pub struct ComponentRegistrar<'a> {
    runtime: &'a Arc<dyn Discovery>,
    graph: &'a ServiceGraph,
}

impl<'a> ComponentRegistrar<'a> {
    /// Creates a registrar over the resolved graph.
    #[must_use]
    pub const fn new(runtime: &'a Arc<dyn Discovery>, graph: &'a ServiceGraph) -> Self {
        Self { runtime, graph }
    }

    /// Registers the entry component, then injects the backend handle into
    /// every dependency node so dependents can make outbound calls during
    /// startup hooks. Registration failure is fatal and never retried
    /// here: backend availability is a precondition, not a masked
    /// transient.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for a non-positive lease ttl and
    /// [`Error::Registration`] when the backend rejects the registration.
    pub async fn register(&self) -> Result<Registration> {
        let descriptor = self.graph.entry().descriptor();
        let namespace = descriptor.namespace();
        let component_name = descriptor.component();

        if let Some(lease) = descriptor.lease() {
            if lease.ttl_seconds == 0 {
                return Err(Error::Configuration(
                    "custom lease ttl must be a positive integer".to_string(),
                ));
            }
        }

        info!(namespace, component = component_name, "registering component");

        let registration = match descriptor.lease() {
            Some(config) => {
                let (component, lease) = self
                    .runtime
                    .create_leased_registration(namespace, component_name, config.ttl_seconds)
                    .await
                    .map_err(Error::Registration)?;
                info!(
                    service = descriptor.name(),
                    lease_id = %lease.id(),
                    "created component with custom lease"
                );
                Registration {
                    component,
                    lease: Some(lease),
                }
            }
            None => {
                let component = self
                    .runtime
                    .create_registration(namespace, component_name)
                    .await
                    .map_err(Error::Registration)?;
                info!(service = descriptor.name(), "created component");
                Registration {
                    component,
                    lease: None,
                }
            }
        };

        // Dependents may call out through the backend from their startup
        // hooks, so every dependency node gets the handle before binding.
        for node in self.graph.dependency_nodes() {
            node.bind_runtime(self.runtime.clone());
            debug!(
                dependency = node.descriptor().name(),
                "bound runtime for dependency"
            );
        }

        Ok(registration)
    }
}
