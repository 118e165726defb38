use std::collections::BTreeMap;
use std::sync::Arc;

use helix_discovery::{Discovery, EndpointHandler, RegisteredEndpoint};
use helix_service::{EndpointSpec, ServiceContext, ServiceGraph, ServiceHandle};
use tracing::info;

use crate::config::ResolvedConfig;
use crate::error::{Error, Result};
use crate::registrar::Registration;

/// One declared endpoint bound to its backend registration and instance
/// handler.
pub struct BoundEndpoint {
    spec: EndpointSpec,
    registered: Arc<dyn RegisteredEndpoint>,
    handler: Arc<dyn EndpointHandler>,
}

impl BoundEndpoint {
    /// The endpoint's declared table entry.
    #[must_use]
    pub const fn spec(&self) -> &EndpointSpec {
        &self.spec
    }

    /// The backend-side registered endpoint.
    #[must_use]
    pub fn registered(&self) -> Arc<dyn RegisteredEndpoint> {
        self.registered.clone()
    }

    /// The instance handler bound to this endpoint.
    #[must_use]
    pub fn handler(&self) -> Arc<dyn EndpointHandler> {
        self.handler.clone()
    }
}

impl std::fmt::Debug for BoundEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundEndpoint")
            .field("spec", &self.spec)
            .finish_non_exhaustive()
    }
}

/// The full set of bound endpoints for the served service, in declaration
/// order.
pub struct BoundEndpoints {
    handle: Arc<dyn ServiceHandle>,
    endpoints: Vec<BoundEndpoint>,
}

impl std::fmt::Debug for BoundEndpoints {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundEndpoints")
            .field("endpoints", &self.endpoints)
            .finish_non_exhaustive()
    }
}

impl BoundEndpoints {
    /// The live service instance behind the endpoints.
    #[must_use]
    pub fn handle(&self) -> Arc<dyn ServiceHandle> {
        self.handle.clone()
    }

    /// All bound endpoints, in declaration order.
    #[must_use]
    pub fn endpoints(&self) -> &[BoundEndpoint] {
        &self.endpoints
    }

    /// The endpoint the lifecycle sequencer drives: the first declared one.
    ///
    /// # Panics
    ///
    /// Never panics: the binder rejects empty endpoint tables before this
    /// value exists.
    #[must_use]
    pub fn driven(&self) -> &BoundEndpoint {
        self.endpoints
            .first()
            .expect("bound endpoint table is non-empty by construction")
    }
}

/// Instantiates the served service and binds its declared endpoint table
/// against the registered component.
pub struct EndpointBinder<'a> {
    runtime: &'a Arc<dyn Discovery>,
    graph: &'a ServiceGraph,
    config: &'a ResolvedConfig,
}

impl<'a> EndpointBinder<'a> {
    /// Creates a binder over the resolved graph and configuration.
    #[must_use]
    pub const fn new(
        runtime: &'a Arc<dyn Discovery>,
        graph: &'a ServiceGraph,
        config: &'a ResolvedConfig,
    ) -> Self {
        Self {
            runtime,
            graph,
            config,
        }
    }

    /// Binds every declared endpoint, in declaration order.
    ///
    /// A service with an empty endpoint table is rejected before anything
    /// touches the backend: serving nothing is a definition bug, not a
    /// degraded mode.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for an empty endpoint table,
    /// [`Error::Service`] when instantiation fails, and [`Error::Binding`]
    /// when the backend refuses to mint an endpoint. A declared endpoint
    /// without a handler on the instance is also [`Error::Configuration`].
    pub async fn bind(&self, registration: &Registration) -> Result<BoundEndpoints> {
        let entry = self.graph.entry();
        let descriptor = entry.descriptor();

        if descriptor.endpoints().is_empty() {
            return Err(Error::Configuration(format!(
                "no endpoints declared for service {}",
                descriptor.name()
            )));
        }

        let mut dependencies = BTreeMap::new();
        for name in descriptor.dependencies() {
            if let Some(node) = self.graph.node(name) {
                dependencies.insert(name.clone(), node.clone());
            }
        }

        let context = ServiceContext {
            runtime: self.runtime.clone(),
            namespace: descriptor.namespace().to_string(),
            component: descriptor.component().to_string(),
            lease: registration.lease.clone(),
            role: self.graph.role(),
            env: self.config.env.clone(),
            runner_map: self.config.runner_map.clone(),
            worker_ordinal: self.config.identity.ordinal,
            dependencies,
        };

        let handle = entry.factory().instantiate(context)?;

        let mut endpoints = Vec::with_capacity(descriptor.endpoints().len());
        for spec in descriptor.endpoints() {
            let handler = handle.endpoint_handler(spec.name()).ok_or_else(|| {
                Error::Configuration(format!(
                    "service {} declares endpoint {} but provides no handler",
                    descriptor.name(),
                    spec.name()
                ))
            })?;

            let registered = registration
                .component
                .endpoint(spec.name())
                .await
                .map_err(Error::Binding)?;

            info!(
                service = descriptor.name(),
                endpoint = spec.name(),
                streaming = spec.is_streaming(),
                "bound endpoint"
            );
            endpoints.push(BoundEndpoint {
                spec: spec.clone(),
                registered,
                handler,
            });
        }

        Ok(BoundEndpoints { handle, endpoints })
    }
}
