use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use async_trait::async_trait;
use helix_discovery::{Discovery, EndpointHandler, Lease};

use crate::error::Result;
use crate::graph::ServiceNode;

/// Error type for startup hooks.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// Whether this process serves the located service itself or one of its
/// dependencies selected by a name override.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ServiceRole {
    /// The entry service of the located graph.
    Entry,
    /// A dependency node selected by name override.
    Dependency,
}

/// Everything a service instance needs at construction time, threaded as a
/// value from the configuration resolver and registrar. Instances never
/// read ambient process state.
#[derive(Clone)]
pub struct ServiceContext {
    /// Handle onto the coordination/discovery backend, for outbound calls.
    pub runtime: Arc<dyn Discovery>,

    /// The namespace this process registered under.
    pub namespace: String,

    /// The component name this process registered as.
    pub component: String,

    /// The active lease, when the service requested a custom one.
    pub lease: Option<Lease>,

    /// Entry or dependency role of this process.
    pub role: ServiceRole,

    /// Key/value pairs from this worker's configuration shard.
    pub env: BTreeMap<String, String>,

    /// Runner name to address mapping.
    pub runner_map: BTreeMap<String, String>,

    /// This worker's 1-based ordinal, when launched from a shard list.
    pub worker_ordinal: Option<NonZeroUsize>,

    /// Dependency nodes of the served service, with the backend handle
    /// already injected.
    pub dependencies: BTreeMap<String, Arc<ServiceNode>>,
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("namespace", &self.namespace)
            .field("component", &self.component)
            .field("role", &self.role)
            .field("worker_ordinal", &self.worker_ordinal)
            .finish_non_exhaustive()
    }
}

/// A live service instance with its endpoint handlers and startup hooks
/// bound to instance state.
#[async_trait]
pub trait ServiceHandle: Send + Sync + 'static {
    /// The handler bound to the declared endpoint `name`, if the instance
    /// provides one.
    fn endpoint_handler(&self, name: &str) -> Option<Arc<dyn EndpointHandler>>;

    /// Runs the declared startup hook `name` to completion.
    async fn run_hook(&self, name: &str) -> std::result::Result<(), HookError>;
}

/// Instantiates a service from its descriptor's declarative tables.
pub trait ServiceFactory: Send + Sync + 'static {
    /// Creates the service instance for this process.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Configuration`] when the instance cannot be
    /// constructed from the given context.
    fn instantiate(&self, context: ServiceContext) -> Result<Arc<dyn ServiceHandle>>;
}
