use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::handler::EndpointHandler;
use crate::lease::Lease;

/// A registered component: the namespace-scoped registration point through
/// which callers reach this process's endpoints.
///
/// There is exactly one component handle per worker process.
#[async_trait]
pub trait Component: Send + Sync + 'static {
    /// The namespace this component is registered under.
    fn namespace(&self) -> &str;

    /// The component name within the namespace.
    fn name(&self) -> &str;

    /// Mints the registered endpoint with the given name.
    ///
    /// The endpoint is not reachable by callers until [`RegisteredEndpoint::serve`]
    /// is called on it.
    async fn endpoint(&self, name: &str) -> Result<Arc<dyn RegisteredEndpoint>>;
}

/// An endpoint minted from a [`Component`], bound to a name but not yet
/// driven.
#[async_trait]
pub trait RegisteredEndpoint: Send + Sync + 'static {
    /// The endpoint name.
    fn name(&self) -> &str;

    /// Serves requests with `handler` until the lease is revoked by the
    /// backend or the returned future is dropped by process shutdown.
    ///
    /// When `lease` is `None` the endpoint serves under the component's
    /// default registration and only process cancellation ends it.
    async fn serve(&self, handler: Arc<dyn EndpointHandler>, lease: Option<Lease>) -> Result<()>;
}
