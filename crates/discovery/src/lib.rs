//! Contract for the coordination/discovery backend consumed by helix workers.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod component;
mod error;
mod handler;
mod lease;

pub use component::{Component, RegisteredEndpoint};
pub use error::{Error, Result};
pub use handler::{EndpointHandler, ResponseStream, decode_request, unary_response};
pub use lease::{Lease, LeaseId};

use std::sync::Arc;

use async_trait::async_trait;

/// A coordination/discovery backend through which a worker process
/// establishes its namespace/component identity.
///
/// A process registers exactly once; the resulting [`Component`] mints the
/// endpoints callers reach it through. Registration is atomic from the
/// backend's perspective: a cancelled registration never leaves a
/// partially-registered, externally-reachable component behind.
#[async_trait]
pub trait Discovery: Send + Sync + 'static {
    /// Registers `component_name` under `namespace` with the backend's
    /// default liveness tracking.
    async fn create_registration(
        &self,
        namespace: &str,
        component_name: &str,
    ) -> Result<Arc<dyn Component>>;

    /// Registers `component_name` under `namespace` with a caller-supplied
    /// finite lease of `ttl_seconds`.
    ///
    /// The returned [`Lease`] is a read handle; the backend owns the lease
    /// and is the only party that revokes it.
    async fn create_leased_registration(
        &self,
        namespace: &str,
        component_name: &str,
        ttl_seconds: u64,
    ) -> Result<(Arc<dyn Component>, Lease)>;
}
