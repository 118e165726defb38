//! In-memory coordination/discovery backend for tests and local runs.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod client;
mod component;
mod endpoint;

pub use client::MemoryEndpointClient;
pub use component::MemoryComponent;
pub use endpoint::MemoryEndpoint;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use helix_discovery::{Component, Discovery, Error, Lease, LeaseId, Result};
use tokio::sync::{Mutex, mpsc};
use tracing::info;

/// A request in flight to a served endpoint.
#[derive(Debug)]
pub(crate) struct MemoryRequest {
    pub payload: Bytes,
    pub reply: mpsc::Sender<Bytes>,
}

/// (namespace, component, endpoint) key into the endpoint channel table.
pub(crate) type EndpointKey = (String, String, String);

/// Record of one leased registration, for test assertions.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LeasedRegistration {
    /// Namespace registered under.
    pub namespace: String,
    /// Component name registered as.
    pub component: String,
    /// Requested lease ttl.
    pub ttl_seconds: u64,
    /// Issued lease id.
    pub lease_id: LeaseId,
}

/// Record of one serve call, for test assertions.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ServeRecord {
    /// Endpoint name the serve loop was driven for.
    pub endpoint: String,
    /// Lease id passed into serve, when any.
    pub lease_id: Option<LeaseId>,
}

#[derive(Debug, Default)]
pub(crate) struct SharedState {
    pub registrations: Mutex<HashMap<(String, String), Option<LeaseId>>>,
    pub endpoints: Mutex<HashMap<EndpointKey, mpsc::Sender<MemoryRequest>>>,
    pub leases: Mutex<HashMap<LeaseId, Lease>>,
    pub next_lease_id: AtomicU64,
    pub fail_registrations: AtomicBool,

    // test introspection
    pub leased_calls: Mutex<Vec<LeasedRegistration>>,
    pub minted: Mutex<Vec<String>>,
    pub serves: Mutex<Vec<ServeRecord>>,
}

/// In-memory [`Discovery`] backend.
///
/// Registration is atomic: the registration table is mutated under a single
/// lock, so a cancelled registration call never leaves a partially
/// registered component visible. Leases never expire on a timer here;
/// revocation is explicit via [`Self::revoke`].
#[derive(Clone, Debug, Default)]
pub struct MemoryDiscovery {
    state: Arc<SharedState>,
}

impl MemoryDiscovery {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent registration calls fail, to exercise fatal
    /// registration paths.
    pub fn fail_registrations(&self, fail: bool) {
        self.state.fail_registrations.store(fail, Ordering::SeqCst);
    }

    /// Revokes the lease with the given id. All read handles observe it
    /// and any serve loop holding it exits.
    pub async fn revoke(&self, id: LeaseId) {
        let leases = self.state.leases.lock().await;
        if let Some(lease) = leases.get(&id) {
            info!(lease_id = %id, "revoking lease");
            lease.revoke();
        }
    }

    /// Number of registered components.
    pub async fn registration_count(&self) -> usize {
        self.state.registrations.lock().await.len()
    }

    /// Leased registration calls observed so far, in call order.
    pub async fn leased_registrations(&self) -> Vec<LeasedRegistration> {
        self.state.leased_calls.lock().await.clone()
    }

    /// Number of live leases.
    pub async fn lease_count(&self) -> usize {
        self.state.leases.lock().await.len()
    }

    /// Endpoint names minted so far, in mint order.
    pub async fn minted_endpoints(&self) -> Vec<String> {
        self.state.minted.lock().await.clone()
    }

    /// Serve calls observed so far, in call order.
    pub async fn serves(&self) -> Vec<ServeRecord> {
        self.state.serves.lock().await.clone()
    }

    /// A caller-side client for invoking a served endpoint.
    #[must_use]
    pub fn client(&self, namespace: &str, component: &str, endpoint: &str) -> MemoryEndpointClient {
        MemoryEndpointClient::new(
            self.state.clone(),
            (
                namespace.to_string(),
                component.to_string(),
                endpoint.to_string(),
            ),
        )
    }

    async fn register(
        &self,
        namespace: &str,
        component_name: &str,
        lease_id: Option<LeaseId>,
    ) -> Result<Arc<dyn Component>> {
        if self.state.fail_registrations.load(Ordering::SeqCst) {
            return Err(Error::Registration(
                "coordination backend unavailable".to_string(),
            ));
        }

        let key = (namespace.to_string(), component_name.to_string());
        let mut registrations = self.state.registrations.lock().await;
        if registrations.contains_key(&key) {
            return Err(Error::Registration(format!(
                "component '{namespace}/{component_name}' is already registered"
            )));
        }
        registrations.insert(key, lease_id);
        drop(registrations);

        info!(namespace, component = component_name, "registered component");

        Ok(Arc::new(MemoryComponent::new(
            namespace.to_string(),
            component_name.to_string(),
            self.state.clone(),
        )))
    }
}

#[async_trait]
impl Discovery for MemoryDiscovery {
    async fn create_registration(
        &self,
        namespace: &str,
        component_name: &str,
    ) -> Result<Arc<dyn Component>> {
        self.register(namespace, component_name, None).await
    }

    async fn create_leased_registration(
        &self,
        namespace: &str,
        component_name: &str,
        ttl_seconds: u64,
    ) -> Result<(Arc<dyn Component>, Lease)> {
        let id = LeaseId::new(self.state.next_lease_id.fetch_add(1, Ordering::SeqCst) + 1);
        let lease = Lease::new(id, ttl_seconds);

        // The lease goes in before the registration: a registered
        // component must always have a revocable lease, even if this
        // future is dropped between the two table writes.
        self.state.leases.lock().await.insert(id, lease.clone());

        let component = match self.register(namespace, component_name, Some(id)).await {
            Ok(component) => component,
            Err(e) => {
                self.state.leases.lock().await.remove(&id);
                return Err(e);
            }
        };

        self.state
            .leased_calls
            .lock()
            .await
            .push(LeasedRegistration {
                namespace: namespace.to_string(),
                component: component_name.to_string(),
                ttl_seconds,
                lease_id: id,
            });

        Ok((component, lease))
    }
}
