use std::sync::Arc;

use async_trait::async_trait;
use helix_discovery::{Component, RegisteredEndpoint, Result};
use tokio::sync::mpsc;
use tracing::debug;

use crate::endpoint::MemoryEndpoint;
use crate::{MemoryRequest, SharedState};

/// The single component handle of an in-memory registration.
#[derive(Debug)]
pub struct MemoryComponent {
    namespace: String,
    name: String,
    state: Arc<SharedState>,
}

impl MemoryComponent {
    pub(crate) const fn new(namespace: String, name: String, state: Arc<SharedState>) -> Self {
        Self {
            namespace,
            name,
            state,
        }
    }
}

#[async_trait]
impl Component for MemoryComponent {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn endpoint(&self, name: &str) -> Result<Arc<dyn RegisteredEndpoint>> {
        let (tx, rx) = mpsc::channel::<MemoryRequest>(64);

        let key = (
            self.namespace.clone(),
            self.name.clone(),
            name.to_string(),
        );
        self.state.endpoints.lock().await.insert(key, tx);
        self.state.minted.lock().await.push(name.to_string());

        debug!(
            namespace = self.namespace,
            component = self.name,
            endpoint = name,
            "minted endpoint"
        );

        Ok(Arc::new(MemoryEndpoint::new(
            name.to_string(),
            rx,
            self.state.clone(),
        )))
    }
}
