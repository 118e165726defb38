use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use helix_discovery::{EndpointHandler, Error, Lease, RegisteredEndpoint, Result};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, error};

use crate::{MemoryRequest, ServeRecord, SharedState};

/// An endpoint minted from a [`crate::MemoryComponent`], holding the
/// request receiver until serve is called.
#[derive(Debug)]
pub struct MemoryEndpoint {
    name: String,
    rx: Mutex<Option<mpsc::Receiver<MemoryRequest>>>,
    state: Arc<SharedState>,
}

impl MemoryEndpoint {
    pub(crate) fn new(
        name: String,
        rx: mpsc::Receiver<MemoryRequest>,
        state: Arc<SharedState>,
    ) -> Self {
        Self {
            name,
            rx: Mutex::new(Some(rx)),
            state,
        }
    }
}

async fn lease_revoked(lease: Option<&Lease>) {
    match lease {
        Some(lease) => lease.revoked().await,
        None => std::future::pending().await,
    }
}

#[async_trait]
impl RegisteredEndpoint for MemoryEndpoint {
    fn name(&self) -> &str {
        &self.name
    }

    async fn serve(&self, handler: Arc<dyn EndpointHandler>, lease: Option<Lease>) -> Result<()> {
        let mut rx = self
            .rx
            .lock()
            .await
            .take()
            .ok_or_else(|| Error::Endpoint(format!("endpoint '{}' is already serving", self.name)))?;

        self.state.serves.lock().await.push(ServeRecord {
            endpoint: self.name.clone(),
            lease_id: lease.as_ref().map(Lease::id),
        });

        loop {
            tokio::select! {
                biased;
                () = lease_revoked(lease.as_ref()) => {
                    debug!(endpoint = self.name, "lease revoked, exiting serve loop");
                    break;
                }
                request = rx.recv() => {
                    let Some(request) = request else {
                        debug!(endpoint = self.name, "request channel closed, exiting serve loop");
                        break;
                    };
                    match handler.handle(request.payload).await {
                        Ok(mut stream) => {
                            // One element per suspension, in production order.
                            // A failed send means the caller disconnected;
                            // stop driving the handler stream instead of
                            // draining it.
                            while let Some(element) = stream.next().await {
                                if request.reply.send(element).await.is_err() {
                                    debug!(
                                        endpoint = self.name,
                                        "caller disconnected, dropping response stream"
                                    );
                                    break;
                                }
                            }
                        }
                        Err(e) => {
                            error!(endpoint = self.name, "error handling request: {e}");
                        }
                    }
                }
            }
        }

        Ok(())
    }
}
