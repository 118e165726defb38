use std::sync::Arc;

use bytes::Bytes;
use helix_discovery::{Error, ResponseStream, Result};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::{EndpointKey, MemoryRequest, SharedState};

/// Caller-side handle for invoking a served in-memory endpoint.
///
/// Dropping the returned response stream mid-production propagates as a
/// disconnect into the serve loop, which stops driving the handler.
#[derive(Clone, Debug)]
pub struct MemoryEndpointClient {
    state: Arc<SharedState>,
    key: EndpointKey,
}

impl MemoryEndpointClient {
    pub(crate) const fn new(state: Arc<SharedState>, key: EndpointKey) -> Self {
        Self { state, key }
    }

    /// Sends one request and returns the response element stream.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the endpoint was never minted and
    /// [`Error::Endpoint`] when its serve loop has gone away.
    pub async fn invoke(&self, payload: Bytes) -> Result<ResponseStream> {
        let sender = self
            .state
            .endpoints
            .lock()
            .await
            .get(&self.key)
            .cloned()
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "endpoint '{}/{}/{}'",
                    self.key.0, self.key.1, self.key.2
                ))
            })?;

        let (reply, rx) = mpsc::channel(16);
        sender
            .send(MemoryRequest { payload, reply })
            .await
            .map_err(|_| Error::Endpoint(format!("endpoint '{}' is not serving", self.key.2)))?;

        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}
