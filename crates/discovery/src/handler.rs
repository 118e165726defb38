use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// Response elements produced by a handler, in production order.
///
/// A streaming handler yields one element per suspension; a
/// request/response handler yields exactly one (see [`unary_response`]).
pub type ResponseStream = Pin<Box<dyn Stream<Item = Bytes> + Send>>;

/// A handler bound to a service instance, invoked by the serve loop for
/// each incoming request on its endpoint.
///
/// The request type is declared in the service's endpoint table; the
/// response type is unconstrained and travels as opaque bytes.
#[async_trait]
pub trait EndpointHandler: Send + Sync + 'static {
    /// Handles one request, returning the response element stream.
    async fn handle(&self, request: Bytes) -> Result<ResponseStream>;
}

/// Wraps a single response payload as a one-element [`ResponseStream`].
pub fn unary_response(response: Bytes) -> ResponseStream {
    Box::pin(futures::stream::once(async move { response }))
}

/// Decodes a JSON request payload into the handler's declared request type.
///
/// # Errors
///
/// Returns [`Error::Handler`] when the payload does not deserialize.
pub fn decode_request<T: DeserializeOwned>(request: &Bytes) -> Result<T> {
    serde_json::from_slice(request)
        .map_err(|e| Error::Handler(format!("malformed request payload: {e}")))
}
