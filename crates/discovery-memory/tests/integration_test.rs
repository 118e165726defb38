//! End-to-end tests of the in-memory discovery backend: registration
//! atomicity, lease revocation, and streaming serve behavior.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use helix_discovery::{
    Discovery, EndpointHandler, Error, ResponseStream, Result, unary_response,
};
use helix_discovery_memory::MemoryDiscovery;

/// Streams the request payload back one byte per element.
#[derive(Debug)]
struct ByteStreamer;

#[async_trait]
impl EndpointHandler for ByteStreamer {
    async fn handle(&self, request: Bytes) -> Result<ResponseStream> {
        let stream = futures::stream::iter(
            request
                .into_iter()
                .map(|b| Bytes::copy_from_slice(&[b]))
                .collect::<Vec<_>>(),
        );
        Ok(Box::pin(stream))
    }
}

/// Produces elements forever, counting how many were driven.
#[derive(Debug)]
struct InfiniteProducer {
    produced: Arc<AtomicUsize>,
}

#[async_trait]
impl EndpointHandler for InfiniteProducer {
    async fn handle(&self, _request: Bytes) -> Result<ResponseStream> {
        let produced = self.produced.clone();
        let stream = futures::stream::unfold(0u64, move |n| {
            let produced = produced.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                produced.fetch_add(1, Ordering::SeqCst);
                Some((Bytes::from(n.to_string()), n + 1))
            }
        });
        Ok(Box::pin(stream))
    }
}

/// Replies with a single fixed payload.
#[derive(Debug)]
struct Echo;

#[async_trait]
impl EndpointHandler for Echo {
    async fn handle(&self, request: Bytes) -> Result<ResponseStream> {
        Ok(unary_response(request))
    }
}

#[tokio::test]
async fn duplicate_registration_is_rejected() {
    let discovery = MemoryDiscovery::new();

    discovery
        .create_registration("ns", "backend")
        .await
        .unwrap();
    let second = discovery.create_registration("ns", "backend").await;

    assert!(matches!(second, Err(Error::Registration(_))));
    assert_eq!(discovery.registration_count().await, 1);
}

#[tokio::test]
async fn streamed_elements_preserve_production_order() {
    let discovery = MemoryDiscovery::new();
    let component = discovery
        .create_registration("ns", "backend")
        .await
        .unwrap();
    let endpoint = component.endpoint("generate").await.unwrap();

    let serve = tokio::spawn(async move { endpoint.serve(Arc::new(ByteStreamer), None).await });

    let client = discovery.client("ns", "backend", "generate");
    let mut stream = client.invoke(Bytes::from_static(b"abc")).await.unwrap();

    let mut collected = Vec::new();
    while let Some(element) = stream.next().await {
        collected.push(element);
        if collected.len() == 3 {
            break;
        }
    }
    assert_eq!(
        collected,
        vec![
            Bytes::from_static(b"a"),
            Bytes::from_static(b"b"),
            Bytes::from_static(b"c"),
        ]
    );

    serve.abort();
}

#[tokio::test]
async fn caller_disconnect_stops_production() {
    let discovery = MemoryDiscovery::new();
    let component = discovery
        .create_registration("ns", "backend")
        .await
        .unwrap();
    let endpoint = component.endpoint("generate").await.unwrap();

    let produced = Arc::new(AtomicUsize::new(0));
    let handler = Arc::new(InfiniteProducer {
        produced: produced.clone(),
    });
    let serve = tokio::spawn(async move { endpoint.serve(handler, None).await });

    let client = discovery.client("ns", "backend", "generate");
    let mut stream = client.invoke(Bytes::new()).await.unwrap();

    // Take a few elements, then disconnect.
    for _ in 0..3 {
        assert!(stream.next().await.is_some());
    }
    drop(stream);

    // The reply channel is bounded at 16: production must stop shortly
    // after disconnect instead of draining the infinite stream.
    tokio::time::sleep(Duration::from_millis(300)).await;
    let after_disconnect = produced.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(produced.load(Ordering::SeqCst), after_disconnect);

    serve.abort();
}

#[tokio::test]
async fn lease_revocation_ends_a_blocking_serve() {
    let discovery = MemoryDiscovery::new();
    let (component, lease) = discovery
        .create_leased_registration("ns", "backend", 30)
        .await
        .unwrap();
    let endpoint = component.endpoint("generate").await.unwrap();

    let serve_lease = lease.clone();
    let serve =
        tokio::spawn(async move { endpoint.serve(Arc::new(Echo), Some(serve_lease)).await });

    discovery.revoke(lease.id()).await;

    let result = tokio::time::timeout(Duration::from_secs(1), serve)
        .await
        .expect("serve loop should exit after revocation")
        .unwrap();
    assert!(result.is_ok());
    assert!(lease.is_revoked());
}

#[tokio::test]
async fn leased_registration_records_the_requested_ttl() {
    let discovery = MemoryDiscovery::new();
    let (_component, lease) = discovery
        .create_leased_registration("ns", "backend", 7)
        .await
        .unwrap();

    let calls = discovery.leased_registrations().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].ttl_seconds, 7);
    assert_eq!(calls[0].lease_id, lease.id());
    assert_eq!(lease.ttl_seconds(), 7);
}

#[tokio::test]
async fn failed_leased_registration_leaves_no_lease_behind() {
    let discovery = MemoryDiscovery::new();
    discovery.fail_registrations(true);

    let result = discovery.create_leased_registration("ns", "backend", 30).await;
    assert!(matches!(result, Err(Error::Registration(_))));
    assert_eq!(discovery.registration_count().await, 0);
    assert_eq!(discovery.lease_count().await, 0);

    // Once the backend recovers, a retried registration issues a fresh,
    // revocable lease.
    discovery.fail_registrations(false);
    let (_component, lease) = discovery
        .create_leased_registration("ns", "backend", 30)
        .await
        .unwrap();
    assert_eq!(discovery.lease_count().await, 1);

    discovery.revoke(lease.id()).await;
    assert!(lease.is_revoked());
}

#[tokio::test]
async fn serving_twice_on_one_endpoint_fails() {
    let discovery = MemoryDiscovery::new();
    let component = discovery
        .create_registration("ns", "backend")
        .await
        .unwrap();
    let endpoint = component.endpoint("generate").await.unwrap();

    let first = endpoint.clone();
    let serve = tokio::spawn(async move { first.serve(Arc::new(Echo), None).await });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let second = endpoint.serve(Arc::new(Echo), None).await;
    assert!(matches!(second, Err(Error::Endpoint(_))));

    serve.abort();
}

#[tokio::test]
async fn invoking_an_unminted_endpoint_is_not_found() {
    let discovery = MemoryDiscovery::new();
    let client = discovery.client("ns", "backend", "ghost");

    let result = client.invoke(Bytes::new()).await;
    assert!(matches!(result, Err(Error::NotFound(_))));
}
