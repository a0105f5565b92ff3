//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header::CONTENT_TYPE, HeaderMap, HeaderValue, Method, Request, Response, Uri},
    Router,
};
use futures_util::{stream, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Notify};

use inference_gate::{GateConfig, GateServer, Shutdown};

/// What the mock backend saw for one request.
#[derive(Debug)]
pub struct Recorded {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
}

pub struct MockBackend {
    pub addr: SocketAddr,
    pub received: mpsc::UnboundedReceiver<Recorded>,
}

#[derive(Clone)]
struct RecorderState {
    tx: mpsc::UnboundedSender<Recorded>,
    content_type: Option<&'static str>,
    body: &'static str,
}

async fn record(State(state): State<RecorderState>, request: Request<Body>) -> Response<Body> {
    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, usize::MAX)
        .await
        .unwrap_or_default();
    let _ = state.tx.send(Recorded {
        method: parts.method,
        uri: parts.uri,
        headers: parts.headers,
        body,
    });

    let mut response = Response::new(Body::from(state.body));
    if let Some(content_type) = state.content_type {
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    }
    response
}

/// Serve `router` on an ephemeral local port.
pub async fn serve(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    addr
}

/// Start a backend that records every request and answers with a fixed body.
pub async fn start_recording_backend(
    content_type: Option<&'static str>,
    body: &'static str,
) -> MockBackend {
    let (tx, received) = mpsc::unbounded_channel();
    let state = RecorderState {
        tx,
        content_type,
        body,
    };
    let addr = serve(Router::new().fallback(record).with_state(state)).await;
    MockBackend { addr, received }
}

/// Start a backend that streams two NDJSON chunks and holds the second
/// until `release` is notified.
pub async fn start_streaming_backend(release: Arc<Notify>) -> SocketAddr {
    let handler = move || {
        let release = release.clone();
        async move {
            let first = stream::once(async { Ok::<_, Infallible>(Bytes::from_static(b"{\"response\":\"one\"}\n")) });
            let second = stream::once(async move {
                release.notified().await;
                Ok::<_, Infallible>(Bytes::from_static(b"{\"response\":\"two\",\"done\":true}\n"))
            });

            let mut response = Response::new(Body::from_stream(first.chain(second)));
            response.headers_mut().insert(
                CONTENT_TYPE,
                HeaderValue::from_static("application/x-ndjson"),
            );
            response
        }
    };
    serve(Router::new().fallback(handler)).await
}

/// Start a backend that waits `delay` before sending any response headers.
pub async fn start_slow_header_backend(delay: Duration) -> SocketAddr {
    let handler = move || async move {
        tokio::time::sleep(delay).await;
        "late"
    };
    serve(Router::new().fallback(handler)).await
}

/// Start a backend that answers at once but sends `chunks` one per `gap`.
pub async fn start_slow_body_backend(chunks: &'static [&'static str], gap: Duration) -> SocketAddr {
    let handler = move || async move {
        let body = stream::iter(chunks).then(move |chunk| async move {
            tokio::time::sleep(gap).await;
            Ok::<_, Infallible>(Bytes::from_static(chunk.as_bytes()))
        });
        Response::new(Body::from_stream(body))
    };
    serve(Router::new().fallback(handler)).await
}

/// An address nothing is listening on.
pub fn closed_port() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Config pointing at `backend`, with optional secret and allowlist.
pub fn gate_config(backend: SocketAddr, api_key: Option<&str>, allowed_ips: &[&str]) -> GateConfig {
    let mut config = GateConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.backend.url = format!("http://{}", backend);
    config.auth.require_api_key = api_key.is_some();
    config.auth.api_key = api_key.map(str::to_string);
    config.auth.allowed_ips = allowed_ips.iter().map(|ip| ip.to_string()).collect();
    config
}

/// Start the gate on an ephemeral port.
pub async fn start_gate(config: GateConfig) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = GateServer::new(config).unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
