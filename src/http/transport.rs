//! Backend transport with streaming-aware response fix-up.
//!
//! # Responsibilities
//! - Send the rewritten request over a pooled HTTP/1.1 client
//! - Stream the backend body to the client frame by frame
//! - Force `Content-Type: text/event-stream` when the client asked for an
//!   event stream, so no intermediary buffers the response
//!
//! # Design Decisions
//! - The override keys off the *request's* `Accept` header, not what the
//!   backend declared
//! - No retries; transport failures map to 502 upstream of here
//! - Timeouts are optional and only cover the wait for response headers

use std::time::Duration;

use axum::{
    body::Body,
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderMap, HeaderValue, Request, Response,
    },
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;

use crate::config::TimeoutConfig;
use crate::http::director::strip_hop_by_hop;

pub const EVENT_STREAM: &str = "text/event-stream";

/// Backend call failure.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("upstream request failed: {0}")]
    Request(#[from] hyper_util::client::legacy::Error),

    #[error("upstream did not respond within {0:?}")]
    Timeout(Duration),
}

/// Force the event-stream content type if `accept` is exactly `text/event-stream`.
///
/// Returns whether the override was applied.
pub fn apply_stream_content_type(accept: Option<&HeaderValue>, headers: &mut HeaderMap) -> bool {
    let wants_stream = accept.is_some_and(|v| v.as_bytes() == EVENT_STREAM.as_bytes());
    if wants_stream {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(EVENT_STREAM));
    }
    wants_stream
}

/// The first `Accept` value of an inbound request.
pub fn accept_of(headers: &HeaderMap) -> Option<HeaderValue> {
    headers.get(ACCEPT).cloned()
}

/// HTTP client wrapper that executes outbound requests.
#[derive(Clone)]
pub struct StreamingTransport {
    client: Client<HttpConnector, Body>,
    response_timeout: Option<Duration>,
}

impl StreamingTransport {
    pub fn new(timeouts: &TimeoutConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(timeouts.connect_secs.map(Duration::from_secs));
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            client,
            response_timeout: timeouts.response_secs.map(Duration::from_secs),
        }
    }

    /// Execute `request` and return the backend response, body still streaming.
    ///
    /// `accept` is the original inbound request's `Accept` value.
    pub async fn round_trip(
        &self,
        request: Request<Body>,
        accept: Option<&HeaderValue>,
    ) -> Result<Response<Body>, TransportError> {
        let pending = self.client.request(request);
        let response = match self.response_timeout {
            Some(limit) => tokio::time::timeout(limit, pending)
                .await
                .map_err(|_| TransportError::Timeout(limit))??,
            None => pending.await?,
        };

        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        if apply_stream_content_type(accept, &mut parts.headers) {
            tracing::debug!(status = %parts.status, "Forcing event-stream content type");
        }

        Ok(Response::from_parts(parts, Body::new(body)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_content_type(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_event_stream_forced() {
        let accept = HeaderValue::from_static("text/event-stream");

        let mut headers = with_content_type("application/x-ndjson");
        assert!(apply_stream_content_type(Some(&accept), &mut headers));
        assert_eq!(headers[CONTENT_TYPE], "text/event-stream");

        let mut headers = HeaderMap::new();
        assert!(apply_stream_content_type(Some(&accept), &mut headers));
        assert_eq!(headers[CONTENT_TYPE], "text/event-stream");
    }

    #[test]
    fn test_other_accept_passes_through() {
        for accept in [
            "application/json",
            "*/*",
            "text/event-stream, application/json",
            "text/event-stream ",
            "Text/Event-Stream",
        ] {
            let accept = HeaderValue::from_static(accept);
            let mut headers = with_content_type("application/json");
            assert!(!apply_stream_content_type(Some(&accept), &mut headers));
            assert_eq!(headers[CONTENT_TYPE], "application/json");
        }

        let mut headers = HeaderMap::new();
        assert!(!apply_stream_content_type(None, &mut headers));
        assert!(headers.get(CONTENT_TYPE).is_none());
    }

    #[test]
    fn test_accept_of_uses_first_value() {
        let mut headers = HeaderMap::new();
        headers.append(ACCEPT, HeaderValue::from_static("text/event-stream"));
        headers.append(ACCEPT, HeaderValue::from_static("application/json"));
        assert_eq!(accept_of(&headers).unwrap(), "text/event-stream");
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = StreamingTransport::new(&TimeoutConfig::default());
        let request = Request::builder()
            .uri(format!("http://{}/v1/models", addr))
            .body(Body::empty())
            .unwrap();

        let err = transport.round_trip(request, None).await.unwrap_err();
        assert!(matches!(err, TransportError::Request(_)));
    }

    #[tokio::test]
    async fn test_silent_backend_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let held = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
            drop(socket);
        });

        let transport = StreamingTransport::new(&TimeoutConfig {
            connect_secs: Some(1),
            response_secs: Some(1),
        });
        let request = Request::builder()
            .uri(format!("http://{}/v1/models", addr))
            .body(Body::empty())
            .unwrap();

        let err = transport.round_trip(request, None).await.unwrap_err();
        assert!(matches!(err, TransportError::Timeout(limit) if limit == Duration::from_secs(1)));
        held.abort();
    }
}
