//! Request logging.
//!
//! # Responsibilities
//! - Log method and path of every admitted request
//! - Read the body once for the log line, then hand forwarding a body that
//!   replays the same bytes from the start
//!
//! # Design Decisions
//! - The body is buffered up to `max_body_bytes`; past that the captured
//!   prefix is chained in front of the unread remainder, so forwarding
//!   always sees every byte the client sent
//! - A read error is logged and forwarding continues with what is left

use axum::body::{Body, BodyDataStream, Bytes};
use axum::http::{request::Parts, Extensions};
use futures_util::{stream, StreamExt};
use tower_http::request_id::RequestId;

use crate::config::RequestLogConfig;
use crate::security::ClientIp;

/// How far the body capture got.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// The whole body is in the buffer.
    Complete,
    /// The body outgrew the buffer; the rest is still streaming.
    Truncated,
    /// Reading failed part way through.
    Failed(String),
}

/// A buffered body prefix plus the body to forward.
pub struct BodyCapture {
    /// Bytes read for logging (at most the capture ceiling).
    pub captured: Bytes,
    pub outcome: CaptureOutcome,
    /// Replays `captured`, then anything not yet read.
    pub body: Body,
}

/// Read `body` into memory, up to `limit` bytes.
pub async fn capture_body(body: Body, limit: usize) -> BodyCapture {
    let mut stream = body.into_data_stream();
    let mut buf: Vec<u8> = Vec::new();

    loop {
        match stream.next().await {
            None => {
                let captured = Bytes::from(buf);
                return BodyCapture {
                    body: Body::from(captured.clone()),
                    captured,
                    outcome: CaptureOutcome::Complete,
                };
            }
            Some(Ok(chunk)) => {
                buf.extend_from_slice(&chunk);
                if buf.len() > limit {
                    return with_remainder(Bytes::from(buf), stream, limit, CaptureOutcome::Truncated);
                }
            }
            Some(Err(e)) => {
                return with_remainder(
                    Bytes::from(buf),
                    stream,
                    limit,
                    CaptureOutcome::Failed(e.to_string()),
                );
            }
        }
    }
}

fn with_remainder(
    read: Bytes,
    rest: BodyDataStream,
    limit: usize,
    outcome: CaptureOutcome,
) -> BodyCapture {
    let captured = read.slice(..read.len().min(limit));
    let head = stream::iter([Ok::<_, axum::Error>(read)]);
    BodyCapture {
        captured,
        outcome,
        body: Body::from_stream(head.chain(rest)),
    }
}

/// The `x-request-id` assigned to this request, or `"unknown"`.
pub fn request_id(extensions: &Extensions) -> &str {
    extensions
        .get::<RequestId>()
        .and_then(|id| id.header_value().to_str().ok())
        .unwrap_or("unknown")
}

/// Log the request line and body, returning the body to forward.
pub async fn log_request(
    parts: &Parts,
    client_ip: &ClientIp,
    body: Body,
    settings: &RequestLogConfig,
) -> Body {
    let request_id = request_id(&parts.extensions);

    tracing::info!(
        request_id = %request_id,
        client_ip = %client_ip,
        method = %parts.method,
        path = %parts.uri.path(),
        "Received request"
    );

    if !settings.log_bodies {
        return body;
    }

    let capture = capture_body(body, settings.max_body_bytes).await;
    let text = String::from_utf8_lossy(&capture.captured);

    match &capture.outcome {
        CaptureOutcome::Complete => {
            tracing::info!(request_id = %request_id, body = %text, "Request body");
        }
        CaptureOutcome::Truncated => {
            tracing::info!(
                request_id = %request_id,
                body = %text,
                limit = settings.max_body_bytes,
                "Request body (truncated)"
            );
        }
        CaptureOutcome::Failed(error) => {
            tracing::warn!(
                request_id = %request_id,
                error = %error,
                read = capture.captured.len(),
                "Error reading request body"
            );
        }
    }

    capture.body
}
