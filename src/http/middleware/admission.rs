//! Admission middleware.
//! Resolves the client address and enforces the allowlist and bearer secret.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use crate::error::GateError;
use crate::http::request_log::request_id;
use crate::security::{resolve_client_ip, AdmissionDecision, AdmissionGuard, ClientIp};

pub async fn admission_middleware(
    State(guard): State<Arc<AdmissionGuard>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let client_ip = resolve_client_ip(req.headers(), &peer.to_string());

    let request_id = request_id(req.extensions()).to_string();

    tracing::info!(
        request_id = %request_id,
        client_ip = %client_ip,
        "Gate called"
    );

    match guard.check(&client_ip, req.headers()) {
        AdmissionDecision::Allowed => {
            req.extensions_mut().insert(ClientIp(client_ip));
            next.run(req).await
        }
        AdmissionDecision::Rejected(reason) => {
            tracing::info!(
                request_id = %request_id,
                client_ip = %client_ip,
                reason = reason.code(),
                "Request rejected"
            );
            GateError::Unauthorized(reason).into_response()
        }
    }
}
