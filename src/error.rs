//! Request-path errors and their HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::http::transport::TransportError;
use crate::security::RejectReason;

/// Errors that end a proxied request early.
#[derive(Debug, Error)]
pub enum GateError {
    /// Admission failed. The reason is logged, never sent to the client.
    #[error("request rejected ({0})")]
    Unauthorized(RejectReason),

    /// The backend could not be reached or dropped the request.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The outbound request could not be built.
    #[error("failed to rewrite request: {0}")]
    Rewrite(String),
}

impl GateError {
    pub fn status(&self) -> StatusCode {
        match self {
            GateError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            GateError::Transport(_) => StatusCode::BAD_GATEWAY,
            GateError::Rewrite(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = status.canonical_reason().unwrap_or("Error");
        (status, body).into_response()
    }
}
