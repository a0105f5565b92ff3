//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router for the gated prefix
//! - Wire up middleware (request ID, tracing, admission)
//! - Bind server to listener with peer addresses attached
//! - Run each admitted request through log → rewrite → forward
//! - Redirect the prefix without its trailing slash to the prefix, with 301
//!   and before admission

use axum::{
    body::Body,
    extract::{ConnectInfo, Extension, State},
    http::{header::LOCATION, HeaderValue, Request, StatusCode, Uri},
    middleware,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::{ConfigError, GateConfig, RequestLogConfig, ValidationError};
use crate::error::GateError;
use crate::http::director::ForwardingDirector;
use crate::http::middleware::admission_middleware;
use crate::http::request_log::log_request;
use crate::http::transport::{accept_of, StreamingTransport};
use crate::security::{AdmissionGuard, ClientIp};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub director: Arc<ForwardingDirector>,
    pub transport: Arc<StreamingTransport>,
    pub request_log: Arc<RequestLogConfig>,
}

/// HTTP server for the gate.
pub struct GateServer {
    router: Router,
    config: GateConfig,
}

impl GateServer {
    /// Create a new server from a validated configuration.
    pub fn new(config: GateConfig) -> Result<Self, ConfigError> {
        let strip_prefix = config
            .route
            .strip_prefix
            .then_some(config.route.prefix.as_str());
        let director = ForwardingDirector::new(&config.backend.url, strip_prefix).map_err(|e| {
            ConfigError::Validation(vec![ValidationError::BackendUrl {
                url: config.backend.url.clone(),
                reason: e.to_string(),
            }])
        })?;

        let guard = AdmissionGuard::from_config(&config.auth);
        if guard.is_open() {
            tracing::warn!("No allowlist and no API key configured: running as an open proxy");
        }

        let state = AppState {
            director: Arc::new(director),
            transport: Arc::new(StreamingTransport::new(&config.timeouts)),
            request_log: Arc::new(config.request_log.clone()),
        };

        let router = Self::build_router(&config, Arc::new(guard), state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &GateConfig, guard: Arc<AdmissionGuard>, state: AppState) -> Router {
        let prefix = config.route.prefix.as_str();

        let mut router = Router::new()
            .route(prefix, any(proxy_handler))
            .route(&format!("{}{{*path}}", prefix), any(proxy_handler))
            .route_layer(middleware::from_fn_with_state(guard, admission_middleware));

        let bare = prefix.trim_end_matches('/');
        if !bare.is_empty() {
            let target = prefix.to_string();
            router = router.route(
                bare,
                any(move |uri: Uri| std::future::ready(prefix_redirect(&target, &uri))),
            );
        }

        router
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            backend = %self.config.backend.url,
            prefix = %self.config.route.prefix,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// 301 to `prefix`, keeping the query string.
fn prefix_redirect(prefix: &str, uri: &Uri) -> Response {
    let location = match uri.query() {
        Some(query) => format!("{}?{}", prefix, query),
        None => prefix.to_string(),
    };
    match HeaderValue::from_str(&location) {
        Ok(location) => (StatusCode::MOVED_PERMANENTLY, [(LOCATION, location)]).into_response(),
        Err(_) => StatusCode::BAD_REQUEST.into_response(),
    }
}

/// Main proxy handler.
/// Logs the admitted request, rewrites it for the backend and streams the answer back.
async fn proxy_handler(
    State(state): State<AppState>,
    Extension(client_ip): Extension<ClientIp>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Result<Response, GateError> {
    let (mut parts, body) = request.into_parts();

    let body = log_request(&parts, &client_ip, body, &state.request_log).await;

    let accept = accept_of(&parts.headers);
    state.director.direct(&mut parts, &peer.ip().to_string())?;

    let outbound = Request::from_parts(parts, body);
    match state.transport.round_trip(outbound, accept.as_ref()).await {
        Ok(response) => Ok(response),
        Err(e) => {
            tracing::error!(client_ip = %client_ip, error = %e, "Upstream error");
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_redirect_keeps_query() {
        let res = prefix_redirect("/v1/", &"/v1?stream=true".parse().unwrap());
        assert_eq!(res.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(res.headers()[LOCATION], "/v1/?stream=true");

        let res = prefix_redirect("/v1/", &"/v1".parse().unwrap());
        assert_eq!(res.headers()[LOCATION], "/v1/");
    }
}
