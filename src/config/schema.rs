//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gate.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the gate.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GateConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// The single inference backend everything is forwarded to.
    pub backend: BackendConfig,

    /// Which request paths are handled.
    pub route: RouteConfig,

    /// Admission settings (allowlist, bearer secret).
    pub auth: AuthConfig,

    /// Optional backend timeouts.
    pub timeouts: TimeoutConfig,

    /// Request body logging.
    pub request_log: RequestLogConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the inference server. Only `http` is supported.
    pub url: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:11434".to_string(),
        }
    }
}

/// Route configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RouteConfig {
    /// Path prefix handled by the gate. Must start and end with `/`.
    pub prefix: String,

    /// Remove the prefix from the path before forwarding.
    pub strip_prefix: bool,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            prefix: "/v1/".to_string(),
            strip_prefix: false,
        }
    }
}

/// Admission configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Require `Authorization: Bearer <secret>` on every request.
    pub require_api_key: bool,

    /// Environment variable holding the shared secret.
    pub api_key_env: String,

    /// Client IPs allowed through. Empty means any IP.
    ///
    /// Entries are compared as exact strings: no CIDR ranges and no IPv6
    /// canonicalization (`::1` and `0:0:0:0:0:0:0:1` are different entries).
    pub allowed_ips: Vec<String>,

    /// Shared secret, filled from `api_key_env` by the loader.
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            require_api_key: true,
            api_key_env: "API_KEY".to_string(),
            allowed_ips: Vec::new(),
            api_key: None,
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("require_api_key", &self.require_api_key)
            .field("api_key_env", &self.api_key_env)
            .field("allowed_ips", &self.allowed_ips)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Backend timeouts. Unset means wait indefinitely.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TimeoutConfig {
    /// TCP connect timeout in seconds.
    pub connect_secs: Option<u64>,

    /// Time allowed until the backend sends response headers, in seconds.
    /// Streamed bodies are not subject to it.
    pub response_secs: Option<u64>,
}

/// Request body logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RequestLogConfig {
    /// Log request bodies. Method and path are always logged.
    pub log_bodies: bool,

    /// Largest body buffered for logging; the rest is streamed through.
    pub max_body_bytes: usize,
}

impl Default for RequestLogConfig {
    fn default() -> Self {
        Self {
            log_bodies: true,
            max_body_bytes: 16 * 1024 * 1024, // 16 MiB
        }
    }
}
