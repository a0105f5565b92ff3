//! inference-gate: an authenticating reverse proxy for a single local
//! model-inference server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──▶ request id ──▶ admission ──▶ request log ──▶ director ──▶ transport ──▶ Backend
//!            ◀──────────────────── streamed response (event-stream fix-up) ◀──────────────────
//! ```
//!
//! - [`security`]: client address resolution and the allowlist / bearer checks
//! - [`http`]: router, middleware, body logging, rewrite and transport
//! - [`config`]: TOML + environment configuration, validated once at startup
//! - [`lifecycle`]: signals and graceful shutdown
//! - [`observability`]: tracing subscriber setup

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::GateConfig;
pub use error::GateError;
pub use http::GateServer;
pub use lifecycle::Shutdown;
