//! Structured logging.
//!
//! # Design Decisions
//! - Uses the tracing crate; every log line carries a timestamp and fields
//! - Log level comes from `RUST_LOG`, falling back to `DEFAULT_FILTER`

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const DEFAULT_FILTER: &str = "inference_gate=info,tower_http=info";

/// Install the global subscriber. Call once, before anything logs.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
