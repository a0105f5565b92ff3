//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events (structured fields: request_id, client_ip, ...)
//!     → logging.rs subscriber → stdout
//! ```
//!
//! # Design Decisions
//! - Request ID (`x-request-id`) is attached to every per-request event

pub mod logging;

pub use logging::init_logging;
