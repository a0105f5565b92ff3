//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → middleware/admission.rs (client IP, allowlist, bearer secret)
//!     → request_log.rs (log method/path/body, replayable body)
//!     → director.rs (rewrite URI and headers for the backend)
//!     → transport.rs (send, fix event-stream content type)
//!     → Stream response to client
//! ```

pub mod director;
pub mod middleware;
pub mod request_log;
pub mod server;
pub mod transport;

pub use director::ForwardingDirector;
pub use server::GateServer;
pub use transport::StreamingTransport;
