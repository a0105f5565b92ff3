//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! optional TOML file + process environment (shared secret)
//!     → loader.rs (parse, deserialize, overlay secret)
//!     → validation.rs (semantic checks)
//!     → GateConfig (validated, immutable)
//!     → handed by value to GateServer, shared via Arc per component
//! ```
//!
//! # Design Decisions
//! - Config is read once at startup and never mutated afterwards
//! - All fields have defaults so the binary runs with no file at all
//! - The shared secret only ever comes from the environment
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AuthConfig, BackendConfig, GateConfig, ListenerConfig, RequestLogConfig, RouteConfig,
    TimeoutConfig,
};
pub use validation::ValidationError;
