//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → client_ip.rs (resolve real client address)
//!     → admission.rs (IP allowlist, then bearer secret)
//!     → Pass to request logging and forwarding
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any admission check failure
//! - Every request is evaluated on its own; nothing is cached

pub mod admission;
pub mod client_ip;

pub use admission::{AdmissionDecision, AdmissionGuard, RejectReason};
pub use client_ip::{resolve_client_ip, ClientIp};
