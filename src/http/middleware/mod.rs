//! Request middleware applied to the gated routes.

pub mod admission;

pub use admission::admission_middleware;
