//! Admission checks: client IP allowlist and bearer secret.
//!
//! # Design Decisions
//! - IP check runs first, then the key check
//! - Either check can be switched off independently; with both off the
//!   gate is an open proxy
//! - Allowlist entries are matched as exact strings (no CIDR, no IPv6
//!   canonicalization)
//! - The reject reason is for logs only; clients see the same 401 either way

use std::collections::HashSet;

use axum::http::{header::AUTHORIZATION, HeaderMap};

use crate::config::AuthConfig;

/// Why a request was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Ip,
    Key,
}

impl RejectReason {
    pub fn code(&self) -> &'static str {
        match self {
            RejectReason::Ip => "ip-rejected",
            RejectReason::Key => "key-rejected",
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Outcome of the admission checks for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionDecision {
    Allowed,
    Rejected(RejectReason),
}

impl AdmissionDecision {
    pub fn code(&self) -> &'static str {
        match self {
            AdmissionDecision::Allowed => "allowed",
            AdmissionDecision::Rejected(reason) => reason.code(),
        }
    }
}

/// Immutable admission policy built once from [`AuthConfig`].
#[derive(Debug, Clone)]
pub struct AdmissionGuard {
    allowed_ips: HashSet<String>,
    /// Full expected `Authorization` value, `None` when key auth is off.
    expected_authorization: Option<String>,
}

impl AdmissionGuard {
    pub fn new(allowed_ips: impl IntoIterator<Item = String>, api_key: Option<&str>) -> Self {
        Self {
            allowed_ips: allowed_ips.into_iter().collect(),
            expected_authorization: api_key.map(|key| format!("Bearer {}", key)),
        }
    }

    /// Build the guard for a validated config.
    pub fn from_config(config: &AuthConfig) -> Self {
        let api_key = if config.require_api_key {
            config.api_key.as_deref()
        } else {
            None
        };
        Self::new(config.allowed_ips.iter().cloned(), api_key)
    }

    /// True when neither check is active.
    pub fn is_open(&self) -> bool {
        self.allowed_ips.is_empty() && self.expected_authorization.is_none()
    }

    pub fn ip_allowed(&self, client_ip: &str) -> bool {
        self.allowed_ips.is_empty() || self.allowed_ips.contains(client_ip)
    }

    pub fn key_allowed(&self, headers: &HeaderMap) -> bool {
        let Some(expected) = &self.expected_authorization else {
            return true;
        };
        headers
            .get(AUTHORIZATION)
            .is_some_and(|value| value.as_bytes() == expected.as_bytes())
    }

    /// Run both checks, IP first.
    pub fn check(&self, client_ip: &str, headers: &HeaderMap) -> AdmissionDecision {
        if !self.ip_allowed(client_ip) {
            return AdmissionDecision::Rejected(RejectReason::Ip);
        }
        if !self.key_allowed(headers) {
            return AdmissionDecision::Rejected(RejectReason::Key);
        }
        AdmissionDecision::Allowed
    }
}
