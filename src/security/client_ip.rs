//! Client address resolution.
//!
//! # Responsibilities
//! - Pick the client's real address from proxy headers or the peer socket
//! - Never fail: always return a best-effort string
//!
//! # Design Decisions
//! - `X-Forwarded-For` beats `X-Real-IP` beats the peer address
//! - Only the first value of a repeated header is looked at
//! - Values are strings, not parsed `IpAddr`s, since admission compares
//!   them as exact strings

use axum::http::{HeaderMap, HeaderName};

pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub const X_REAL_IP: HeaderName = HeaderName::from_static("x-real-ip");

/// The resolved client address, attached to request extensions after admission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl std::fmt::Display for ClientIp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolve the client address for `headers` received from `peer`.
pub fn resolve_client_ip(headers: &HeaderMap, peer: &str) -> String {
    if let Some(forwarded) = header_str(headers, &X_FORWARDED_FOR) {
        let first = forwarded.split(',').next().unwrap_or_default().trim();
        if !first.is_empty() {
            return first.to_string();
        }
    }

    if let Some(real_ip) = header_str(headers, &X_REAL_IP) {
        return real_ip.to_string();
    }

    match split_host(peer) {
        Some(host) => host.to_string(),
        None => peer.to_string(),
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

/// Split `host:port` or `[v6]:port` and return the host part.
///
/// Returns `None` when there is no port or the address is ambiguous
/// (bare IPv6 without brackets).
pub fn split_host(addr: &str) -> Option<&str> {
    if let Some(rest) = addr.strip_prefix('[') {
        let (host, after) = rest.split_once(']')?;
        after.strip_prefix(':')?;
        return Some(host);
    }

    let (host, _port) = addr.rsplit_once(':')?;
    if host.contains(':') || host.contains('[') || host.contains(']') {
        return None;
    }
    Some(host)
}
