//! Request rewriting for the single backend.
//!
//! # Responsibilities
//! - Point the request URI at the backend (scheme, authority, base path)
//! - Keep method, path, query and body as sent
//! - Strip hop-by-hop headers and append the peer to `X-Forwarded-For`
//! - Record the client-facing host in `X-Forwarded-Host`, then set `Host`
//!   to the backend authority
//!
//! # Design Decisions
//! - Rewrites `Parts` in place; the body is untouched
//! - The outbound request is always HTTP/1.1, whatever the client spoke
//! - `TE: trailers` survives the hop-by-hop strip on requests, nothing else
//!   from `TE` does

use axum::http::{
    header::{self, HeaderName},
    request::Parts,
    uri::{Authority, PathAndQuery, Scheme},
    HeaderMap, HeaderValue, Uri, Version,
};
use url::{Position, Url};

use crate::error::GateError;
use crate::security::client_ip::X_FORWARDED_FOR;

pub const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");

/// Headers that describe a single hop and must not be forwarded.
const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "proxy-connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Remove hop-by-hop headers, including any listed in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

/// Error building a director from a backend URL.
#[derive(Debug, thiserror::Error)]
pub enum DirectorError {
    #[error("invalid backend url: {0}")]
    Url(#[from] url::ParseError),
    #[error("invalid backend authority {0:?}")]
    Authority(String),
    #[error("unsupported backend scheme {0:?}")]
    Scheme(String),
}

/// Rewrites admitted requests for the configured backend.
#[derive(Debug, Clone)]
pub struct ForwardingDirector {
    scheme: Scheme,
    authority: Authority,
    host: HeaderValue,
    base_path: String,
    base_query: Option<String>,
    /// Prefix removed from request paths before joining, if any.
    strip_prefix: Option<String>,
}

impl ForwardingDirector {
    pub fn new(backend_url: &str, strip_prefix: Option<&str>) -> Result<Self, DirectorError> {
        let url = Url::parse(backend_url)?;
        let raw_authority = &url[Position::BeforeHost..Position::AfterPort];

        let authority: Authority = raw_authority
            .parse()
            .map_err(|_| DirectorError::Authority(raw_authority.to_string()))?;
        let host = HeaderValue::from_str(authority.as_str())
            .map_err(|_| DirectorError::Authority(raw_authority.to_string()))?;
        let scheme: Scheme = url
            .scheme()
            .parse()
            .map_err(|_| DirectorError::Scheme(url.scheme().to_string()))?;

        Ok(Self {
            scheme,
            authority,
            host,
            base_path: url.path().to_string(),
            base_query: url.query().map(str::to_string),
            strip_prefix: strip_prefix.map(|p| p.trim_end_matches('/').to_string()),
        })
    }

    /// Rewrite `parts` into the request sent to the backend.
    ///
    /// `peer_ip` is the socket peer, appended to `X-Forwarded-For`.
    pub fn direct(&self, parts: &mut Parts, peer_ip: &str) -> Result<(), GateError> {
        let original_host = parts
            .headers
            .get(header::HOST)
            .cloned()
            .or_else(|| {
                parts
                    .uri
                    .authority()
                    .and_then(|a| HeaderValue::from_str(a.as_str()).ok())
            });

        let wants_trailers = accepts_trailers(&parts.headers);

        parts.uri = self.target_uri(&parts.uri)?;
        parts.version = Version::HTTP_11;

        strip_hop_by_hop(&mut parts.headers);
        if wants_trailers {
            parts.headers.insert(header::TE, HeaderValue::from_static("trailers"));
        }
        append_forwarded_for(&mut parts.headers, peer_ip)?;

        if let Some(original_host) = original_host {
            parts.headers.insert(X_FORWARDED_HOST, original_host);
        }
        parts.headers.insert(header::HOST, self.host.clone());

        Ok(())
    }

    fn target_uri(&self, uri: &Uri) -> Result<Uri, GateError> {
        let mut path = uri.path();
        if let Some(prefix) = &self.strip_prefix {
            if let Some(rest) = path.strip_prefix(prefix.as_str()) {
                path = rest;
            }
        }

        let mut path_and_query = join_paths(&self.base_path, path);
        let base_query = self.base_query.as_deref().filter(|q| !q.is_empty());
        match (base_query, uri.query().filter(|q| !q.is_empty())) {
            (Some(base), Some(query)) => {
                path_and_query.push('?');
                path_and_query.push_str(base);
                path_and_query.push('&');
                path_and_query.push_str(query);
            }
            (Some(query), None) | (None, Some(query)) => {
                path_and_query.push('?');
                path_and_query.push_str(query);
            }
            (None, None) => {}
        }

        let path_and_query: PathAndQuery = path_and_query
            .parse()
            .map_err(|e: axum::http::uri::InvalidUri| GateError::Rewrite(e.to_string()))?;

        Uri::builder()
            .scheme(self.scheme.clone())
            .authority(self.authority.clone())
            .path_and_query(path_and_query)
            .build()
            .map_err(|e| GateError::Rewrite(e.to_string()))
    }
}

/// Join two paths with exactly one slash between them.
fn join_paths(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", base, &path[1..]),
        (false, false) => format!("{}/{}", base, path),
        _ => format!("{}{}", base, path),
    }
}

/// True when any `TE` value lists the `trailers` token.
fn accepts_trailers(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::TE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|token| token.trim().eq_ignore_ascii_case("trailers"))
}

fn append_forwarded_for(headers: &mut HeaderMap, peer_ip: &str) -> Result<(), GateError> {
    let prior: Vec<&str> = headers
        .get_all(&X_FORWARDED_FOR)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();

    let value = if prior.is_empty() {
        peer_ip.to_string()
    } else {
        format!("{}, {}", prior.join(", "), peer_ip)
    };

    let value = HeaderValue::from_str(&value)
        .map_err(|_| GateError::Rewrite(format!("invalid peer address {:?}", peer_ip)))?;
    headers.insert(X_FORWARDED_FOR, value);
    Ok(())
}
