// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Origin resolution and the request attribute bundle.
//!
//! The gate never sees a request body; everything it consumes is derived
//! from headers and the transport peer address here.

use axum::http::{header, HeaderMap};
use std::net::SocketAddr;

/// Identifier used to bucket rate-limit and block state per requester.
///
/// Not validated as a well-formed address; it is only a map key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OriginKey(String);

impl OriginKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Fallback key when no origin information is available at all.
    pub fn unknown() -> Self {
        Self("unknown".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolve the origin key from request headers and the peer address.
    ///
    /// Precedence: first entry of `x-forwarded-for`, then `x-real-ip`, then
    /// the transport peer, then the literal `"unknown"`.
    pub fn resolve(headers: &HeaderMap, peer: Option<SocketAddr>) -> Self {
        if let Some(forwarded) = header_str(headers, "x-forwarded-for") {
            if let Some(first) = forwarded.split(',').next() {
                let first = first.trim();
                if !first.is_empty() {
                    return Self(first.to_string());
                }
            }
        }

        if let Some(real_ip) = header_str(headers, "x-real-ip") {
            let real_ip = real_ip.trim();
            if !real_ip.is_empty() {
                return Self(real_ip.to_string());
            }
        }

        match peer {
            Some(addr) => Self(addr.ip().to_string()),
            None => Self::unknown(),
        }
    }
}

impl std::fmt::Display for OriginKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OriginKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The header-derived attributes the scorer consumes.
#[derive(Debug, Clone, Default)]
pub struct RequestAttributes {
    /// Request path
    pub path: String,
    /// Declared client agent string
    pub user_agent: Option<String>,
    /// Whether an accept header was present
    pub has_accept: bool,
    /// Declared content length in bytes
    pub content_length: Option<u64>,
    /// Declared content type
    pub content_type: Option<String>,
}

impl RequestAttributes {
    /// Extract the attribute bundle from request headers.
    pub fn from_headers(path: &str, headers: &HeaderMap) -> Self {
        Self {
            path: path.to_string(),
            user_agent: header_str(headers, header::USER_AGENT.as_str()).map(str::to_string),
            has_accept: headers.contains_key(header::ACCEPT),
            content_length: header_str(headers, header::CONTENT_LENGTH.as_str())
                .and_then(|v| v.trim().parse().ok()),
            content_type: header_str(headers, header::CONTENT_TYPE.as_str()).map(str::to_string),
        }
    }
}

fn header_str<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
