// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Abuse simulation patterns.

/// The kind of client a simulated request claims to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientKind {
    /// Recognizable browser with normal headers
    Browser,
    /// Scripted client with an automation token in its agent string
    Scripted,
    /// No agent string, no accept header
    Headless,
}

/// Abuse pattern configuration.
#[derive(Debug, Clone)]
pub struct AttackConfig {
    /// Total number of requests to send
    pub total_requests: usize,
    /// Simulated milliseconds between consecutive requests
    pub interval_ms: u64,
    /// Number of unique origins to spread the requests over
    pub unique_origins: usize,
    /// What the requests claim to be
    pub client: ClientKind,
    /// Request path
    pub path: &'static str,
    /// Declared content length, if any
    pub content_length: Option<u64>,
    /// Declared content type, if any
    pub content_type: Option<&'static str>,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            total_requests: 100,
            interval_ms: 100,
            unique_origins: 1,
            client: ClientKind::Browser,
            path: "/api/notes",
            content_length: None,
            content_type: None,
        }
    }
}

/// Predefined abuse patterns.
impl AttackConfig {
    /// Single origin hammering as fast as it can.
    pub fn single_origin_flood() -> Self {
        Self {
            total_requests: 300,
            interval_ms: 5,
            client: ClientKind::Scripted,
            ..Default::default()
        }
    }

    /// Headless clients with no identifying headers.
    pub fn headless_swarm() -> Self {
        Self {
            total_requests: 100,
            interval_ms: 10,
            unique_origins: 5,
            client: ClientKind::Headless,
            ..Default::default()
        }
    }

    /// A real browser refreshing aggressively but staying under the ceiling.
    pub fn browser_burst() -> Self {
        Self {
            total_requests: 60,
            interval_ms: 25,
            client: ClientKind::Browser,
            ..Default::default()
        }
    }

    /// Scripted client declaring multi-megabyte bodies off the upload paths.
    pub fn oversized_probe() -> Self {
        Self {
            total_requests: 50,
            interval_ms: 200,
            client: ClientKind::Scripted,
            content_length: Some(5 * 1024 * 1024),
            ..Default::default()
        }
    }

    /// Webhook endpoint fed non-JSON payloads.
    pub fn webhook_mismatch() -> Self {
        Self {
            total_requests: 50,
            interval_ms: 200,
            client: ClientKind::Scripted,
            path: "/webhook/payments",
            content_type: Some("text/plain"),
            ..Default::default()
        }
    }

    /// Stays politely under every limit.
    pub fn slow_drip() -> Self {
        Self {
            total_requests: 100,
            interval_ms: 1_000,
            client: ClientKind::Browser,
            ..Default::default()
        }
    }

    /// Many origins, each individually below the thresholds.
    pub fn distributed_probe() -> Self {
        Self {
            total_requests: 500,
            interval_ms: 20,
            unique_origins: 100,
            client: ClientKind::Scripted,
            ..Default::default()
        }
    }
}
