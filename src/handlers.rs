// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the abuse gate service.
//!
//! Two modes of operation, as with the other ingress filters in this
//! repository:
//!
//! 1. **External auth service**: a fronting proxy calls `/check` with the
//!    request's origin and header attributes and reads the verdict from the
//!    body.
//! 2. **Direct middleware**: the gate sits in the request path and rejects
//!    denied requests itself.

use crate::config::Config;
use crate::gate::{Decision, DenyReason, Gate, GateStats};
use crate::metrics::Metrics;
use crate::origin::{OriginKey, RequestAttributes};
use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Shared application state.
pub struct AppState {
    pub gate: Gate,
    pub metrics: Metrics,
    pub config: Config,
}

/// Rejection body for denied requests.
#[derive(Debug, Serialize)]
pub struct DenyResponse {
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_until: Option<DateTime<Utc>>,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Gate check request (external auth mode).
#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    pub origin: String,
    pub path: String,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub accept: Option<String>,
    #[serde(default)]
    pub content_length: Option<u64>,
    #[serde(default)]
    pub content_type: Option<String>,
}

/// Gate check response.
#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_until: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<u32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub warned: bool,
}

/// Admin unblock request.
#[derive(Debug, Deserialize)]
pub struct UnblockRequest {
    pub origin: String,
}

/// Admin unblock response.
#[derive(Debug, Serialize)]
pub struct UnblockResponse {
    pub removed: bool,
}

/// Admin clear response.
#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub cleared: usize,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "abuse-gate",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Evaluate a request described by a fronting proxy.
///
/// Always returns 200 so the proxy can read the verdict from the body.
pub async fn check(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CheckRequest>,
) -> impl IntoResponse {
    debug!(
        origin = %req.origin,
        path = %req.path,
        user_agent = ?req.user_agent,
        "Processing gate check"
    );

    let origin = OriginKey::new(req.origin);
    let attrs = RequestAttributes {
        path: req.path,
        user_agent: req.user_agent,
        has_accept: req.accept.is_some(),
        content_length: req.content_length,
        content_type: req.content_type,
    };

    let decision = state.gate.evaluate(&origin, &attrs);
    state.metrics.record_decision(&decision);

    let body = match decision {
        Decision::Allow { remaining, warned } => CheckResponse {
            allowed: true,
            reason: None,
            retry_after_secs: None,
            blocked_until: None,
            remaining: Some(remaining),
            warned,
        },
        Decision::Deny {
            reason,
            retry_after,
        } => {
            info!(
                %origin,
                reason = %reason,
                retry_after_secs = retry_after.map(|d| d.as_secs()),
                "Request denied"
            );
            CheckResponse {
                allowed: false,
                reason: Some(reason.code()),
                retry_after_secs: retry_after.map(|d| d.as_secs()),
                blocked_until: retry_after.map(blocked_until_from),
                remaining: None,
                warned: false,
            }
        }
    };

    (StatusCode::OK, Json(body))
}

/// Middleware for direct mode: the gate sits in the request path.
pub async fn gate_middleware(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Response {
    let origin = OriginKey::resolve(req.headers(), Some(addr));
    let attrs = RequestAttributes::from_headers(req.uri().path(), req.headers());

    let decision = state.gate.evaluate(&origin, &attrs);
    state.metrics.record_decision(&decision);

    match decision {
        Decision::Allow { remaining, .. } => {
            let mut response = next.run(req).await;
            if let Ok(value) = remaining.to_string().parse() {
                response
                    .headers_mut()
                    .insert("x-ratelimit-remaining", value);
            }
            response
        }
        Decision::Deny {
            reason,
            retry_after,
        } => {
            info!(
                %origin,
                path = %attrs.path,
                reason = %reason,
                "Request rejected at the gate"
            );
            deny_response(reason, retry_after)
        }
    }
}

/// Remove the block record for one origin.
pub async fn admin_unblock(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UnblockRequest>,
) -> Json<UnblockResponse> {
    let removed = state.gate.unblock(&OriginKey::new(req.origin));
    Json(UnblockResponse { removed })
}

/// Drop all gate state.
pub async fn admin_clear(State(state): State<Arc<AppState>>) -> Json<ClearResponse> {
    let cleared = state.gate.clear_all();
    Json(ClearResponse { cleared })
}

/// Read-only stats snapshot.
pub async fn admin_stats(State(state): State<Arc<AppState>>) -> Json<GateStats> {
    Json(state.gate.stats())
}

/// Prometheus text exposition.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    let stats = state.gate.stats();
    state
        .metrics
        .set_store_sizes(stats.active + stats.trusted, stats.blocked);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain; version=0.0.4")
        .body(Body::from(state.metrics.render()))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

/// Map a denial onto the wire: 429 for rate-shaped rejections with a
/// `Retry-After` header, 403 for the suspicion-triggered variant.
fn deny_response(reason: DenyReason, retry_after: Option<Duration>) -> Response {
    let status = match reason {
        DenyReason::Blocked | DenyReason::RateExceeded => StatusCode::TOO_MANY_REQUESTS,
        DenyReason::AutoBlockedSuspicious => StatusCode::FORBIDDEN,
    };

    let body = DenyResponse {
        error: match reason {
            DenyReason::Blocked => "origin is temporarily blocked".to_string(),
            DenyReason::RateExceeded => "request ceiling exceeded".to_string(),
            DenyReason::AutoBlockedSuspicious => "request pattern flagged as abusive".to_string(),
        },
        code: reason.code(),
        retry_after_secs: retry_after.map(|d| d.as_secs()),
        blocked_until: retry_after.map(blocked_until_from),
    };

    let mut headers = HeaderMap::new();
    if let Some(retry) = retry_after {
        if let Ok(value) = retry.as_secs().to_string().parse() {
            headers.insert(header::RETRY_AFTER, value);
        }
    }

    (status, headers, Json(body)).into_response()
}

fn blocked_until_from(retry_after: Duration) -> DateTime<Utc> {
    Utc::now() + chrono::Duration::from_std(retry_after).unwrap_or_else(|_| chrono::Duration::zero())
}
