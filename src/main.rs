// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Abuse Gate Service
//!
//! Inline abuse detection and adaptive rate limiting for API ingress.
//! Sliding-window counting, heuristic suspicion scoring, time-bounded
//! blocking with automatic rehabilitation, and a whitelist carve-out.
//!
//! ## Usage
//!
//! The service provides two modes of operation:
//!
//! 1. **External auth service**: a fronting proxy calls `/check` to obtain
//!    a verdict before forwarding.
//!
//! 2. **Direct middleware**: mount [`abuse_gate::handlers::gate_middleware`]
//!    in front of application routes so denied requests never reach them.
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables:
//!
//! - `BIND_ADDR`: Server bind address (default: 0.0.0.0:8080)
//! - `PROFILE`: `development` or `production` (default: production)
//! - `WINDOW_MS`: Counting window in milliseconds
//! - `MAX_REQUESTS`: Request ceiling per window per origin
//! - `BLOCK_DURATION_MS`: Block duration in milliseconds
//! - `SUSPICIOUS_THRESHOLD`: Suspicion score that triggers an auto-block
//! - `WHITELIST`: Comma-separated origin keys trusted beyond the built-ins

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use abuse_gate::{
    config::{Config, GateConfig, Profile},
    gate::Gate,
    handlers::{admin_clear, admin_stats, admin_unblock, check, health, metrics, AppState},
    metrics::Metrics,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Load configuration; misconfiguration is fatal here, never per request.
    let config = load_config()?;
    config.validate()?;
    info!(
        bind_addr = %config.bind_addr,
        profile = ?config.profile,
        window_ms = config.gate.window_ms,
        max_requests = config.gate.max_requests,
        block_duration_ms = config.gate.block_duration_ms,
        suspicious_threshold = config.gate.suspicious_threshold,
        "Starting abuse gate"
    );

    // Create application state
    let gate = Gate::new(config.gate.clone(), config.profile);
    let state = Arc::new(AppState {
        gate,
        metrics: Metrics::new(),
        config: config.clone(),
    });

    // Periodic sweep alongside the opportunistic per-request trigger, so
    // memory stays bounded even for origins that never return.
    let sweep_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            sweep_state.gate.sweep_now();
        }
    });

    // Build router
    let mut app = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/check", post(check))
        .route("/admin/unblock", post(admin_unblock))
        .route("/admin/clear", post(admin_clear))
        .route("/admin/stats", get(admin_stats));
    if config.metrics.enabled {
        app = app.route(config.metrics.path.as_str(), get(metrics));
    }
    let app = app
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config.bind_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Load configuration from environment variables.
fn load_config() -> anyhow::Result<Config> {
    let profile = match std::env::var("PROFILE") {
        Ok(value) => value.parse::<Profile>()?,
        Err(_) => Profile::default(),
    };
    let defaults = GateConfig::for_profile(profile);

    Ok(Config {
        bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
        profile,
        gate: GateConfig {
            window_ms: env_parse("WINDOW_MS").unwrap_or(defaults.window_ms),
            max_requests: env_parse("MAX_REQUESTS").unwrap_or(defaults.max_requests),
            block_duration_ms: env_parse("BLOCK_DURATION_MS").unwrap_or(defaults.block_duration_ms),
            suspicious_threshold: env_parse("SUSPICIOUS_THRESHOLD")
                .unwrap_or(defaults.suspicious_threshold),
            whitelist: std::env::var("WHITELIST")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            ..defaults
        },
        metrics: Default::default(),
    })
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}
