// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus metrics for the gate.
//!
//! Advisory telemetry only; recording never alters a decision.

use crate::gate::{Decision, DenyReason};
use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

/// Registry wrapper holding the gate's instruments.
pub struct Metrics {
    registry: Registry,
    decisions: IntCounterVec,
    tracked_origins: IntGauge,
    blocked_origins: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let decisions = IntCounterVec::new(
            Opts::new("abuse_gate_decisions_total", "Gate decisions by outcome"),
            &["outcome"],
        )
        .expect("valid metric definition");
        let tracked_origins = IntGauge::new(
            "abuse_gate_tracked_origins",
            "Origins with a live counter record",
        )
        .expect("valid metric definition");
        let blocked_origins = IntGauge::new(
            "abuse_gate_blocked_origins",
            "Origins with a live block record",
        )
        .expect("valid metric definition");

        registry
            .register(Box::new(decisions.clone()))
            .expect("metric registers once");
        registry
            .register(Box::new(tracked_origins.clone()))
            .expect("metric registers once");
        registry
            .register(Box::new(blocked_origins.clone()))
            .expect("metric registers once");

        Self {
            registry,
            decisions,
            tracked_origins,
            blocked_origins,
        }
    }

    /// Count one decision under its outcome label.
    pub fn record_decision(&self, decision: &Decision) {
        let outcome = match decision {
            Decision::Allow { .. } => "allow",
            Decision::Deny { reason, .. } => match reason {
                DenyReason::Blocked => "blocked",
                DenyReason::RateExceeded => "rate-exceeded",
                DenyReason::AutoBlockedSuspicious => "auto-blocked-suspicious",
            },
        };
        self.decisions.with_label_values(&[outcome]).inc();
    }

    /// Refresh the store-size gauges from a stats snapshot.
    pub fn set_store_sizes(&self, tracked: usize, blocked: usize) {
        self.tracked_origins.set(tracked as i64);
        self.blocked_origins.set(blocked as i64);
    }

    /// Render the registry in Prometheus text exposition format.
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if encoder
            .encode(&self.registry.gather(), &mut buffer)
            .is_err()
        {
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
