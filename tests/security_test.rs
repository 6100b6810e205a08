// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Abuse simulations against the gate.
//!
//! Each test replays a canned traffic pattern on a simulated clock and
//! checks that the gate mitigates it (or, for the benign patterns, stays
//! out of the way).

mod harness;

use abuse_gate::{
    clock::ManualClock,
    config::{GateConfig, Profile},
    gate::Gate,
    origin::{OriginKey, RequestAttributes},
    sweep::EveryNth,
};
use harness::{attacks::AttackConfig, generators, metrics::AttackMetrics};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Replay an attack pattern against a fresh gate on a simulated clock.
fn run_attack(attack: &AttackConfig, gate_config: GateConfig) -> AttackMetrics {
    let clock = Arc::new(ManualClock::new(0));
    let gate = Gate::with_parts(
        gate_config,
        Profile::Production,
        clock.clone(),
        Arc::new(EveryNth::new(50)),
    );

    let origins = generators::generate_origins(attack.unique_origins);
    let mut metrics = AttackMetrics::new();

    for i in 0..attack.total_requests {
        let origin = &origins[i % origins.len()];
        let attrs = generators::attributes_for(attack, i);

        let decision = gate.evaluate(origin, &attrs);
        metrics.record(&decision, origin.as_str());

        clock.advance(attack.interval_ms);
    }

    metrics
}

#[test]
fn single_origin_flood_is_cut_off() {
    let metrics = run_attack(&AttackConfig::single_origin_flood(), GateConfig::production());
    let report = metrics.report();
    println!("{report}");

    assert!(
        report.block_rate >= 0.5,
        "block rate {} should be >= 50% for a single-origin flood",
        report.block_rate
    );
    assert!(
        report.auto_blocked + report.rate_exceeded >= 1,
        "the flood should trip a block, not just individual denials"
    );
}

#[test]
fn headless_swarm_trips_suspicion_per_origin() {
    let attack = AttackConfig::headless_swarm();
    let metrics = run_attack(&attack, GateConfig::production());
    let report = metrics.report();
    println!("{report}");

    // Every origin in the swarm should be auto-blocked on suspicion, well
    // before the raw ceiling is in reach.
    assert!(
        report.auto_blocked >= attack.unique_origins,
        "expected each of {} origins auto-blocked, got {}",
        attack.unique_origins,
        report.auto_blocked
    );
    assert_eq!(report.rate_exceeded, 0);
    assert!(report.block_rate > 0.5);
}

#[test]
fn browser_burst_is_tolerated() {
    let metrics = run_attack(&AttackConfig::browser_burst(), GateConfig::production());
    let report = metrics.report();
    println!("{report}");

    assert_eq!(
        report.allowed, report.total_requests,
        "an aggressive but under-ceiling browser should never be denied"
    );
}

#[test]
fn oversized_probe_is_auto_blocked() {
    let metrics = run_attack(&AttackConfig::oversized_probe(), GateConfig::production());
    let report = metrics.report();
    println!("{report}");

    assert!(report.auto_blocked >= 1);
    assert!(
        report.block_rate >= 0.8,
        "after the auto-block almost everything should bounce, got {}",
        report.block_rate
    );
}

#[test]
fn webhook_content_type_mismatch_accumulates_suspicion() {
    let metrics = run_attack(&AttackConfig::webhook_mismatch(), GateConfig::production());
    let report = metrics.report();
    println!("{report}");

    assert!(report.auto_blocked >= 1);
}

#[test]
fn slow_drip_is_left_alone() {
    let metrics = run_attack(&AttackConfig::slow_drip(), GateConfig::production());
    let report = metrics.report();
    println!("{report}");

    assert_eq!(
        report.allowed, report.total_requests,
        "traffic under every limit must pass untouched"
    );
}

#[test]
fn distributed_probe_is_limited_per_origin() {
    let attack = AttackConfig::distributed_probe();
    let metrics = run_attack(&attack, GateConfig::production());
    let report = metrics.report();
    println!("{report}");

    // Distribution dilutes per-origin counting, so most requests land;
    // each origin is still individually tracked and eventually blocked.
    assert_eq!(report.unique_origins, attack.unique_origins);
    assert!(report.allowed >= report.total_requests / 2);
    assert!(report.auto_blocked >= 1);
}

#[test]
fn whitelisted_origin_survives_its_own_flood() {
    let clock = Arc::new(ManualClock::new(0));
    let gate = Gate::with_parts(
        GateConfig {
            whitelist: vec!["10.9.9.9".to_string()],
            ..GateConfig::production()
        },
        Profile::Production,
        clock.clone(),
        Arc::new(EveryNth::new(50)),
    );

    let origin = OriginKey::from("10.9.9.9");
    let attack = AttackConfig::single_origin_flood();
    for i in 0..attack.total_requests {
        let attrs = generators::attributes_for(&attack, i);
        assert!(
            gate.evaluate(&origin, &attrs).is_allowed(),
            "whitelisted origin must never be denied"
        );
        clock.advance(attack.interval_ms);
    }
    assert_eq!(gate.stats().blocked, 0);
}

#[test]
fn evaluation_latency_stays_sub_millisecond() {
    let gate = Gate::new(GateConfig::production(), Profile::Production);
    let origin = OriginKey::from("192.0.2.1");
    let attrs = RequestAttributes {
        path: "/api/notes".to_string(),
        user_agent: Some("Mozilla/5.0 (X11; Linux x86_64) Firefox/121.0".to_string()),
        has_accept: true,
        content_length: None,
        content_type: None,
    };

    let mut latencies = Vec::new();
    for _ in 0..100 {
        let start = Instant::now();
        let _ = gate.evaluate(&origin, &attrs);
        latencies.push(start.elapsed());
    }

    latencies.sort();
    let median = latencies[latencies.len() / 2];
    println!("gate latency: median={median:?}");

    assert!(
        median < Duration::from_millis(1),
        "median latency {median:?} should be < 1ms"
    );
}
