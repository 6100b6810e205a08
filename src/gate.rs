// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! The gate: per-request orchestration of whitelist, block list, scorer and
//! sliding-window counters.
//!
//! The gate exclusively owns both stores. Every evaluation is await-free
//! and lock-bounded; the only time-based behavior is expiry, checked by
//! comparing stored timestamps against the injected clock at read time.

use crate::clock::{Clock, SystemClock};
use crate::config::{GateConfig, Profile};
use crate::origin::{OriginKey, RequestAttributes};
use crate::score::Scorer;
use crate::store::{ShardedStore, StateStore};
use crate::sweep::{ProbabilisticSweep, SweepPolicy};
use crate::whitelist::{WhitelistMode, WhitelistPolicy};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Per-origin sliding-window counter state.
#[derive(Debug, Clone, PartialEq)]
pub struct CounterRecord {
    /// Requests seen in the current window
    pub count: u32,
    /// When the current window started, in clock millis
    pub window_start: u64,
    /// Accumulated suspicion score, ≥ 0
    pub suspicion: f64,
}

impl CounterRecord {
    fn fresh(now: u64) -> Self {
        Self {
            count: 0,
            window_start: now,
            suspicion: 0.0,
        }
    }
}

/// Per-origin block marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRecord {
    /// When the block was created, in clock millis
    pub blocked_at: u64,
}

/// Machine-readable denial reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// A live block record exists for the origin
    Blocked,
    /// The request ceiling for the window was exceeded
    RateExceeded,
    /// The suspicion score crossed the threshold
    AutoBlockedSuspicious,
}

impl DenyReason {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Blocked => "blocked",
            Self::RateExceeded => "rate-exceeded",
            Self::AutoBlockedSuspicious => "auto-blocked-suspicious",
        }
    }
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// The gate's verdict for one request.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Request proceeds unchanged.
    Allow {
        /// Requests left under the ceiling in the current window
        remaining: u32,
        /// Advisory: the origin is past 80% of its ceiling
        warned: bool,
    },
    /// Request is rejected.
    Deny {
        reason: DenyReason,
        /// How long until the origin is evaluated fresh again
        retry_after: Option<Duration>,
    },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow { .. })
    }
}

/// Read-only operational snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct GateStats {
    /// Origins with a live counter record
    pub active: usize,
    /// Whitelisted origins with a live lenient counter record
    pub trusted: usize,
    /// Origins with a block record (expired-but-unswept included)
    pub blocked: usize,
    /// Keys currently in the block store
    pub blocked_keys: Vec<String>,
    /// Thresholds in force
    pub limits: EffectiveLimits,
}

/// The thresholds a dashboard needs to interpret the counts.
#[derive(Debug, Clone, Serialize)]
pub struct EffectiveLimits {
    pub window_ms: u64,
    pub max_requests: u32,
    pub block_duration_ms: u64,
    pub suspicious_threshold: f64,
    pub trusted_max_requests: u32,
    pub trusted_window_ms: u64,
}

/// What happened during the sweep. Advisory, for logs and ops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    pub counters_evicted: usize,
    pub trusted_evicted: usize,
    pub blocks_evicted: usize,
}

// Internal result of the atomic counter transaction.
enum CounterOutcome {
    Allowed { remaining: u32, warned: bool },
    SuspicionTripped { score: f64 },
    CeilingExceeded { count: u32 },
}

/// Inline abuse-detection and adaptive rate-limiting gate.
pub struct Gate {
    config: GateConfig,
    scorer: Scorer,
    whitelist: WhitelistPolicy,
    clock: Arc<dyn Clock>,
    sweep: Arc<dyn SweepPolicy>,
    counters: Arc<dyn StateStore<CounterRecord>>,
    trusted: Arc<dyn StateStore<CounterRecord>>,
    blocks: Arc<dyn StateStore<BlockRecord>>,
}

impl Gate {
    /// Build a gate with production wiring: system clock, probabilistic
    /// sweep, sharded in-memory stores.
    pub fn new(config: GateConfig, profile: Profile) -> Self {
        let sweep_probability = config.sweep_probability;
        Self::with_parts(
            config,
            profile,
            Arc::new(SystemClock::new()),
            Arc::new(ProbabilisticSweep::new(sweep_probability)),
        )
    }

    /// Build a gate with an injected clock and sweep policy. This is the
    /// constructor tests use to drive expiry deterministically.
    pub fn with_parts(
        config: GateConfig,
        profile: Profile,
        clock: Arc<dyn Clock>,
        sweep: Arc<dyn SweepPolicy>,
    ) -> Self {
        let scorer = Scorer::new(
            config.score.clone(),
            config.upload_paths.clone(),
            config.webhook_paths.clone(),
        );
        let whitelist =
            WhitelistPolicy::new(WhitelistMode::for_profile(profile), &config.whitelist);
        Self {
            config,
            scorer,
            whitelist,
            clock,
            sweep,
            counters: Arc::new(ShardedStore::new()),
            trusted: Arc::new(ShardedStore::new()),
            blocks: Arc::new(ShardedStore::new()),
        }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Evaluate one request. This is the only entry point with side effects
    /// on the stores.
    pub fn evaluate(&self, origin: &OriginKey, attrs: &RequestAttributes) -> Decision {
        let decision = self.evaluate_inner(origin, attrs);

        // Opportunistic reclamation, independent of the decision.
        if self.sweep.should_sweep() {
            self.sweep_now();
        }

        decision
    }

    fn evaluate_inner(&self, origin: &OriginKey, attrs: &RequestAttributes) -> Decision {
        // Health checks bypass everything and touch no state.
        if self.config.health_paths.iter().any(|p| p == &attrs.path) {
            return Decision::Allow {
                remaining: self.config.max_requests,
                warned: false,
            };
        }

        if self.whitelist.contains(origin) {
            return match self.whitelist.mode() {
                WhitelistMode::Permissive => Decision::Allow {
                    remaining: self.config.max_requests,
                    warned: false,
                },
                WhitelistMode::LenientLimit => self.evaluate_trusted(origin),
            };
        }

        let now = self.clock.now_millis();

        // Live block? Expired entries are removed lazily here; the sweep
        // and the periodic task are the redundant paths.
        if let Some(block) = self.blocks.get(origin.as_str()) {
            let age = now.saturating_sub(block.blocked_at);
            if age < self.config.block_duration_ms {
                let remaining = self.config.block_duration_ms - age;
                debug!(%origin, retry_after_ms = remaining, "origin is blocked");
                return Decision::Deny {
                    reason: DenyReason::Blocked,
                    retry_after: Some(Duration::from_millis(remaining)),
                };
            }
            self.blocks.remove(origin.as_str());
            debug!(%origin, "block expired, origin evaluated fresh");
        }

        let outcome = self.charge_counter(origin, attrs, now);

        match outcome {
            CounterOutcome::SuspicionTripped { score } => {
                warn!(%origin, score, path = %attrs.path, "suspicion threshold crossed, auto-blocking");
                self.block_origin(origin, now);
                Decision::Deny {
                    reason: DenyReason::AutoBlockedSuspicious,
                    retry_after: Some(self.config.block_duration()),
                }
            }
            CounterOutcome::CeilingExceeded { count } => {
                warn!(%origin, count, "request ceiling exceeded, blocking");
                self.block_origin(origin, now);
                Decision::Deny {
                    reason: DenyReason::RateExceeded,
                    retry_after: Some(self.config.block_duration()),
                }
            }
            CounterOutcome::Allowed { remaining, warned } => {
                Decision::Allow { remaining, warned }
            }
        }
    }

    /// Steps 4–8: one atomic read-modify-write of the origin's counter.
    fn charge_counter(
        &self,
        origin: &OriginKey,
        attrs: &RequestAttributes,
        now: u64,
    ) -> CounterOutcome {
        let mut outcome = CounterOutcome::Allowed {
            remaining: self.config.max_requests,
            warned: false,
        };
        let warn_threshold = self.config.warn_threshold();

        self.counters.update(origin.as_str(), &mut |current| {
            let mut record = current.unwrap_or_else(|| CounterRecord::fresh(now));
            let window_age = now.saturating_sub(record.window_start);

            record.suspicion += self.scorer.delta(attrs, record.count, window_age);

            if record.suspicion >= self.config.suspicious_threshold {
                outcome = CounterOutcome::SuspicionTripped {
                    score: record.suspicion,
                };
                // Counter state is superseded by the block record.
                return None;
            }

            if window_age < self.config.window_ms {
                record.count += 1;
                if record.count > self.config.max_requests {
                    outcome = CounterOutcome::CeilingExceeded {
                        count: record.count,
                    };
                    return None;
                }
                if record.count == warn_threshold {
                    warn!(
                        %origin,
                        count = record.count,
                        ceiling = self.config.max_requests,
                        "origin approaching rate ceiling"
                    );
                }
                outcome = CounterOutcome::Allowed {
                    remaining: self.config.max_requests - record.count,
                    warned: record.count >= warn_threshold,
                };
                Some(record)
            } else {
                // Window elapsed: fresh count, suspicion decays rather than
                // zeroing.
                let decayed = (record.suspicion - self.config.decay_step).max(0.0);
                outcome = CounterOutcome::Allowed {
                    remaining: self.config.max_requests.saturating_sub(1),
                    warned: false,
                };
                Some(CounterRecord {
                    count: 1,
                    window_start: now,
                    suspicion: decayed,
                })
            }
        });

        outcome
    }

    /// Lenient path for whitelisted origins: separate store, higher
    /// ceiling, never blocks. Overflow resets the window and warns.
    fn evaluate_trusted(&self, origin: &OriginKey) -> Decision {
        let now = self.clock.now_millis();
        let ceiling = self.config.trusted_max_requests;
        let mut overflowed = false;

        let stored = self.trusted.update(origin.as_str(), &mut |current| {
            let mut record = current.unwrap_or_else(|| CounterRecord::fresh(now));
            let window_age = now.saturating_sub(record.window_start);

            if window_age < self.config.trusted_window_ms {
                record.count += 1;
                if record.count > ceiling {
                    overflowed = true;
                    record = CounterRecord {
                        count: 1,
                        window_start: now,
                        suspicion: 0.0,
                    };
                }
            } else {
                record = CounterRecord {
                    count: 1,
                    window_start: now,
                    suspicion: 0.0,
                };
            }
            Some(record)
        });

        if overflowed {
            warn!(%origin, ceiling, "whitelisted origin exceeded lenient ceiling");
        }

        let count = stored.map(|r| r.count).unwrap_or(1);
        Decision::Allow {
            remaining: ceiling.saturating_sub(count),
            warned: overflowed,
        }
    }

    /// Insert a block record, unless the origin is whitelisted: whitelisted
    /// origins must never land in the block list, so that attempt is a
    /// logged no-op.
    fn block_origin(&self, origin: &OriginKey, now: u64) -> bool {
        if self.whitelist.contains(origin) {
            warn!(%origin, "refusing to block whitelisted origin");
            return false;
        }
        self.blocks
            .put(origin.as_str(), BlockRecord { blocked_at: now });
        true
    }

    /// Reclamation sweep: evict counters whose window is more than twice
    /// the window length stale, and blocks whose duration has elapsed.
    pub fn sweep_now(&self) -> SweepOutcome {
        let now = self.clock.now_millis();
        let counter_stale = self.config.window_ms.saturating_mul(2);
        let trusted_stale = self.config.trusted_window_ms.saturating_mul(2);
        let block_duration = self.config.block_duration_ms;

        let outcome = SweepOutcome {
            counters_evicted: self.counters.retain(&mut |_, record| {
                now.saturating_sub(record.window_start) <= counter_stale
            }),
            trusted_evicted: self.trusted.retain(&mut |_, record| {
                now.saturating_sub(record.window_start) <= trusted_stale
            }),
            blocks_evicted: self.blocks.retain(&mut |_, block| {
                now.saturating_sub(block.blocked_at) < block_duration
            }),
        };

        if outcome != SweepOutcome::default() {
            debug!(
                counters = outcome.counters_evicted,
                trusted = outcome.trusted_evicted,
                blocks = outcome.blocks_evicted,
                "sweep evicted expired records"
            );
        }
        outcome
    }

    /// Remove the block record for `origin`. Returns true if one existed.
    pub fn unblock(&self, origin: &OriginKey) -> bool {
        let removed = self.blocks.remove(origin.as_str()).is_some();
        if removed {
            info!(%origin, "origin unblocked by operator");
        }
        removed
    }

    /// Drop every record from every store. Returns the number of blocked
    /// origins that were cleared.
    pub fn clear_all(&self) -> usize {
        let blocked = self.blocks.len();
        self.blocks.retain(&mut |_, _| false);
        self.counters.retain(&mut |_, _| false);
        self.trusted.retain(&mut |_, _| false);
        info!(blocked, "all gate state cleared by operator");
        blocked
    }

    /// Read-only snapshot for operational dashboards.
    pub fn stats(&self) -> GateStats {
        GateStats {
            active: self.counters.len(),
            trusted: self.trusted.len(),
            blocked: self.blocks.len(),
            blocked_keys: self.blocks.keys(),
            limits: EffectiveLimits {
                window_ms: self.config.window_ms,
                max_requests: self.config.max_requests,
                block_duration_ms: self.config.block_duration_ms,
                suspicious_threshold: self.config.suspicious_threshold,
                trusted_max_requests: self.config.trusted_max_requests,
                trusted_window_ms: self.config.trusted_window_ms,
            },
        }
    }
}
