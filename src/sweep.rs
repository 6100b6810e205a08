// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Sweep trigger policies.
//!
//! The reclamation sweep runs opportunistically on a fraction of evaluated
//! requests rather than on a timer, so there is no coordination overhead
//! under concurrency. The trigger itself is injectable: production uses the
//! probabilistic policy, tests use a deterministic one.

use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};

/// Decides, per evaluated request, whether to run the reclamation sweep.
pub trait SweepPolicy: Send + Sync + std::fmt::Debug {
    fn should_sweep(&self) -> bool;
}

/// Fires with fixed probability per call.
#[derive(Debug)]
pub struct ProbabilisticSweep {
    probability: f64,
}

impl ProbabilisticSweep {
    pub fn new(probability: f64) -> Self {
        Self {
            probability: probability.clamp(0.0, 1.0),
        }
    }
}

impl SweepPolicy for ProbabilisticSweep {
    fn should_sweep(&self) -> bool {
        if self.probability <= 0.0 {
            return false;
        }
        if self.probability >= 1.0 {
            return true;
        }
        rand::thread_rng().gen_bool(self.probability)
    }
}

/// Fires on every n-th call. Deterministic; the testing counterpart of
/// [`ProbabilisticSweep`].
#[derive(Debug)]
pub struct EveryNth {
    n: u64,
    calls: AtomicU64,
}

impl EveryNth {
    pub fn new(n: u64) -> Self {
        Self {
            n: n.max(1),
            calls: AtomicU64::new(0),
        }
    }
}

impl SweepPolicy for EveryNth {
    fn should_sweep(&self) -> bool {
        let calls = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        calls % self.n == 0
    }
}

/// Never fires. Lets tests exercise lazy expiry in isolation.
#[derive(Debug, Default)]
pub struct NeverSweep;

impl SweepPolicy for NeverSweep {
    fn should_sweep(&self) -> bool {
        false
    }
}
