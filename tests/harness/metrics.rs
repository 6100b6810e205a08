// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Outcome accounting for abuse simulation runs.

use abuse_gate::gate::{Decision, DenyReason};
use std::collections::HashMap;

/// Per-outcome counters for one simulated attack.
#[derive(Debug, Default)]
pub struct AttackMetrics {
    outcomes: HashMap<Outcome, usize>,
    requests_per_origin: HashMap<String, usize>,
}

/// Possible outcomes for a simulated request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Allowed,
    Warned,
    Blocked,
    RateExceeded,
    AutoBlockedSuspicious,
}

impl From<&Decision> for Outcome {
    fn from(decision: &Decision) -> Self {
        match decision {
            Decision::Allow { warned: true, .. } => Outcome::Warned,
            Decision::Allow { .. } => Outcome::Allowed,
            Decision::Deny { reason, .. } => match reason {
                DenyReason::Blocked => Outcome::Blocked,
                DenyReason::RateExceeded => Outcome::RateExceeded,
                DenyReason::AutoBlockedSuspicious => Outcome::AutoBlockedSuspicious,
            },
        }
    }
}

impl AttackMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one request outcome.
    pub fn record(&mut self, decision: &Decision, origin: &str) {
        *self.outcomes.entry(Outcome::from(decision)).or_insert(0) += 1;
        *self
            .requests_per_origin
            .entry(origin.to_string())
            .or_insert(0) += 1;
    }

    pub fn total_requests(&self) -> usize {
        self.outcomes.values().sum()
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.outcomes.get(&outcome).copied().unwrap_or(0)
    }

    /// Requests that made it through, warned or not.
    pub fn allowed(&self) -> usize {
        self.count(Outcome::Allowed) + self.count(Outcome::Warned)
    }

    /// Requests rejected for any reason.
    pub fn denied(&self) -> usize {
        self.count(Outcome::Blocked)
            + self.count(Outcome::RateExceeded)
            + self.count(Outcome::AutoBlockedSuspicious)
    }

    /// Ratio of denied to total (0.0-1.0).
    pub fn block_rate(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            return 0.0;
        }
        self.denied() as f64 / total as f64
    }

    pub fn unique_origins(&self) -> usize {
        self.requests_per_origin.len()
    }

    pub fn report(&self) -> MetricsReport {
        MetricsReport {
            total_requests: self.total_requests(),
            allowed: self.allowed(),
            warned: self.count(Outcome::Warned),
            blocked: self.count(Outcome::Blocked),
            rate_exceeded: self.count(Outcome::RateExceeded),
            auto_blocked: self.count(Outcome::AutoBlockedSuspicious),
            block_rate: self.block_rate(),
            unique_origins: self.unique_origins(),
        }
    }
}

/// Summary of one attack run.
#[derive(Debug, Clone)]
pub struct MetricsReport {
    pub total_requests: usize,
    pub allowed: usize,
    pub warned: usize,
    pub blocked: usize,
    pub rate_exceeded: usize,
    pub auto_blocked: usize,
    pub block_rate: f64,
    pub unique_origins: usize,
}

impl std::fmt::Display for MetricsReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Abuse Simulation Report ===")?;
        writeln!(f, "Total Requests:    {}", self.total_requests)?;
        writeln!(
            f,
            "Allowed:           {} ({:.1}%)",
            self.allowed,
            self.allowed as f64 / self.total_requests.max(1) as f64 * 100.0
        )?;
        writeln!(f, "  of which warned: {}", self.warned)?;
        writeln!(f, "Blocked:           {}", self.blocked)?;
        writeln!(f, "Rate Exceeded:     {}", self.rate_exceeded)?;
        writeln!(f, "Auto-blocked:      {}", self.auto_blocked)?;
        writeln!(f, "Block Rate:        {:.1}%", self.block_rate * 100.0)?;
        writeln!(f, "Unique Origins:    {}", self.unique_origins)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn outcomes_are_tallied() {
        let mut metrics = AttackMetrics::new();
        metrics.record(
            &Decision::Allow {
                remaining: 5,
                warned: false,
            },
            "10.0.0.1",
        );
        metrics.record(
            &Decision::Allow {
                remaining: 1,
                warned: true,
            },
            "10.0.0.1",
        );
        metrics.record(
            &Decision::Deny {
                reason: DenyReason::RateExceeded,
                retry_after: Some(Duration::from_secs(1)),
            },
            "10.0.0.1",
        );

        assert_eq!(metrics.total_requests(), 3);
        assert_eq!(metrics.allowed(), 2);
        assert_eq!(metrics.count(Outcome::Warned), 1);
        assert_eq!(metrics.denied(), 1);
        assert_eq!(metrics.unique_origins(), 1);
    }

    #[test]
    fn block_rate_is_a_ratio() {
        let mut metrics = AttackMetrics::new();
        for _ in 0..3 {
            metrics.record(
                &Decision::Allow {
                    remaining: 1,
                    warned: false,
                },
                "10.0.0.1",
            );
        }
        for _ in 0..7 {
            metrics.record(
                &Decision::Deny {
                    reason: DenyReason::Blocked,
                    retry_after: None,
                },
                "10.0.0.1",
            );
        }
        assert!((metrics.block_rate() - 0.7).abs() < 0.01);
    }
}
