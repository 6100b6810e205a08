// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Abuse Gate
//!
//! This crate provides an inline abuse-detection and adaptive rate-limiting
//! gate for API ingress. Every inbound request is bucketed by origin key and
//! checked against:
//!
//! - Sliding-window request counting with a configurable ceiling
//! - A heuristic suspicion scorer (agent string, header shape, declared
//!   body size, path/content-type mismatch)
//! - A time-bounded block list with automatic rehabilitation
//! - A whitelist carve-out with its own, much higher limits
//! - Probabilistic memory reclamation for both state stores
//!
//! Operators get manual unblock, clear-all and a stats snapshot.
//!
//! No database, no network calls: all state is in-process and cleared by a
//! restart, by design.

pub mod clock;
pub mod config;
pub mod gate;
pub mod handlers;
pub mod metrics;
pub mod origin;
pub mod score;
pub mod store;
pub mod sweep;
pub mod whitelist;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, GateConfig, Profile, ScoreConfig};
pub use gate::{Decision, DenyReason, Gate, GateStats};
pub use origin::{OriginKey, RequestAttributes};
pub use sweep::{EveryNth, NeverSweep, ProbabilisticSweep, SweepPolicy};
pub use whitelist::{WhitelistMode, WhitelistPolicy};
