// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the abuse gate.
//!
//! All thresholds are plain data constructed once at startup and handed to
//! the gate; nothing in the request path reads the environment. The
//! development profile ships looser defaults (higher ceiling, shorter block)
//! than production, but the algorithm is identical across profiles.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Deployment profile. Selects default thresholds and the whitelist mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    Development,
    Production,
}

impl Default for Profile {
    fn default() -> Self {
        Profile::Production
    }
}

impl std::str::FromStr for Profile {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Profile::Development),
            "production" | "prod" => Ok(Profile::Production),
            other => Err(ConfigError::UnknownProfile(other.to_string())),
        }
    }
}

/// Configuration error. Misconfiguration is fatal at startup, never a
/// per-request condition.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown profile: {0}")]
    UnknownProfile(String),

    #[error("{field} must be greater than zero")]
    ZeroThreshold { field: &'static str },

    #[error("sweep_probability must be within 0.0..=1.0, got {0}")]
    InvalidSweepProbability(f64),
}

/// Top-level service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Deployment profile
    #[serde(default)]
    pub profile: Profile,

    /// Gate thresholds and policy knobs
    #[serde(default)]
    pub gate: GateConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Gate thresholds. One immutable value object, injected at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Counting window length in milliseconds (default: 60000)
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,

    /// Request ceiling per window per origin (default: 120)
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// How long a blocked origin stays blocked, in milliseconds
    /// (default: 600000)
    #[serde(default = "default_block_duration_ms")]
    pub block_duration_ms: u64,

    /// Suspicion score at which an origin is auto-blocked (default: 100)
    #[serde(default = "default_suspicious_threshold")]
    pub suspicious_threshold: f64,

    /// Suspicion subtracted when a fresh window starts (default: 10)
    #[serde(default = "default_decay_step")]
    pub decay_step: f64,

    /// Additional whitelisted origin keys beyond the loopback built-ins
    #[serde(default)]
    pub whitelist: Vec<String>,

    /// Ceiling for whitelisted origins in lenient-limit mode (default: 5000)
    #[serde(default = "default_trusted_max_requests")]
    pub trusted_max_requests: u32,

    /// Window for whitelisted origins in lenient-limit mode (default: 60000)
    #[serde(default = "default_trusted_window_ms")]
    pub trusted_window_ms: u64,

    /// Paths exempt from the gate entirely (default: /health, /healthz)
    #[serde(default = "default_health_paths")]
    pub health_paths: Vec<String>,

    /// Path prefixes where large bodies are expected (default: /upload, /files)
    #[serde(default = "default_upload_paths")]
    pub upload_paths: Vec<String>,

    /// Path prefixes treated as webhook-shaped (default: /webhook, /hooks)
    #[serde(default = "default_webhook_paths")]
    pub webhook_paths: Vec<String>,

    /// Probability that an evaluated request triggers the reclamation sweep
    /// (default: 0.01)
    #[serde(default = "default_sweep_probability")]
    pub sweep_probability: f64,

    /// Scorer weights and cutoffs
    #[serde(default)]
    pub score: ScoreConfig,
}

/// Suspicion scorer weights.
///
/// The relative ordering (burst > bot token > missing headers > oversized
/// body) is the meaningful part; the magnitudes are tuning defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreConfig {
    /// Penalty for bursting (count past `burst_count` inside `burst_window_ms`)
    #[serde(default = "default_burst_penalty")]
    pub burst_penalty: f64,

    /// Penalty for an agent string on the automation token list
    #[serde(default = "default_bot_token_penalty")]
    pub bot_token_penalty: f64,

    /// Penalty for a missing agent or accept header
    #[serde(default = "default_missing_headers_penalty")]
    pub missing_headers_penalty: f64,

    /// Penalty for a declared body over `max_content_length` off upload paths
    #[serde(default = "default_oversized_body_penalty")]
    pub oversized_body_penalty: f64,

    /// Penalty for a webhook-shaped path with non-JSON declared content type
    #[serde(default = "default_webhook_mismatch_penalty")]
    pub webhook_mismatch_penalty: f64,

    /// Flat nudge once count passes `sustained_count` in the window
    #[serde(default = "default_sustained_penalty")]
    pub sustained_penalty: f64,

    /// Reduced penalty for a recognizable browser bursting hard
    #[serde(default = "default_browser_burst_penalty")]
    pub browser_burst_penalty: f64,

    /// Window age under which counting is considered a burst (default: 500)
    #[serde(default = "default_burst_window_ms")]
    pub burst_window_ms: u64,

    /// Count past which a non-browser inside the burst window is penalized
    #[serde(default = "default_burst_count")]
    pub burst_count: u32,

    /// Count past which even a browser inside the burst window is penalized
    #[serde(default = "default_browser_burst_count")]
    pub browser_burst_count: u32,

    /// Count past which the flat sustained nudge applies
    #[serde(default = "default_sustained_count")]
    pub sustained_count: u32,

    /// Declared content length considered oversized, in bytes (default: 1 MiB)
    #[serde(default = "default_max_content_length")]
    pub max_content_length: u64,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_window_ms() -> u64 {
    60_000
}

fn default_max_requests() -> u32 {
    120
}

fn default_block_duration_ms() -> u64 {
    600_000 // 10 minutes
}

fn default_suspicious_threshold() -> f64 {
    100.0
}

fn default_decay_step() -> f64 {
    10.0
}

fn default_trusted_max_requests() -> u32 {
    5_000
}

fn default_trusted_window_ms() -> u64 {
    60_000
}

fn default_health_paths() -> Vec<String> {
    vec!["/health".to_string(), "/healthz".to_string()]
}

fn default_upload_paths() -> Vec<String> {
    vec!["/upload".to_string(), "/files".to_string()]
}

fn default_webhook_paths() -> Vec<String> {
    vec!["/webhook".to_string(), "/hooks".to_string()]
}

fn default_sweep_probability() -> f64 {
    0.01
}

fn default_burst_penalty() -> f64 {
    30.0
}

fn default_bot_token_penalty() -> f64 {
    20.0
}

fn default_missing_headers_penalty() -> f64 {
    15.0
}

fn default_oversized_body_penalty() -> f64 {
    10.0
}

fn default_webhook_mismatch_penalty() -> f64 {
    8.0
}

fn default_sustained_penalty() -> f64 {
    5.0
}

fn default_browser_burst_penalty() -> f64 {
    10.0
}

fn default_burst_window_ms() -> u64 {
    500
}

fn default_burst_count() -> u32 {
    5
}

fn default_browser_burst_count() -> u32 {
    30
}

fn default_sustained_count() -> u32 {
    20
}

fn default_max_content_length() -> u64 {
    1_048_576
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            profile: Profile::default(),
            gate: GateConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self::production()
    }
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            burst_penalty: default_burst_penalty(),
            bot_token_penalty: default_bot_token_penalty(),
            missing_headers_penalty: default_missing_headers_penalty(),
            oversized_body_penalty: default_oversized_body_penalty(),
            webhook_mismatch_penalty: default_webhook_mismatch_penalty(),
            sustained_penalty: default_sustained_penalty(),
            browser_burst_penalty: default_browser_burst_penalty(),
            burst_window_ms: default_burst_window_ms(),
            burst_count: default_burst_count(),
            browser_burst_count: default_browser_burst_count(),
            sustained_count: default_sustained_count(),
            max_content_length: default_max_content_length(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
        }
    }
}

impl GateConfig {
    /// Production defaults: tight ceiling, long block.
    pub fn production() -> Self {
        Self {
            window_ms: default_window_ms(),
            max_requests: default_max_requests(),
            block_duration_ms: default_block_duration_ms(),
            suspicious_threshold: default_suspicious_threshold(),
            decay_step: default_decay_step(),
            whitelist: Vec::new(),
            trusted_max_requests: default_trusted_max_requests(),
            trusted_window_ms: default_trusted_window_ms(),
            health_paths: default_health_paths(),
            upload_paths: default_upload_paths(),
            webhook_paths: default_webhook_paths(),
            sweep_probability: default_sweep_probability(),
            score: ScoreConfig::default(),
        }
    }

    /// Development defaults: looser ceiling, shorter block, higher
    /// suspicion tolerance. Same algorithm, different numbers.
    pub fn development() -> Self {
        Self {
            max_requests: 1_000,
            block_duration_ms: 60_000,
            suspicious_threshold: 250.0,
            ..Self::production()
        }
    }

    /// Profile-appropriate defaults.
    pub fn for_profile(profile: Profile) -> Self {
        match profile {
            Profile::Development => Self::development(),
            Profile::Production => Self::production(),
        }
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    pub fn block_duration(&self) -> Duration {
        Duration::from_millis(self.block_duration_ms)
    }

    pub fn trusted_window(&self) -> Duration {
        Duration::from_millis(self.trusted_window_ms)
    }

    /// Count at which the approaching-limit warning starts (80% of ceiling).
    pub fn warn_threshold(&self) -> u32 {
        (f64::from(self.max_requests) * 0.8).ceil() as u32
    }

    /// Reject configurations the gate cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_ms == 0 {
            return Err(ConfigError::ZeroThreshold { field: "window_ms" });
        }
        if self.max_requests == 0 {
            return Err(ConfigError::ZeroThreshold { field: "max_requests" });
        }
        if self.block_duration_ms == 0 {
            return Err(ConfigError::ZeroThreshold { field: "block_duration_ms" });
        }
        if self.suspicious_threshold <= 0.0 {
            return Err(ConfigError::ZeroThreshold { field: "suspicious_threshold" });
        }
        if self.trusted_max_requests == 0 {
            return Err(ConfigError::ZeroThreshold { field: "trusted_max_requests" });
        }
        if self.trusted_window_ms == 0 {
            return Err(ConfigError::ZeroThreshold { field: "trusted_window_ms" });
        }
        if !(0.0..=1.0).contains(&self.sweep_probability) {
            return Err(ConfigError::InvalidSweepProbability(self.sweep_probability));
        }
        Ok(())
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.gate.validate()
    }
}
