// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Heuristic suspicion scorer.
//!
//! Pure function of the request attributes and the origin's current counter
//! state. Header-only heuristics bias against automation and payload
//! flooding without touching the body; false positives are bounded by the
//! per-window decay and by the much higher tolerance given to recognizable
//! browsers.

use crate::config::ScoreConfig;
use crate::origin::RequestAttributes;

/// Agent tokens that mark a recognizable browser.
const BROWSER_TOKENS: &[&str] = &[
    "mozilla", "chrome", "chromium", "safari", "firefox", "edg", "opera",
];

/// Agent tokens that mark known automation.
const BOT_TOKENS: &[&str] = &[
    "bot", "crawl", "spider", "scrape", "curl", "wget", "python", "httpclient",
    "java", "go-http", "libwww", "postman", "axios", "okhttp", "headless",
];

/// Stateless scorer. All state lives in the caller's counter record.
#[derive(Debug, Clone)]
pub struct Scorer {
    config: ScoreConfig,
    upload_paths: Vec<String>,
    webhook_paths: Vec<String>,
}

impl Scorer {
    pub fn new(config: ScoreConfig, upload_paths: Vec<String>, webhook_paths: Vec<String>) -> Self {
        Self {
            config,
            upload_paths,
            webhook_paths,
        }
    }

    /// Score one request. `count` is the origin's request count so far in
    /// the current window and `window_age_ms` how long ago that window
    /// started. Returns the additive suspicion delta (≥ 0).
    pub fn delta(&self, attrs: &RequestAttributes, count: u32, window_age_ms: u64) -> f64 {
        let agent = attrs.user_agent.as_deref().map(str::to_lowercase);

        if agent.as_deref().is_some_and(is_browser_agent) {
            // Browsers are structurally less suspicious; only a hard burst
            // from one is worth anything.
            if count > self.config.browser_burst_count
                && window_age_ms < self.config.burst_window_ms
            {
                return self.config.browser_burst_penalty;
            }
            return 0.0;
        }

        let mut delta = 0.0;

        if count > self.config.burst_count && window_age_ms < self.config.burst_window_ms {
            delta += self.config.burst_penalty;
        }

        if agent.as_deref().is_some_and(is_bot_agent) {
            delta += self.config.bot_token_penalty;
        }

        if agent.is_none() || !attrs.has_accept {
            delta += self.config.missing_headers_penalty;
        }

        if attrs
            .content_length
            .is_some_and(|len| len > self.config.max_content_length)
            && !self.is_upload_path(&attrs.path)
        {
            delta += self.config.oversized_body_penalty;
        }

        if count > self.config.sustained_count {
            delta += self.config.sustained_penalty;
        }

        if self.is_webhook_path(&attrs.path) && !declares_json(attrs.content_type.as_deref()) {
            delta += self.config.webhook_mismatch_penalty;
        }

        delta
    }

    fn is_upload_path(&self, path: &str) -> bool {
        self.upload_paths.iter().any(|p| path.starts_with(p.as_str()))
    }

    fn is_webhook_path(&self, path: &str) -> bool {
        self.webhook_paths.iter().any(|p| path.starts_with(p.as_str()))
    }
}

fn is_browser_agent(agent: &str) -> bool {
    // Automation frequently impersonates browsers while keeping its own
    // token in the string; a bot token disqualifies the browser match.
    BROWSER_TOKENS.iter().any(|t| agent.contains(t)) && !is_bot_agent(agent)
}

fn is_bot_agent(agent: &str) -> bool {
    BOT_TOKENS.iter().any(|t| agent.contains(t))
}

fn declares_json(content_type: Option<&str>) -> bool {
    match content_type {
        Some(ct) => {
            let media = ct.split(';').next().unwrap_or(ct).trim().to_lowercase();
            media == "application/json" || media.ends_with("+json")
        }
        None => false,
    }
}
