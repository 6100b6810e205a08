// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Whitelist policy: which origins are trusted, and what trust means.

use crate::config::Profile;
use crate::origin::OriginKey;
use std::collections::HashSet;

/// Loopback/local identifiers that are always trusted.
const BUILTIN_KEYS: &[&str] = &["127.0.0.1", "::1", "localhost"];

/// What being whitelisted buys an origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhitelistMode {
    /// Bypass the gate entirely. No state is touched.
    Permissive,
    /// Independent, much higher ceiling; overflow warns and resets but
    /// never blocks.
    LenientLimit,
}

impl WhitelistMode {
    /// Development bypasses; production still counts, leniently.
    pub fn for_profile(profile: Profile) -> Self {
        match profile {
            Profile::Development => WhitelistMode::Permissive,
            Profile::Production => WhitelistMode::LenientLimit,
        }
    }
}

/// Membership test over the built-in loopback set plus configured extras.
#[derive(Debug, Clone)]
pub struct WhitelistPolicy {
    keys: HashSet<String>,
    mode: WhitelistMode,
}

impl WhitelistPolicy {
    pub fn new(mode: WhitelistMode, extra_keys: &[String]) -> Self {
        let mut keys: HashSet<String> = BUILTIN_KEYS.iter().map(|k| k.to_string()).collect();
        keys.extend(extra_keys.iter().cloned());
        Self { keys, mode }
    }

    pub fn contains(&self, origin: &OriginKey) -> bool {
        self.keys.contains(origin.as_str())
    }

    pub fn mode(&self) -> WhitelistMode {
        self.mode
    }
}
