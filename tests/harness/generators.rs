// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Test data generators for abuse simulation.

use super::attacks::{AttackConfig, ClientKind};
use abuse_gate::origin::{OriginKey, RequestAttributes};

/// Generate a pool of origin keys in the 10.x.x.x private range.
pub fn generate_origins(count: usize) -> Vec<OriginKey> {
    (0..count)
        .map(|i| {
            let a = (i >> 16) & 0xFF;
            let b = (i >> 8) & 0xFF;
            let c = i & 0xFF;
            OriginKey::new(format!("10.{a}.{b}.{c}"))
        })
        .collect()
}

/// Browser agent strings, cycled per request index.
const BROWSER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 Chrome/120.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0",
];

/// Automation agent strings, cycled per request index.
const SCRIPTED_AGENTS: &[&str] = &[
    "curl/8.5.0",
    "python-requests/2.31.0",
    "Wget/1.21.4",
    "Go-http-client/2.0",
];

/// Build the attribute bundle for request `index` of an attack.
pub fn attributes_for(config: &AttackConfig, index: usize) -> RequestAttributes {
    let (user_agent, has_accept) = match config.client {
        ClientKind::Browser => (
            Some(BROWSER_AGENTS[index % BROWSER_AGENTS.len()].to_string()),
            true,
        ),
        ClientKind::Scripted => (
            Some(SCRIPTED_AGENTS[index % SCRIPTED_AGENTS.len()].to_string()),
            true,
        ),
        ClientKind::Headless => (None, false),
    };

    RequestAttributes {
        path: config.path.to_string(),
        user_agent,
        has_accept,
        content_length: config.content_length,
        content_type: config.content_type.map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_are_unique() {
        let origins = generate_origins(300);
        let unique: std::collections::HashSet<_> =
            origins.iter().map(|o| o.as_str().to_string()).collect();
        assert_eq!(unique.len(), 300);
    }

    #[test]
    fn headless_requests_have_no_headers() {
        let config = AttackConfig {
            client: ClientKind::Headless,
            ..Default::default()
        };
        let attrs = attributes_for(&config, 0);
        assert!(attrs.user_agent.is_none());
        assert!(!attrs.has_accept);
    }
}
