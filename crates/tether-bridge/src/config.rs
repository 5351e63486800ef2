// Copyright (c) 2024-2026 Tether Contributors
//
// SPDX-License-Identifier: MIT
use serde::Deserialize;

/// Bridge settings. The host fills this from whatever configuration
/// surface it owns; the bridge itself parses nothing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Loopback port to listen on. `None` disables the bridge entirely.
    /// Port `0` binds an ephemeral port (useful in tests).
    pub port: Option<u16>,
    /// Capacity of each peer's outbound frame queue. When full, the
    /// oldest frame is dropped and the peer is marked lossy.
    pub queue_capacity: usize,
    /// Agent name advertised in the agent card.
    pub name: String,
    /// Agent description advertised in the agent card.
    pub description: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            port: None,
            queue_capacity: 1024,
            name: "tether-agent".to_string(),
            description: "Interactive terminal agent session".to_string(),
        }
    }
}

// ── Unit tests ────────────────────────────────────────────────────────────────
