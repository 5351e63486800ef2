// Copyright (c) 2024-2026 Tether Contributors
//
// SPDX-License-Identifier: MIT
//!
//! Agent-card descriptor served at `/.well-known/agent-card.json`.
//!
//! Field names are wire contract; see the serde renames.

use serde::{Deserialize, Serialize};

use crate::config::BridgeConfig;

/// Protocol revision this bridge speaks.
pub const PROTOCOL_VERSION: &str = "0.3.0";

/// URI of the live-session extension advertised in the card.
const LIVE_SESSION_EXTENSION_URI: &str = "urn:tether:live-session/1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentCard {
    pub name: String,
    pub description: String,
    pub url: String,
    pub version: String,
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    pub capabilities: AgentCapabilities,
    #[serde(rename = "defaultInputModes")]
    pub default_input_modes: Vec<String>,
    #[serde(rename = "defaultOutputModes")]
    pub default_output_modes: Vec<String>,
    pub skills: Vec<AgentSkill>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentCapabilities {
    pub streaming: bool,
    pub extensions: Vec<AgentExtension>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentExtension {
    pub uri: String,
    pub description: String,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSkill {
    pub id: String,
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    #[serde(rename = "inputModes")]
    pub input_modes: Vec<String>,
    #[serde(rename = "outputModes")]
    pub output_modes: Vec<String>,
}

impl AgentCard {
    /// Build the card from bridge configuration and the bound port.
    pub fn build(config: &BridgeConfig, port: u16) -> Self {
        let text = vec!["text".to_string()];
        Self {
            name: config.name.clone(),
            description: config.description.clone(),
            url: format!("http://127.0.0.1:{port}/"),
            version: env!("CARGO_PKG_VERSION").to_string(),
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: AgentCapabilities {
                streaming: true,
                extensions: vec![AgentExtension {
                    uri: LIVE_SESSION_EXTENSION_URI.to_string(),
                    description: "Bidirectional access to the live terminal session: \
                                  events out, prompts and tool confirmations in."
                        .to_string(),
                    required: true,
                }],
            },
            default_input_modes: text.clone(),
            default_output_modes: text.clone(),
            skills: vec![AgentSkill {
                id: "live-session".to_string(),
                name: config.name.clone(),
                description: config.description.clone(),
                tags: vec!["session".to_string(), "terminal".to_string()],
                input_modes: text.clone(),
                output_modes: text,
            }],
        }
    }
}

// ── Unit tests ────────────────────────────────────────────────────────────────
