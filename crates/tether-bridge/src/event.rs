// Copyright (c) 2024-2026 Tether Contributors
//
// SPDX-License-Identifier: MIT
//!
//! Canonical event schema — the one shape every peer sees.
//!
//! All types derive `Serialize`/`Deserialize` and are encoded as JSON.
//! Field names are wire contract: clients written against the reference
//! protocol parse these bytes, so renames here are breaking changes.
//!
//! A serialized event looks like:
//!
//! ```json
//! { "kind": "TOOL_CALL_UPDATE",
//!   "taskId": "session-1",
//!   "tool_call_id": "call-7",
//!   "tool_name": "run_shell",
//!   "status": "PENDING",
//!   "confirmation_request": {
//!     "details": { "execute_details": { "command": "cargo test" } },
//!     "options": [ { "id": "proceed_once", "name": "Allow Once" },
//!                  { "id": "cancel", "name": "Cancel" } ] } }
//! ```

use serde::{Deserialize, Serialize};
use tether_host::ConsoleLevel;

/// The only option id that confirms a tool call.
pub const OPTION_PROCEED_ONCE: &str = "proceed_once";
/// The negative option id. Any id other than [`OPTION_PROCEED_ONCE`]
/// is treated as this one.
pub const OPTION_CANCEL: &str = "cancel";

/// One event as delivered to a peer: the session identifier plus the
/// kind-tagged payload, flattened into a single JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEvent {
    #[serde(rename = "taskId")]
    pub task_id: String,
    #[serde(flatten)]
    pub payload: EventPayload,
}

/// Payload variants, tagged on `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum EventPayload {
    /// A reasoning step from the model.
    #[serde(rename = "THOUGHT")]
    Thought { subject: String, description: String },

    /// Streamed text, from the model or from the host's output streams.
    #[serde(rename = "TEXT_CONTENT")]
    TextContent {
        text: String,
        #[serde(rename = "isStderr", skip_serializing_if = "Option::is_none")]
        is_stderr: Option<bool>,
    },

    /// Lifecycle update for one tool call.
    #[serde(rename = "TOOL_CALL_UPDATE")]
    ToolCallUpdate(ToolCallUpdate),

    /// A console log line from the host.
    #[serde(rename = "CONSOLE_LOG")]
    ConsoleLog {
        #[serde(rename = "type")]
        level: ConsoleLevel,
        content: String,
    },

    /// A host lifecycle hook crossed a boundary.
    #[serde(rename = "HOOK")]
    Hook {
        #[serde(rename = "hookName")]
        hook_name: String,
        phase: HookPhase,
        #[serde(skip_serializing_if = "Option::is_none")]
        success: Option<bool>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookPhase {
    Start,
    End,
}

/// Wire state of a tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ToolCallStatus {
    Pending,
    Executing,
    Succeeded,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallUpdate {
    pub tool_call_id: String,
    pub tool_name: String,
    pub status: ToolCallStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_parameters: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub live_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ToolCallResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmation_request: Option<ConfirmationRequest>,
}

/// Terminal outcome of a tool call. Exactly one side is populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<ResultOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ResultError>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultOutput {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultError {
    pub message: String,
}

impl ToolCallResult {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            output: Some(ResultOutput { text: text.into() }),
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            output: None,
            error: Some(ResultError {
                message: message.into(),
            }),
        }
    }
}

/// Approval request attached to a PENDING tool-call update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationRequest {
    pub details: ConfirmationDetails,
    pub options: Vec<ConfirmationOption>,
}

impl ConfirmationRequest {
    /// Wrap details with the fixed two-option set.
    pub fn new(details: ConfirmationDetails) -> Self {
        Self {
            details,
            options: vec![
                ConfirmationOption {
                    id: OPTION_PROCEED_ONCE.to_string(),
                    name: "Allow Once".to_string(),
                },
                ConfirmationOption {
                    id: OPTION_CANCEL.to_string(),
                    name: "Cancel".to_string(),
                },
            ],
        }
    }
}

/// Externally tagged: each variant serializes under its own key, e.g.
/// `{ "execute_details": { "command": "ls" } }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConfirmationDetails {
    #[serde(rename = "execute_details")]
    Execute { command: String },

    #[serde(rename = "file_edit_details")]
    FileEdit {
        file_name: String,
        file_path: String,
        old_content: String,
        new_content: String,
        formatted_diff: String,
    },

    #[serde(rename = "mcp_details")]
    Mcp {
        server_name: String,
        tool_name: String,
    },

    #[serde(rename = "generic_details")]
    Generic { description: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationOption {
    pub id: String,
    pub name: String,
}

// ── Unit tests ────────────────────────────────────────────────────────────────
