// Copyright (c) 2024-2026 Tether Contributors
//
// SPDX-License-Identifier: MIT
//!
//! Frame codec — the on-wire forms of a [`SessionEvent`] and the parser
//! for inbound peer messages.
//!
//! # Wire formats
//!
//! - **Framed socket**: one JSON object per message, terminated by a
//!   single `0x00` byte.
//! - **SSE**: the same JSON wrapped in a JSON-RPC envelope
//!   `{ "jsonrpc": "2.0", "id": <taskId>, "result": <event> }`; the
//!   `data:`/blank-line framing is applied by the HTTP layer.
//!
//! Inbound messages are JSON-RPC shaped. Only `method == "message/stream"`
//! with `params.message.content` is meaningful; anything else is
//! [`InboundAction::Ignored`]. Malformed JSON is an error the caller
//! logs and drops — it never terminates the peer.

use serde::Deserialize;

use crate::event::SessionEvent;

/// Record terminator on the framed-socket transport.
pub const FRAME_DELIMITER: u8 = 0x00;

/// Serialize an event for the framed-socket transport.
pub fn socket_frame(event: &SessionEvent) -> Result<Vec<u8>, serde_json::Error> {
    let mut bytes = serde_json::to_vec(event)?;
    bytes.push(FRAME_DELIMITER);
    Ok(bytes)
}

/// Serialize an event for the SSE transport (JSON-RPC envelope).
pub fn sse_frame(event: &SessionEvent) -> Result<String, serde_json::Error> {
    serde_json::to_string(&serde_json::json!({
        "jsonrpc": "2.0",
        "id": event.task_id,
        "result": event,
    }))
}

/// Strip the trailing frame delimiter, if present.
pub fn strip_delimiter(bytes: &[u8]) -> &[u8] {
    match bytes.split_last() {
        Some((&FRAME_DELIMITER, rest)) => rest,
        _ => bytes,
    }
}

/// What an inbound peer message asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundAction {
    /// Inject this text into the host's input queue.
    Prompt(String),
    /// Resolve a pending tool confirmation.
    Confirmation {
        tool_call_id: String,
        selected_option_id: String,
    },
    /// Recognized JSON, but nothing we act on. Dropped silently.
    Ignored,
}

// JSON-RPC request shape; `jsonrpc` and `id` are accepted but unused.
#[derive(Deserialize)]
struct ClientEnvelope {
    #[serde(default)]
    method: String,
    #[serde(default)]
    params: StreamParams,
}

#[derive(Default, Deserialize)]
struct StreamParams {
    message: Option<InboundMessage>,
}

#[derive(Deserialize)]
struct InboundMessage {
    content: Option<InboundContent>,
}

#[derive(Deserialize)]
struct InboundContent {
    text: Option<String>,
    data: Option<InboundData>,
}

#[derive(Deserialize)]
struct InboundData {
    kind: Option<String>,
    tool_call_id: Option<String>,
    selected_option_id: Option<String>,
}

/// Parse one raw inbound frame (text or null-terminated bytes).
pub fn parse_client_message(raw: &[u8]) -> Result<InboundAction, serde_json::Error> {
    let envelope: ClientEnvelope = serde_json::from_slice(strip_delimiter(raw))?;
    Ok(classify(envelope))
}

/// Classify an already-parsed JSON body (the HTTP stream endpoints).
pub fn classify_value(value: serde_json::Value) -> InboundAction {
    match serde_json::from_value::<ClientEnvelope>(value) {
        Ok(envelope) => classify(envelope),
        Err(_) => InboundAction::Ignored,
    }
}

fn classify(envelope: ClientEnvelope) -> InboundAction {
    if envelope.method != "message/stream" {
        return InboundAction::Ignored;
    }
    let Some(content) = envelope.params.message.and_then(|m| m.content) else {
        return InboundAction::Ignored;
    };
    if let Some(text) = content.text {
        return InboundAction::Prompt(text);
    }
    if let Some(data) = content.data {
        if data.kind.as_deref() == Some("TOOL_CALL_CONFIRMATION") {
            if let (Some(tool_call_id), Some(selected_option_id)) =
                (data.tool_call_id, data.selected_option_id)
            {
                return InboundAction::Confirmation {
                    tool_call_id,
                    selected_option_id,
                };
            }
        }
    }
    InboundAction::Ignored
}

// ── Unit tests ────────────────────────────────────────────────────────────────
