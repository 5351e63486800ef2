// Copyright (c) 2024-2026 Tether Contributors
//
// SPDX-License-Identifier: MIT
//!
//! Tool-confirmation traffic between the host's tool executor and every
//! participant that can answer a confirmation (terminal dialog, bridge
//! peers).
//!
//! The bus is a broadcast channel: the tool executor publishes
//! [`BusMessage::ToolConfirmationRequest`] and batches of
//! [`BusMessage::ToolCallsUpdate`]; whoever resolves a confirmation
//! publishes [`BusMessage::ToolConfirmationResponse`] and the executor
//! unblocks the tool. Subscribers that only observe (the bridge) must
//! tolerate lag.

use tokio::sync::broadcast;

/// Messages carried on the host's tool message bus.
#[derive(Debug, Clone)]
pub enum BusMessage {
    /// The tool executor is waiting for approval of one tool call.
    ToolConfirmationRequest(ToolConfirmation),
    /// State snapshot for a batch of in-flight tool calls.
    ToolCallsUpdate(Vec<ToolCallState>),
    /// A participant answered a pending confirmation.
    ToolConfirmationResponse {
        correlation_id: String,
        confirmed: bool,
    },
}

/// A pending tool confirmation as the host's executor describes it.
#[derive(Debug, Clone)]
pub struct ToolConfirmation {
    /// Identical to the tool call id on the wire.
    pub correlation_id: String,
    pub tool_name: String,
    pub kind: ConfirmationKind,
}

/// What the tool wants to do, for display to the approving participant.
#[derive(Debug, Clone)]
pub enum ConfirmationKind {
    /// Run a shell command.
    Execute { command: String },
    /// Modify a file.
    Edit {
        file_name: String,
        file_path: String,
        old_content: String,
        new_content: String,
        diff: String,
    },
    /// Invoke a tool on an MCP server.
    Mcp {
        server_name: String,
        tool_name: String,
    },
    /// Anything else; `title` is free-form display text.
    Other { title: Option<String> },
}

/// Lifecycle phase of one tool call as reported by the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolCallPhase {
    Scheduled,
    Validating,
    AwaitingApproval,
    Executing,
    Success,
    Error,
    Cancelled,
}

/// One entry of a [`BusMessage::ToolCallsUpdate`] batch.
#[derive(Debug, Clone)]
pub struct ToolCallState {
    pub id: String,
    pub name: String,
    pub phase: ToolCallPhase,
    /// Tool input, when the executor republishes it.
    pub args: Option<serde_json::Value>,
    /// Incremental shell output while the tool runs.
    pub live_output: Option<String>,
    /// Display result once the tool succeeded.
    pub display: Option<String>,
    /// Error message once the tool failed.
    pub error: Option<String>,
}

impl ToolCallState {
    /// A state snapshot carrying only id, name and phase.
    pub fn new(id: impl Into<String>, name: impl Into<String>, phase: ToolCallPhase) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            phase,
            args: None,
            live_output: None,
            display: None,
            error: None,
        }
    }
}

/// Clone-able handle to the host's tool message bus.
#[derive(Debug, Clone)]
pub struct MessageBus {
    tx: broadcast::Sender<BusMessage>,
}

impl MessageBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish a message to all current subscribers.
    ///
    /// No subscribers is fine (nobody is listening yet) — the message is
    /// silently discarded, matching broadcast semantics.
    pub fn publish(&self, msg: BusMessage) {
        let _ = self.tx.send(msg);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BusMessage> {
        self.tx.subscribe()
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new(256)
    }
}

// ── Unit tests ────────────────────────────────────────────────────────────────
