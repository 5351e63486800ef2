// Copyright (c) 2024-2026 Tether Contributors
//
// SPDX-License-Identifier: MIT
use serde::{Deserialize, Serialize};

/// Events emitted by the host agent during a session.
///
/// The bridge subscribes to these and fans them out to connected peers;
/// the terminal UI consumes the same stream. Delivery order within this
/// stream is the order peers must observe.
#[derive(Debug, Clone)]
pub enum HostEvent {
    /// A reasoning step streamed from the model.
    Thought { subject: String, description: String },
    /// A text chunk streamed from the model.
    Content { text: String },
    /// The model has requested a tool call (pre-approval).
    ToolCallRequest {
        id: String,
        name: String,
        args: serde_json::Value,
    },
    /// Raw bytes written to the host's stdout or stderr.
    /// Chunks are not guaranteed to fall on UTF-8 boundaries.
    Output { chunk: Vec<u8>, is_stderr: bool },
    /// A console log line produced by the host.
    ConsoleLog {
        level: ConsoleLevel,
        content: String,
    },
    /// A lifecycle hook began executing.
    HookStart { name: String },
    /// A lifecycle hook finished.
    HookEnd { name: String, success: bool },
}

/// Severity of a [`HostEvent::ConsoleLog`] line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleLevel {
    Info,
    Warn,
    Error,
    Debug,
}
