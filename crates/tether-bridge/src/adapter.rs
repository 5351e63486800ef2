// Copyright (c) 2024-2026 Tether Contributors
//
// SPDX-License-Identifier: Apache-2.0
//!
//! Event bus adapter — normalizes host traffic into canonical events.
//!
//! Two loops run until shutdown: one over the host's event stream
//! (model output, raw process output, console logs, hooks) and one over
//! the tool message bus (confirmation requests, tool-call state
//! batches). Both are broadcast subscriptions, so a burst beyond channel
//! capacity surfaces as `Lagged` — the adapter logs the lost count and
//! keeps going rather than stalling the host.
//!
//! The adapter also feeds the confirmation arbiter: a confirmation
//! request is tracked *before* its event is broadcast, so the fastest
//! peer cannot answer a confirmation the arbiter has never seen. A
//! tool call observed leaving the awaiting-approval phase means some
//! other participant (usually the terminal dialog) already decided, and
//! the pending entry is discarded.

use std::sync::Arc;

use tokio::{sync::broadcast, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use tether_host::{
    BusMessage, ConfirmationKind, HostContext, HostEvent, ToolCallPhase, ToolCallState,
    ToolConfirmation,
};

use crate::{
    arbiter::ConfirmationArbiter,
    broadcast::Broadcaster,
    event::{
        ConfirmationDetails, ConfirmationRequest, EventPayload, HookPhase, ToolCallResult,
        ToolCallStatus, ToolCallUpdate,
    },
};

pub struct EventBusAdapter {
    host: HostContext,
    broadcaster: Arc<Broadcaster>,
    arbiter: Arc<ConfirmationArbiter>,
}

impl EventBusAdapter {
    pub fn new(
        host: HostContext,
        broadcaster: Arc<Broadcaster>,
        arbiter: Arc<ConfirmationArbiter>,
    ) -> Self {
        Self {
            host,
            broadcaster,
            arbiter,
        }
    }

    /// Spawn the two subscription loops. They exit when the token is
    /// cancelled or the host side of a stream closes.
    pub fn spawn(self, shutdown: CancellationToken) -> Vec<JoinHandle<()>> {
        let events = self.host.subscribe_events();
        let bus = self.host.bus().subscribe();
        vec![
            tokio::spawn(run_event_loop(events, self.broadcaster.clone(), shutdown.clone())),
            tokio::spawn(run_bus_loop(bus, self.broadcaster, self.arbiter, shutdown)),
        ]
    }
}

async fn run_event_loop(
    mut rx: broadcast::Receiver<HostEvent>,
    broadcaster: Arc<Broadcaster>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            result = rx.recv() => match result {
                Ok(event) => broadcaster.broadcast(map_host_event(event)),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("host event stream lagged — {n} events lost to peers");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    error!("host event stream closed; no further events will reach peers");
                    break;
                }
            }
        }
    }
}

async fn run_bus_loop(
    mut rx: broadcast::Receiver<BusMessage>,
    broadcaster: Arc<Broadcaster>,
    arbiter: Arc<ConfirmationArbiter>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            result = rx.recv() => match result {
                Ok(BusMessage::ToolConfirmationRequest(confirmation)) => {
                    // Track first: a peer may answer the very frame we
                    // are about to send.
                    arbiter.track(&confirmation);
                    broadcaster.broadcast(confirmation_update(&confirmation));
                }
                Ok(BusMessage::ToolCallsUpdate(batch)) => {
                    for state in batch {
                        if state.phase != ToolCallPhase::AwaitingApproval {
                            // Left the approval phase without us: the
                            // terminal (or a cancel) already decided.
                            arbiter.discard(&state.id);
                        }
                        broadcaster.broadcast(map_tool_call_state(state));
                    }
                }
                Ok(BusMessage::ToolConfirmationResponse { correlation_id, .. }) => {
                    // Someone answered — possibly the terminal dialog,
                    // possibly us. Either way the entry is spent.
                    arbiter.discard(&correlation_id);
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("host message bus lagged — {n} messages lost to peers");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    error!("host message bus closed; tool updates will no longer reach peers");
                    break;
                }
            }
        }
    }
}

// ── Mapping ───────────────────────────────────────────────────────────────────

/// One host event → one canonical payload. Total: every host event has
/// a peer-visible form.
fn map_host_event(event: HostEvent) -> EventPayload {
    match event {
        HostEvent::Thought {
            subject,
            description,
        } => EventPayload::Thought {
            subject,
            description,
        },
        HostEvent::Content { text } => EventPayload::TextContent {
            text,
            is_stderr: None,
        },
        HostEvent::ToolCallRequest { id, name, args } => {
            EventPayload::ToolCallUpdate(ToolCallUpdate {
                tool_call_id: id,
                tool_name: name,
                status: ToolCallStatus::Pending,
                input_parameters: Some(args),
                live_content: None,
                result: None,
                confirmation_request: None,
            })
        }
        HostEvent::Output { chunk, is_stderr } => EventPayload::TextContent {
            text: String::from_utf8_lossy(&chunk).into_owned(),
            is_stderr: Some(is_stderr),
        },
        HostEvent::ConsoleLog { level, content } => EventPayload::ConsoleLog { level, content },
        HostEvent::HookStart { name } => EventPayload::Hook {
            hook_name: name,
            phase: HookPhase::Start,
            success: None,
        },
        HostEvent::HookEnd { name, success } => EventPayload::Hook {
            hook_name: name,
            phase: HookPhase::End,
            success: Some(success),
        },
    }
}

/// Executor phase → wire status. Phases this bridge does not model
/// (scheduled, validating, future additions) read as PENDING.
fn map_phase(phase: ToolCallPhase) -> ToolCallStatus {
    match phase {
        ToolCallPhase::AwaitingApproval => ToolCallStatus::Pending,
        ToolCallPhase::Executing => ToolCallStatus::Executing,
        ToolCallPhase::Success => ToolCallStatus::Succeeded,
        ToolCallPhase::Error => ToolCallStatus::Failed,
        ToolCallPhase::Cancelled => ToolCallStatus::Cancelled,
        ToolCallPhase::Scheduled | ToolCallPhase::Validating => ToolCallStatus::Pending,
    }
}

fn map_tool_call_state(state: ToolCallState) -> EventPayload {
    let status = map_phase(state.phase);
    let result = match status {
        ToolCallStatus::Succeeded => Some(ToolCallResult::success(
            state.display.unwrap_or_else(|| "Success".to_string()),
        )),
        ToolCallStatus::Failed => Some(ToolCallResult::failure(
            state.error.unwrap_or_else(|| "Unknown error".to_string()),
        )),
        _ => None,
    };
    EventPayload::ToolCallUpdate(ToolCallUpdate {
        tool_call_id: state.id,
        tool_name: state.name,
        status,
        input_parameters: state.args,
        live_content: state.live_output,
        result,
        confirmation_request: None,
    })
}

fn confirmation_update(confirmation: &ToolConfirmation) -> EventPayload {
    EventPayload::ToolCallUpdate(ToolCallUpdate {
        tool_call_id: confirmation.correlation_id.clone(),
        tool_name: confirmation.tool_name.clone(),
        status: ToolCallStatus::Pending,
        input_parameters: None,
        live_content: None,
        result: None,
        confirmation_request: Some(ConfirmationRequest::new(map_details(&confirmation.kind))),
    })
}

fn map_details(kind: &ConfirmationKind) -> ConfirmationDetails {
    match kind {
        ConfirmationKind::Execute { command } => ConfirmationDetails::Execute {
            command: command.clone(),
        },
        ConfirmationKind::Edit {
            file_name,
            file_path,
            old_content,
            new_content,
            diff,
        } => ConfirmationDetails::FileEdit {
            file_name: file_name.clone(),
            file_path: file_path.clone(),
            old_content: old_content.clone(),
            new_content: new_content.clone(),
            formatted_diff: diff.clone(),
        },
        ConfirmationKind::Mcp {
            server_name,
            tool_name,
        } => ConfirmationDetails::Mcp {
            server_name: server_name.clone(),
            tool_name: tool_name.clone(),
        },
        ConfirmationKind::Other { title } => ConfirmationDetails::Generic {
            description: title
                .clone()
                .unwrap_or_else(|| "Tool confirmation required".to_string()),
        },
    }
}

// ── Unit tests ────────────────────────────────────────────────────────────────
