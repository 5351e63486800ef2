// Copyright (c) 2024-2026 Tether Contributors
//
// SPDX-License-Identifier: Apache-2.0
//!
//! Input router — inbound peer messages, classified and forwarded.
//!
//! Prompts go to the host's input-injection hook, where they become
//! indistinguishable from terminal keystrokes (the host echoes them
//! back through the normal event stream, so every peer sees them).
//! Confirmation responses go to the arbiter. Anything else is dropped
//! with a debug log; per-frame problems never terminate a peer.

use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use tether_host::HostContext;

use crate::{
    arbiter::{ConfirmationArbiter, ResponseSource},
    codec::{self, InboundAction},
};

pub struct InputRouter {
    host: HostContext,
    arbiter: Arc<ConfirmationArbiter>,
}

impl InputRouter {
    pub fn new(host: HostContext, arbiter: Arc<ConfirmationArbiter>) -> Self {
        Self { host, arbiter }
    }

    /// Handle one raw frame from a framed-socket peer.
    pub async fn handle_frame(&self, peer: Uuid, raw: &[u8]) {
        match codec::parse_client_message(raw) {
            Ok(action) => self.dispatch(peer, action).await,
            Err(e) => debug!(%peer, "dropping malformed frame: {e}"),
        }
    }

    /// Handle an already-parsed JSON body from an HTTP stream endpoint.
    pub async fn handle_value(&self, peer: Uuid, body: serde_json::Value) {
        self.dispatch(peer, codec::classify_value(body)).await;
    }

    async fn dispatch(&self, peer: Uuid, action: InboundAction) {
        match action {
            InboundAction::Prompt(text) => {
                let preview: String = text.chars().take(80).collect();
                let truncated = if text.chars().count() > 80 { "…" } else { "" };
                debug!(%peer, input = %format!("{preview}{truncated}"), "prompt injected by peer");
                if let Err(e) = self.host.inject_input(text).await {
                    warn!(%peer, "could not inject peer input: {e}");
                }
            }
            InboundAction::Confirmation {
                tool_call_id,
                selected_option_id,
            } => {
                self.arbiter
                    .resolve(&tool_call_id, &selected_option_id, ResponseSource::Peer(peer));
            }
            InboundAction::Ignored => {
                debug!(%peer, "ignoring unrecognized peer message");
            }
        }
    }
}

// ── Unit tests ────────────────────────────────────────────────────────────────
