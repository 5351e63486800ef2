// Copyright (c) 2024-2026 Tether Contributors
//
// SPDX-License-Identifier: MIT
//!
//! The fan-out engine.
//!
//! Stamps the session identifier on each payload, serializes once per
//! transport kind, then enqueues on every registered peer. Serialization
//! happens before touching any peer, and enqueueing never suspends — a
//! slow peer loses old frames instead of delaying anyone.

use std::sync::Arc;

use tracing::error;

use crate::{
    codec,
    event::{EventPayload, SessionEvent},
    peer::TransportKind,
    registry::PeerRegistry,
};

pub struct Broadcaster {
    session_id: Arc<str>,
    registry: Arc<PeerRegistry>,
}

impl Broadcaster {
    pub fn new(session_id: Arc<str>, registry: Arc<PeerRegistry>) -> Self {
        Self {
            session_id,
            registry,
        }
    }

    /// Deliver one event to every registered peer, in call order.
    pub fn broadcast(&self, payload: EventPayload) {
        let event = SessionEvent {
            task_id: self.session_id.to_string(),
            payload,
        };

        let socket_frame = match codec::socket_frame(&event) {
            Ok(frame) => frame,
            Err(e) => {
                error!("could not serialize event for socket peers: {e}");
                return;
            }
        };
        let sse_frame = match codec::sse_frame(&event) {
            Ok(frame) => frame.into_bytes(),
            Err(e) => {
                error!("could not serialize event for sse peers: {e}");
                return;
            }
        };

        for peer in self.registry.snapshot() {
            match peer.kind() {
                TransportKind::FramedSocket => peer.send(socket_frame.clone()),
                TransportKind::Sse => peer.send(sse_frame.clone()),
            }
        }
    }
}

// ── Unit tests ────────────────────────────────────────────────────────────────
