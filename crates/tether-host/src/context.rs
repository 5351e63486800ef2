// Copyright (c) 2024-2026 Tether Contributors
//
// SPDX-License-Identifier: MIT
//!
//! `HostContext` — the single object a host hands to the bridge.
//!
//! # Design
//!
//! ```text
//!   host agent ──► emit(HostEvent) ──► broadcast ──► bridge adapter
//!   tool executor ──► bus.publish ──► broadcast ──► bridge adapter
//!   bridge router ──► inject_input ──► mpsc ──► host input queue
//! ```
//!
//! The context is cheap to clone; every clone refers to the same
//! channels and the same immutable session identifier. The receiver half
//! of the input hook is returned once from [`HostContext::new`] and
//! belongs to the host's input loop — text arriving there must be
//! indistinguishable from text typed at the terminal.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{broadcast, mpsc};

use crate::{bus::MessageBus, events::HostEvent};

/// Capacity of the host event broadcast channel.
const EVENT_CAPACITY: usize = 1024;
/// Capacity of the input-injection queue. Injection is a suspension
/// point; a full queue applies backpressure to the injecting peer only.
const INPUT_CAPACITY: usize = 64;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("host input queue is closed")]
    InputClosed,
}

/// Everything the bridge is allowed to see of its host.
#[derive(Clone)]
pub struct HostContext {
    session_id: Arc<str>,
    port: Option<u16>,
    events: broadcast::Sender<HostEvent>,
    bus: MessageBus,
    input_tx: mpsc::Sender<String>,
}

impl HostContext {
    /// Build a context for one session.
    ///
    /// Returns the context and the receiver half of the input-injection
    /// hook. The host (or a test standing in for it) reads injected text
    /// from the receiver and feeds it through its normal input path.
    pub fn new(
        session_id: impl Into<String>,
        port: Option<u16>,
    ) -> (Self, mpsc::Receiver<String>) {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (input_tx, input_rx) = mpsc::channel(INPUT_CAPACITY);
        let ctx = Self {
            session_id: session_id.into().into(),
            port,
            events,
            bus: MessageBus::default(),
            input_tx,
        };
        (ctx, input_rx)
    }

    /// The opaque session identifier, fixed for the process lifetime.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// The configured bridge port. `None` disables the bridge.
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Host side: emit one event to every subscriber.
    pub fn emit(&self, event: HostEvent) {
        // No subscribers is fine — the bridge may not be up yet.
        let _ = self.events.send(event);
    }

    /// Bridge side: subscribe to the host event stream.
    pub fn subscribe_events(&self) -> broadcast::Receiver<HostEvent> {
        self.events.subscribe()
    }

    /// The tool message bus shared by host and bridge.
    pub fn bus(&self) -> &MessageBus {
        &self.bus
    }

    /// Bridge side: inject peer-originated text into the host's input
    /// queue, exactly as if it had been typed at the terminal.
    pub async fn inject_input(&self, text: String) -> Result<(), HostError> {
        self.input_tx
            .send(text)
            .await
            .map_err(|_| HostError::InputClosed)
    }
}

// ── Unit tests ────────────────────────────────────────────────────────────────
