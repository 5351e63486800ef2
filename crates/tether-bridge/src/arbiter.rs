// Copyright (c) 2024-2026 Tether Contributors
//
// SPDX-License-Identifier: Apache-2.0
//!
//! Confirmation arbiter — at most one answer per tool confirmation.
//!
//! Every participant (terminal dialog, any connected peer) may answer a
//! pending confirmation; the first answer wins for everyone. The map is
//! keyed by correlation identifier and each resolution is an atomic
//! test-and-clear: whoever removes the entry publishes the response,
//! everyone else gets [`Resolution::Duplicate`] and stays silent.
//! Duplicates are the expected outcome of a race, not an error.
//!
//! The bus publish happens after the entry is removed, outside any lock.

use dashmap::DashMap;
use tracing::{debug, info};
use uuid::Uuid;

use tether_host::{BusMessage, MessageBus, ToolConfirmation};

use crate::event::OPTION_PROCEED_ONCE;

/// Who answered a confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    /// A connected bridge peer.
    Peer(Uuid),
    /// The host's own terminal dialog.
    Terminal,
}

/// Outcome of [`ConfirmationArbiter::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// This call won the race; a response was published to the host bus.
    Published { confirmed: bool },
    /// The confirmation was already resolved (or never existed).
    Duplicate,
}

struct Pending {
    tool_name: String,
}

pub struct ConfirmationArbiter {
    bus: MessageBus,
    pending: DashMap<String, Pending>,
}

impl ConfirmationArbiter {
    pub fn new(bus: MessageBus) -> Self {
        Self {
            bus,
            pending: DashMap::new(),
        }
    }

    /// Start tracking a confirmation the host just requested.
    pub fn track(&self, confirmation: &ToolConfirmation) {
        self.pending.insert(
            confirmation.correlation_id.clone(),
            Pending {
                tool_name: confirmation.tool_name.clone(),
            },
        );
    }

    /// Answer a pending confirmation. First caller per correlation id
    /// wins; `proceed_once` is the sole affirmative option, every other
    /// id (including unknown ones) counts as cancel.
    pub fn resolve(
        &self,
        correlation_id: &str,
        option_id: &str,
        source: ResponseSource,
    ) -> Resolution {
        let Some((_, pending)) = self.pending.remove(correlation_id) else {
            debug!(
                correlation = correlation_id,
                ?source,
                "confirmation already resolved or unknown — ignoring"
            );
            return Resolution::Duplicate;
        };

        let confirmed = option_id == OPTION_PROCEED_ONCE;
        info!(
            correlation = correlation_id,
            tool = %pending.tool_name,
            option = option_id,
            confirmed,
            ?source,
            "tool confirmation resolved"
        );
        self.bus.publish(BusMessage::ToolConfirmationResponse {
            correlation_id: correlation_id.to_string(),
            confirmed,
        });
        Resolution::Published { confirmed }
    }

    /// Forget a pending confirmation without publishing anything — the
    /// host resolved or cancelled it on its own.
    pub fn discard(&self, correlation_id: &str) -> bool {
        self.pending.remove(correlation_id).is_some()
    }

    /// Drop every pending entry. Used at shutdown.
    pub fn clear(&self) {
        self.pending.clear();
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

// ── Unit tests ────────────────────────────────────────────────────────────────
