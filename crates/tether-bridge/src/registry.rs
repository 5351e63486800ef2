// Copyright (c) 2024-2026 Tether Contributors
//
// SPDX-License-Identifier: MIT
//!
//! The live peer set.
//!
//! Register a peer only once its transport is confirmed open (the
//! WebSocket upgrade completed, the SSE response is about to stream).
//! Broadcast iterates over a snapshot, so a peer unregistering
//! mid-broadcast is safe: it may receive one final frame, never a
//! use-after-free.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::info;
use uuid::Uuid;

use crate::peer::Peer;

#[derive(Default)]
pub struct PeerRegistry {
    peers: DashMap<Uuid, Arc<Peer>>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit an open peer. Returns its identifier.
    pub fn register(&self, peer: Arc<Peer>) -> Uuid {
        let id = peer.id();
        info!(peer = %id, kind = ?peer.kind(), "peer connected");
        self.peers.insert(id, peer);
        id
    }

    /// Remove a peer and close its queue. No-op for unknown ids, so
    /// shutdown and transport-close paths can race freely.
    pub fn unregister(&self, id: &Uuid) {
        if let Some((_, peer)) = self.peers.remove(id) {
            peer.queue().close();
            info!(
                peer = %id,
                kind = ?peer.kind(),
                dropped = peer.queue().dropped(),
                "peer disconnected"
            );
        }
    }

    /// Snapshot of the current peer set, for lock-free iteration.
    pub fn snapshot(&self) -> Vec<Arc<Peer>> {
        self.peers.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Close every queue and empty the set. Used at shutdown.
    pub fn close_all(&self) {
        for entry in self.peers.iter() {
            entry.value().queue().close();
        }
        self.peers.clear();
    }
}

// ── Unit tests ────────────────────────────────────────────────────────────────
