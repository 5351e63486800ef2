// Copyright (c) 2024-2026 Tether Contributors
//
// SPDX-License-Identifier: MIT
//!
//! One connected peer and its bounded outbound queue.
//!
//! The queue is the backpressure boundary of the whole bridge: the
//! broadcaster pushes without ever suspending, and when a peer cannot
//! keep up the oldest frame is evicted. The peer stays connected and
//! keeps receiving newer frames; the host never waits.

use std::{
    collections::VecDeque,
    sync::{Mutex, PoisonError},
};

use tokio::sync::Notify;
use tracing::{debug, warn};
use uuid::Uuid;

/// Which transport a peer is attached to. Peers never migrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// WebSocket carrying null-terminated JSON frames.
    FramedSocket,
    /// One-way HTTP server-sent-event stream.
    Sse,
}

pub struct Peer {
    id: Uuid,
    kind: TransportKind,
    queue: OutboundQueue,
}

impl Peer {
    pub fn new(kind: TransportKind, queue_capacity: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            queue: OutboundQueue::new(queue_capacity),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> TransportKind {
        self.kind
    }

    pub fn queue(&self) -> &OutboundQueue {
        &self.queue
    }

    /// Enqueue one serialized frame for this peer.
    pub fn send(&self, frame: Vec<u8>) {
        match self.queue.push(frame) {
            PushOutcome::Enqueued | PushOutcome::Closed => {}
            PushOutcome::EvictedOldest { total_dropped: 1 } => {
                warn!(peer = %self.id, kind = ?self.kind, "peer is lossy: outbound queue full, dropping oldest frames");
            }
            PushOutcome::EvictedOldest { total_dropped } => {
                debug!(peer = %self.id, total_dropped, "dropped oldest frame");
            }
        }
    }
}

/// Result of [`OutboundQueue::push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Enqueued,
    /// Queue was full; the oldest frame was evicted to make room.
    EvictedOldest { total_dropped: u64 },
    /// Queue is closed; the frame was discarded.
    Closed,
}

/// Bounded drop-oldest FIFO of serialized frames.
///
/// Single producer (the broadcaster's serialized fan-out), single
/// consumer (the peer's writer). `push` never suspends; `pop` parks on
/// a [`Notify`] until a frame or close arrives.
pub struct OutboundQueue {
    capacity: usize,
    state: Mutex<QueueState>,
    notify: Notify,
}

struct QueueState {
    frames: VecDeque<Vec<u8>>,
    closed: bool,
    dropped: u64,
}

impl OutboundQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(QueueState {
                frames: VecDeque::new(),
                closed: false,
                dropped: 0,
            }),
            notify: Notify::new(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, frame: Vec<u8>) -> PushOutcome {
        let outcome = {
            let mut state = self.lock();
            if state.closed {
                return PushOutcome::Closed;
            }
            let outcome = if state.frames.len() == self.capacity {
                state.frames.pop_front();
                state.dropped += 1;
                PushOutcome::EvictedOldest {
                    total_dropped: state.dropped,
                }
            } else {
                PushOutcome::Enqueued
            };
            state.frames.push_back(frame);
            outcome
        };
        self.notify.notify_one();
        outcome
    }

    /// Wait for the next frame. Returns `None` once the queue is closed
    /// and fully drained — pending frames are flushed first.
    pub async fn pop(&self) -> Option<Vec<u8>> {
        loop {
            let notified = self.notify.notified();
            {
                let mut state = self.lock();
                if let Some(frame) = state.frames.pop_front() {
                    return Some(frame);
                }
                if state.closed {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Close the queue. Idempotent; wakes any parked consumer.
    pub fn close(&self) {
        self.lock().closed = true;
        self.notify.notify_waiters();
        self.notify.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Frames evicted so far. Non-zero means the peer is lossy.
    pub fn dropped(&self) -> u64 {
        self.lock().dropped
    }

    pub fn len(&self) -> usize {
        self.lock().frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ── Unit tests ────────────────────────────────────────────────────────────────
