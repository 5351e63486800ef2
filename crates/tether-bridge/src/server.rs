// Copyright (c) 2024-2026 Tether Contributors
//
// SPDX-License-Identifier: MIT
//!
//! Lifecycle controller — assembles the bridge and owns its shutdown.
//!
//! # Startup sequence
//!
//! [`BridgeServer::spawn`] performs these steps in order:
//!
//! 1. Bail out (`Ok(None)`) if no port is configured.
//! 2. Bind the loopback listener (bind errors propagate to the host).
//! 3. Build registry, broadcaster, arbiter and input router.
//! 4. Subscribe the event bus adapter to the host streams.
//! 5. Serve HTTP with graceful shutdown on the cancellation token.
//!
//! # Shutdown
//!
//! [`BridgeServer::stop`] is idempotent: cancel the token (stops the
//! accept loop and the adapter subscriptions), close every peer queue
//! (writers flush what is queued, then their transports end), clear
//! pending confirmations, then await all background tasks. After it
//! returns nothing is written to any peer.

use std::{
    net::{Ipv4Addr, SocketAddr},
    sync::Arc,
    time::Duration,
};

use tokio::{net::TcpListener, sync::Mutex, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use tether_host::HostContext;

use crate::{
    adapter::EventBusAdapter,
    arbiter::ConfirmationArbiter,
    broadcast::Broadcaster,
    card::AgentCard,
    config::BridgeConfig,
    error::BridgeError,
    http::{self, AppState},
    inbound::InputRouter,
    registry::PeerRegistry,
};

/// How long peers get to drain their queues before their connections
/// are torn down during [`BridgeServer::stop`].
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

impl std::fmt::Debug for BridgeServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeServer")
            .field("session_id", &self.session_id)
            .field("local_addr", &self.local_addr)
            .finish_non_exhaustive()
    }
}

pub struct BridgeServer {
    session_id: Arc<str>,
    local_addr: SocketAddr,
    registry: Arc<PeerRegistry>,
    arbiter: Arc<ConfirmationArbiter>,
    shutdown: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl BridgeServer {
    /// Start the bridge for the host's session.
    ///
    /// Returns `Ok(None)` when no port is configured — the host runs
    /// without a bridge. Bind failures propagate so the host can decide
    /// whether to exit.
    pub async fn spawn(
        host: HostContext,
        config: BridgeConfig,
    ) -> Result<Option<Self>, BridgeError> {
        let Some(port) = config.port else {
            debug!("no bridge port configured — session bridge disabled");
            return Ok(None);
        };

        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| BridgeError::Bind(addr, e))?;
        let local_addr = listener.local_addr()?;

        let session_id: Arc<str> = Arc::from(host.session_id());
        let registry = Arc::new(PeerRegistry::new());
        let broadcaster = Arc::new(Broadcaster::new(session_id.clone(), registry.clone()));
        let arbiter = Arc::new(ConfirmationArbiter::new(host.bus().clone()));
        let inbound = Arc::new(InputRouter::new(host.clone(), arbiter.clone()));
        let card = Arc::new(AgentCard::build(&config, local_addr.port()));

        let shutdown = CancellationToken::new();
        let adapter = EventBusAdapter::new(host, broadcaster, arbiter.clone());
        let mut tasks = adapter.spawn(shutdown.clone());

        let app = http::build_router(AppState {
            session_id: session_id.clone(),
            card,
            registry: registry.clone(),
            inbound,
            queue_capacity: config.queue_capacity,
        });

        let server_token = shutdown.clone();
        tasks.push(tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(server_token.cancelled_owned())
                .await;
            if let Err(e) = served {
                error!("bridge HTTP server error: {e}");
            }
        }));

        info!(%local_addr, session = %session_id, "session bridge listening");
        Ok(Some(Self {
            session_id,
            local_addr,
            registry,
            arbiter,
            shutdown,
            tasks: Mutex::new(tasks),
        }))
    }

    /// The bound address. With `port: Some(0)` this carries the
    /// ephemeral port actually chosen.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Number of currently connected peers.
    pub fn peer_count(&self) -> usize {
        self.registry.len()
    }

    /// Stop the bridge. Safe to call more than once.
    ///
    /// Flushing is best-effort: peers that stopped reading get a grace
    /// period, then their connections are torn down.
    pub async fn stop(&self) {
        self.shutdown.cancel();
        self.registry.close_all();
        self.arbiter.clear();

        let deadline = tokio::time::Instant::now() + SHUTDOWN_GRACE;
        let mut tasks = self.tasks.lock().await;
        for mut task in tasks.drain(..) {
            match tokio::time::timeout_at(deadline, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    if !e.is_cancelled() {
                        error!("bridge task ended abnormally: {e}");
                    }
                }
                Err(_) => {
                    task.abort();
                    let _ = task.await;
                }
            }
        }
        info!(session = %self.session_id, "session bridge stopped");
    }
}

// ── Unit tests ────────────────────────────────────────────────────────────────
