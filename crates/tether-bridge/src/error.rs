// Copyright (c) 2024-2026 Tether Contributors
//
// SPDX-License-Identifier: Apache-2.0
use std::net::SocketAddr;

use thiserror::Error;

/// Errors surfaced from bridge startup and shutdown.
///
/// Everything per-peer or per-frame is handled internally (unregister,
/// drop, log) and never reaches this type.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("could not bind {0}: {1}")]
    Bind(SocketAddr, #[source] std::io::Error),

    #[error("HTTP server error: {0}")]
    Http(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
