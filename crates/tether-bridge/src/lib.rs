// Copyright (c) 2024-2026 Tether Contributors
//
// SPDX-License-Identifier: MIT
//!
//! tether-bridge — exposes a live agent session to local peers.
//!
//! The bridge embeds in a terminal agent process and serves the host's
//! single session over two loopback transports: a WebSocket carrying
//! null-terminated JSON frames and an HTTP server-sent-event stream.
//! Peers observe every event the host produces and can inject prompts
//! or answer tool confirmations, exactly as if seated at the terminal.
//!
//! # Data flow
//!
//! ```text
//! host events ──► EventBusAdapter ──► Broadcaster ──► PeerRegistry
//!                                                        │ per-peer queue
//!                                                        ▼
//!                                               ws writer / sse stream
//!
//! peer frame ──► codec ──► InputRouter ──┬─► HostContext::inject_input
//!                                        └─► ConfirmationArbiter ──► bus
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! # use tether_bridge::{BridgeConfig, BridgeServer};
//! # use tether_host::HostContext;
//! # async fn example() -> Result<(), tether_bridge::BridgeError> {
//! let (host, _input_rx) = HostContext::new("session-1", Some(41243));
//! let config = BridgeConfig {
//!     port: host.port(),
//!     ..BridgeConfig::default()
//! };
//! if let Some(bridge) = BridgeServer::spawn(host, config).await? {
//!     // ... session runs ...
//!     bridge.stop().await;
//! }
//! # Ok(())
//! # }
//! ```

mod adapter;
mod arbiter;
mod broadcast;
mod card;
mod codec;
mod config;
mod error;
mod event;
mod http;
mod inbound;
mod peer;
mod registry;
mod server;

pub use arbiter::{ConfirmationArbiter, Resolution, ResponseSource};
pub use card::{AgentCard, AgentCapabilities, AgentExtension, AgentSkill, PROTOCOL_VERSION};
pub use config::BridgeConfig;
pub use error::BridgeError;
pub use event::{
    ConfirmationDetails, ConfirmationOption, ConfirmationRequest, EventPayload, HookPhase,
    ResultError, ResultOutput, SessionEvent, ToolCallResult, ToolCallStatus, ToolCallUpdate,
    OPTION_CANCEL, OPTION_PROCEED_ONCE,
};
pub use peer::TransportKind;
pub use server::BridgeServer;
