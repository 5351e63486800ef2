// Copyright (c) 2024-2026 Tether Contributors
//
// SPDX-License-Identifier: MIT
//!
//! The contract between a host agent process and the tether bridge.
//!
//! The bridge never talks to the model layer, the tool executor, or the
//! terminal directly. Everything it needs from the host is bundled in a
//! [`HostContext`]:
//!
//! - a broadcast stream of [`HostEvent`]s (model output, raw process
//!   output, console logs, hook boundaries),
//! - a [`MessageBus`] carrying tool-confirmation traffic,
//! - an input-injection hook that feeds text into the host's single
//!   input queue as if it had been typed at the terminal,
//! - the immutable session identifier and the configured port.
//!
//! The context is a plain bundle of channels, so tests construct a fake
//! host with [`HostContext::new`] and drive both sides directly.

mod bus;
mod context;
mod events;

pub use bus::{
    BusMessage, ConfirmationKind, MessageBus, ToolCallPhase, ToolCallState, ToolConfirmation,
};
pub use context::{HostContext, HostError};
pub use events::{ConsoleLevel, HostEvent};
