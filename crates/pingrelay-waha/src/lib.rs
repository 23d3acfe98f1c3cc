// SPDX-FileCopyrightText: 2026 PingRelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WAHA (WhatsApp HTTP API) gateway client.
//!
//! Provides [`WahaClient`] which handles session lifecycle (create, start,
//! stop, delete, QR pairing), group chat discovery, and message delivery
//! with the anti-blocking pacing sequence: mark-seen, simulated typing
//! proportional to message length, then send.

pub mod client;
pub mod pacing;
pub mod types;

pub use client::{WahaClient, chat_id_for_number, normalize_number};
pub use pacing::Pacing;
pub use types::{Chat, SessionMe, SessionStatus, WahaSession};
