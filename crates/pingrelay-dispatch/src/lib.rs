// SPDX-FileCopyrightText: 2026 PingRelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tick-driven dispatch of scheduled messages.
//!
//! Each tick walks every active schedule, resolves its template, derives
//! which messages are due from the event date, and sends them through the
//! WAHA gateway, recording every attempt in the delivery ledger. The tick
//! is idempotent: already-sent messages are skipped, failures stay
//! retryable, and no due-time state is cached between ticks.

pub mod calculator;
pub mod engine;
pub mod reconcile;
pub mod substitute;

pub use calculator::{due_at, is_due};
pub use engine::{DispatchEngine, DispatchOptions, TickSummary};
pub use reconcile::{ReconcileSummary, reconcile_phone_status};
pub use substitute::substitute;
