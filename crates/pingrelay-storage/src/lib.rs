// SPDX-FileCopyrightText: 2026 PingRelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for PingRelay.
//!
//! All data lives in one SQLite file accessed through a single background
//! writer thread ([`tokio_rusqlite`]). Schema changes are embedded refinery
//! migrations applied on open. Query modules expose typed async functions;
//! nothing outside this crate writes SQL.

pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

pub use database::Database;
pub use models::{
    Delivery, DeliveryLog, DeliveryStats, EmbeddedMessage, EmbeddedSendingTime, MessageRow,
    MessageSnapshot, Phone, ResolvedMessage, Schedule, Template,
};
