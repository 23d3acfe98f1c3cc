// SPDX-FileCopyrightText: 2026 PingRelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the PingRelay message scheduler.
//!
//! This crate provides the shared error type, the domain enums used across
//! the workspace (statuses, structured error codes, message timing specs),
//! and the bounded-retry combinator used for gateway polling.

pub mod error;
pub mod retry;
pub mod types;

pub use error::PingRelayError;
pub use retry::retry;
pub use types::{
    DeliveryStatus, ErrorCode, PhoneStatus, ScheduleStatus, TimingSpec, VariableEntry,
};
