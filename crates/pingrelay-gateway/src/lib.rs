// SPDX-FileCopyrightText: 2026 PingRelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP trigger surface for PingRelay.
//!
//! An external cron caller drives the system through `POST /cron/dispatch`
//! and `POST /cron/reconcile`; the dashboard manages phone sessions through
//! the `/phones` routes. Everything except the health endpoint sits behind
//! bearer-token auth.

pub mod auth;
pub mod handlers;
pub mod server;

pub use auth::AuthConfig;
pub use server::{AppState, ServerConfig, build_router, start_server};
