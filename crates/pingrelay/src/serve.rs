// SPDX-FileCopyrightText: 2026 PingRelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subcommand implementations.

use std::sync::Arc;
use std::time::Duration;

use pingrelay_config::PingRelayConfig;
use pingrelay_core::PingRelayError;
use pingrelay_dispatch::{DispatchEngine, DispatchOptions, reconcile_phone_status};
use pingrelay_gateway::{AppState, AuthConfig, ServerConfig, start_server};
use pingrelay_storage::Database;
use pingrelay_waha::{Pacing, WahaClient};

struct Context {
    db: Arc<Database>,
    waha: Arc<WahaClient>,
    options: DispatchOptions,
}

async fn build_context(config: &PingRelayConfig) -> Result<Context, PingRelayError> {
    let db = Database::open(&config.storage.database_path).await?;
    let waha = WahaClient::new(
        config.waha.base_url.clone(),
        config.waha.api_key.as_deref(),
        Duration::from_secs(config.waha.http_timeout_secs),
        Pacing::standard(),
    )?;
    let options = DispatchOptions {
        force_send: config.scheduler.force_send,
        message_delay: (
            config.scheduler.message_delay_min_secs,
            config.scheduler.message_delay_max_secs,
        ),
    };
    Ok(Context {
        db: Arc::new(db),
        waha: Arc::new(waha),
        options,
    })
}

/// Runs the HTTP trigger server until the process is stopped.
pub async fn run_serve(config: &PingRelayConfig) -> Result<(), PingRelayError> {
    let ctx = build_context(config).await?;
    let state = AppState::new(
        ctx.db,
        ctx.waha,
        ctx.options,
        AuthConfig {
            bearer_token: config.scheduler.cron_secret.clone(),
        },
    );
    let server_config = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
    };
    start_server(&server_config, state).await
}

/// Runs one dispatch tick from the CLI and prints the summary.
pub async fn run_tick_once(config: &PingRelayConfig, force: bool) -> Result<(), PingRelayError> {
    let mut ctx = build_context(config).await?;
    if force {
        ctx.options.force_send = true;
    }
    let engine = DispatchEngine::new(ctx.db.clone(), ctx.waha.clone(), ctx.options);
    let summary = engine.run_tick().await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&summary)
            .map_err(|e| PingRelayError::Internal(e.to_string()))?
    );
    ctx.db.close().await
}

/// Runs one reconciliation pass from the CLI and prints the summary.
pub async fn run_reconcile_once(config: &PingRelayConfig) -> Result<(), PingRelayError> {
    let ctx = build_context(config).await?;
    let summary = reconcile_phone_status(&ctx.db, &ctx.waha).await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&summary)
            .map_err(|e| PingRelayError::Internal(e.to_string()))?
    );
    ctx.db.close().await
}
