// SPDX-FileCopyrightText: 2026 PingRelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request handlers for the trigger and phone-management routes.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use pingrelay_core::PhoneStatus;
use pingrelay_dispatch::{DispatchEngine, reconcile_phone_status};
use pingrelay_storage::queries::phones;
use pingrelay_waha::types::SessionStatus;
use pingrelay_waha::normalize_number;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, warn};

use crate::server::AppState;

fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn internal_error(e: impl std::fmt::Display) -> Response {
    error!(error = %e, "request failed");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
}

/// Unauthenticated liveness endpoint.
pub async fn get_health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Runs one dispatch tick. Returns 409 if a tick is already running.
pub async fn post_dispatch(State(state): State<AppState>) -> Response {
    let Ok(_guard) = state.tick_lock.try_lock() else {
        return json_error(StatusCode::CONFLICT, "tick already in progress");
    };

    let engine = DispatchEngine::new(state.db.clone(), state.waha.clone(), state.options);
    match engine.run_tick().await {
        Ok(summary) => Json(summary).into_response(),
        Err(e) => internal_error(e),
    }
}

/// Reconciles stored phone statuses against live WAHA sessions.
pub async fn post_reconcile(State(state): State<AppState>) -> Response {
    match reconcile_phone_status(&state.db, &state.waha).await {
        Ok(summary) => Json(summary).into_response(),
        Err(e) => internal_error(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatePhoneRequest {
    pub number: String,
}

#[derive(Debug, Serialize)]
struct PhoneResponse {
    id: String,
    number: String,
    status: PhoneStatus,
}

/// Registers a phone and starts its WAHA session.
pub async fn post_phones(
    State(state): State<AppState>,
    Json(request): Json<CreatePhoneRequest>,
) -> Response {
    let number = normalize_number(&request.number);
    if number.is_empty() {
        return json_error(StatusCode::UNPROCESSABLE_ENTITY, "number has no digits");
    }

    match phones::get_phone_by_number(&state.db, &number).await {
        Ok(Some(_)) => return json_error(StatusCode::CONFLICT, "number already registered"),
        Ok(None) => {}
        Err(e) => return internal_error(e),
    }

    let phone = match phones::create_phone(&state.db, &number).await {
        Ok(p) => p,
        Err(e) => return internal_error(e),
    };

    // Session creation is best-effort; the QR flow can start it later.
    if let Err(e) = state.waha.create_session(&number).await {
        warn!(number, error = %e, "session create failed during registration");
    }

    (
        StatusCode::CREATED,
        Json(PhoneResponse {
            id: phone.id,
            number: phone.number,
            status: phone.status,
        }),
    )
        .into_response()
}

/// Removes a phone and its WAHA session.
pub async fn delete_phone(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let phone = match phones::get_phone(&state.db, &id).await {
        Ok(Some(p)) => p,
        Ok(None) => return json_error(StatusCode::NOT_FOUND, "phone not found"),
        Err(e) => return internal_error(e),
    };

    if let Err(e) = state.waha.delete_session(&phone.number).await {
        warn!(number = %phone.number, error = %e, "session delete failed, removing row anyway");
    }
    match phones::delete_phone(&state.db, &id).await {
        Ok(_) => Json(json!({ "deleted": true })).into_response(),
        Err(e) => internal_error(e),
    }
}

/// Reports a phone's live session state.
pub async fn get_phone_status(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let phone = match phones::get_phone(&state.db, &id).await {
        Ok(Some(p)) => p,
        Ok(None) => return json_error(StatusCode::NOT_FOUND, "phone not found"),
        Err(e) => return internal_error(e),
    };

    match state.waha.get_session(&phone.number).await {
        Ok(session) => Json(json!({
            "status": session.status,
            "connected": session.is_connected(),
        }))
        .into_response(),
        Err(_) => Json(json!({ "status": null, "connected": false })).into_response(),
    }
}

/// Starts a phone's WAHA session.
pub async fn post_phone_start(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let phone = match phones::get_phone(&state.db, &id).await {
        Ok(Some(p)) => p,
        Ok(None) => return json_error(StatusCode::NOT_FOUND, "phone not found"),
        Err(e) => return internal_error(e),
    };

    match state.waha.start_session(&phone.number).await {
        Ok(()) => Json(json!({ "started": true })).into_response(),
        Err(e) => json_error(StatusCode::BAD_GATEWAY, &e.to_string()),
    }
}

/// Returns the pairing QR code for a phone as a PNG.
///
/// Ensures a session exists and is headed for `SCAN_QR_CODE` before
/// downloading the image. 400 when the phone is already paired, 422 when
/// the session never becomes scannable in time.
pub async fn get_phone_qr(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let phone = match phones::get_phone(&state.db, &id).await {
        Ok(Some(p)) => p,
        Ok(None) => return json_error(StatusCode::NOT_FOUND, "phone not found"),
        Err(e) => return internal_error(e),
    };

    match state.waha.get_session(&phone.number).await {
        Ok(session) if session.status == SessionStatus::Working => {
            return json_error(StatusCode::BAD_REQUEST, "phone already connected");
        }
        Ok(session) if session.status == SessionStatus::Failed => {
            if let Err(e) = state.waha.start_session(&phone.number).await {
                warn!(number = %phone.number, error = %e, "failed session restart");
            }
        }
        Ok(_) => {}
        // No session yet; create one and fall through to the wait.
        Err(_) => {
            if let Err(e) = state.waha.create_session(&phone.number).await {
                warn!(number = %phone.number, error = %e, "session create failed");
            }
        }
    }

    let session = match state.waha.wait_for_scan(&phone.number).await {
        Ok(s) => s,
        Err(_) => {
            return json_error(
                StatusCode::UNPROCESSABLE_ENTITY,
                "session never became scannable",
            );
        }
    };
    if session.status == SessionStatus::Working {
        return json_error(StatusCode::BAD_REQUEST, "phone already connected");
    }

    match state.waha.download_qr(&phone.number).await {
        Ok(bytes) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "image/png")],
            bytes,
        )
            .into_response(),
        Err(e) => json_error(StatusCode::BAD_GATEWAY, &e.to_string()),
    }
}
