// SPDX-FileCopyrightText: 2026 PingRelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state.

use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, post},
};
use pingrelay_core::PingRelayError;
use pingrelay_dispatch::DispatchOptions;
use pingrelay_storage::Database;
use pingrelay_waha::WahaClient;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;

use crate::auth::{AuthConfig, auth_middleware};
use crate::handlers;

/// Shared state for request handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub waha: Arc<WahaClient>,
    pub options: DispatchOptions,
    /// Guards against overlapping dispatch ticks; held for the whole tick.
    pub tick_lock: Arc<Mutex<()>>,
    pub auth: AuthConfig,
}

impl AppState {
    pub fn new(
        db: Arc<Database>,
        waha: Arc<WahaClient>,
        options: DispatchOptions,
        auth: AuthConfig,
    ) -> Self {
        Self {
            db,
            waha,
            options,
            tick_lock: Arc::new(Mutex::new(())),
            auth,
        }
    }
}

/// Server bind configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Builds the full router: a public health endpoint plus authenticated
/// trigger and phone-management routes.
pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new().route("/health", get(handlers::get_health));

    let api_routes = Router::new()
        .route("/cron/dispatch", post(handlers::post_dispatch))
        .route("/cron/reconcile", post(handlers::post_reconcile))
        .route("/phones", post(handlers::post_phones))
        .route("/phones/{id}", delete(handlers::delete_phone))
        .route("/phones/{id}/status", get(handlers::get_phone_status))
        .route("/phones/{id}/start", post(handlers::post_phone_start))
        .route("/phones/{id}/qr", get(handlers::get_phone_qr))
        .route_layer(axum_middleware::from_fn_with_state(
            state.auth.clone(),
            auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(CorsLayer::permissive())
}

/// Binds the configured address and serves until the process exits.
pub async fn start_server(config: &ServerConfig, state: AppState) -> Result<(), PingRelayError> {
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| PingRelayError::Internal(format!("failed to bind {addr}: {e}")))?;

    tracing::info!("listening on {addr}");

    axum::serve(listener, app)
        .await
        .map_err(|e| PingRelayError::Internal(format!("server error: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use pingrelay_core::PhoneStatus;
    use pingrelay_storage::queries::phones;
    use pingrelay_waha::Pacing;
    use serde_json::Value;
    use std::time::Duration;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SECRET: &str = "test-cron-secret";

    async fn test_state(waha_url: &str) -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("gw.db").to_str().unwrap())
            .await
            .unwrap();
        let waha = WahaClient::new(
            waha_url.to_string(),
            None,
            Duration::from_secs(2),
            Pacing::none(),
        )
        .unwrap();
        let state = AppState::new(
            Arc::new(db),
            Arc::new(waha),
            DispatchOptions {
                force_send: false,
                message_delay: (0, 0),
            },
            AuthConfig {
                bearer_token: Some(SECRET.to_string()),
            },
        );
        (state, dir)
    }

    fn authed(request: axum::http::request::Builder) -> axum::http::request::Builder {
        request.header(header::AUTHORIZATION, format!("Bearer {SECRET}"))
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_public() {
        let (state, _dir) = test_state("http://127.0.0.1:9").await;
        let app = build_router(state);

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn dispatch_rejects_missing_and_wrong_tokens() {
        let (state, _dir) = test_state("http://127.0.0.1:9").await;
        let app = build_router(state);

        let response = app
            .clone()
            .oneshot(Request::post("/cron/dispatch").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .oneshot(
                Request::post("/cron/dispatch")
                    .header(header::AUTHORIZATION, "Bearer wrong")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn auth_fails_closed_without_a_secret() {
        let (mut state, _dir) = test_state("http://127.0.0.1:9").await;
        state.auth = AuthConfig { bearer_token: None };
        let app = build_router(state);

        let response = app
            .oneshot(
                Request::post("/cron/dispatch")
                    .header(header::AUTHORIZATION, "Bearer anything")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn dispatch_returns_summary_for_empty_database() {
        let (state, _dir) = test_state("http://127.0.0.1:9").await;
        let app = build_router(state);

        let response = app
            .oneshot(authed(Request::post("/cron/dispatch")).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["processed"], 0);
        assert_eq!(body["messages_sent"], 0);
        assert_eq!(body["errors"], 0);
    }

    #[tokio::test]
    async fn overlapping_dispatch_returns_conflict() {
        let (state, _dir) = test_state("http://127.0.0.1:9").await;
        let lock = state.tick_lock.clone();
        let app = build_router(state);

        // Simulate a tick in flight.
        let _guard = lock.lock().await;

        let response = app
            .oneshot(authed(Request::post("/cron/dispatch")).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(response).await["error"], "tick already in progress");
    }

    #[tokio::test]
    async fn reconcile_returns_summary() {
        let server = MockServer::start().await;
        let (state, _dir) = test_state(&server.uri()).await;
        phones::create_phone(&state.db, "15551234567").await.unwrap();

        Mock::given(method("GET"))
            .and(path("/api/sessions/15551234567"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "15551234567",
                "status": "WORKING",
                "me": {"id": "15551234567@c.us"}
            })))
            .mount(&server)
            .await;

        let app = build_router(state);
        let response = app
            .oneshot(authed(Request::post("/cron/reconcile")).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["checked"], 1);
        assert_eq!(body["updated"], 1);
        assert_eq!(body["errors"], 0);
    }

    #[tokio::test]
    async fn phone_registration_normalizes_the_number() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/sessions"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let (state, _dir) = test_state(&server.uri()).await;
        let db = state.db.clone();
        let app = build_router(state);

        let response = app
            .oneshot(
                authed(Request::post("/phones"))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"number": "+1 (555) 123-4567"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = body_json(response).await;
        assert_eq!(body["number"], "15551234567");
        assert_eq!(body["status"], "disconnected");

        let stored = phones::get_phone_by_number(&db, "15551234567").await.unwrap();
        assert!(stored.is_some());
    }

    #[tokio::test]
    async fn duplicate_phone_registration_conflicts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/sessions"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let (state, _dir) = test_state(&server.uri()).await;
        phones::create_phone(&state.db, "15551234567").await.unwrap();
        let app = build_router(state);

        let response = app
            .oneshot(
                authed(Request::post("/phones"))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"number": "15551234567"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn phone_routes_return_404_for_unknown_ids() {
        let (state, _dir) = test_state("http://127.0.0.1:9").await;
        let app = build_router(state);

        let status = app
            .clone()
            .oneshot(authed(Request::get("/phones/nope/status")).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(status.status(), StatusCode::NOT_FOUND);

        let qr = app
            .clone()
            .oneshot(authed(Request::get("/phones/nope/qr")).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(qr.status(), StatusCode::NOT_FOUND);

        let deleted = app
            .oneshot(authed(Request::delete("/phones/nope")).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(deleted.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn phone_status_reports_live_session() {
        let server = MockServer::start().await;
        let (state, _dir) = test_state(&server.uri()).await;
        let phone = phones::create_phone(&state.db, "15551234567").await.unwrap();

        Mock::given(method("GET"))
            .and(path("/api/sessions/15551234567"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "15551234567",
                "status": "SCAN_QR_CODE"
            })))
            .mount(&server)
            .await;

        let app = build_router(state);
        let response = app
            .oneshot(
                authed(Request::get(format!("/phones/{}/status", phone.id)))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["status"], "SCAN_QR_CODE");
        assert_eq!(body["connected"], false);
    }

    #[tokio::test]
    async fn qr_returns_png_when_session_is_scannable() {
        let server = MockServer::start().await;
        let (state, _dir) = test_state(&server.uri()).await;
        let phone = phones::create_phone(&state.db, "15551234567").await.unwrap();

        Mock::given(method("GET"))
            .and(path("/api/sessions/15551234567"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "15551234567",
                "status": "SCAN_QR_CODE"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/15551234567/auth/qr"))
            .respond_with(
                ResponseTemplate::new(200).set_body_bytes(vec![0x89, b'P', b'N', b'G']),
            )
            .mount(&server)
            .await;

        let app = build_router(state);
        let response = app
            .oneshot(
                authed(Request::get(format!("/phones/{}/qr", phone.id)))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "image/png"
        );
    }

    #[tokio::test]
    async fn qr_rejects_already_connected_phone() {
        let server = MockServer::start().await;
        let (state, _dir) = test_state(&server.uri()).await;
        let phone = phones::create_phone(&state.db, "15551234567").await.unwrap();
        phones::update_phone_status(&state.db, &phone.id, PhoneStatus::Connected)
            .await
            .unwrap();

        Mock::given(method("GET"))
            .and(path("/api/sessions/15551234567"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "15551234567",
                "status": "WORKING",
                "me": {"id": "15551234567@c.us"}
            })))
            .mount(&server)
            .await;

        let app = build_router(state);
        let response = app
            .oneshot(
                authed(Request::get(format!("/phones/{}/qr", phone.id)))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
