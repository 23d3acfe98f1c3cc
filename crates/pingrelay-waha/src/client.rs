// SPDX-FileCopyrightText: 2026 PingRelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the WAHA gateway.
//!
//! Provides [`WahaClient`] which handles session lifecycle, QR pairing,
//! group chat lookup, and paced message delivery.

use std::time::Duration;

use pingrelay_core::{PingRelayError, retry};
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::json;
use tracing::{debug, warn};

use crate::pacing::Pacing;
use crate::types::{Chat, SessionStatus, WahaSession};

/// Attempts made while waiting for a QR scan, one second apart.
const SCAN_WAIT_ATTEMPTS: u32 = 15;

/// HTTP client for WAHA session and messaging endpoints.
///
/// One session per phone; session names are the phone number with
/// everything except digits stripped.
#[derive(Debug, Clone)]
pub struct WahaClient {
    http: reqwest::Client,
    base_url: String,
    pacing: Pacing,
}

/// Strips a phone number down to its digits, which is the WAHA session name.
pub fn normalize_number(number: &str) -> String {
    number.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Turns a normalized number into a WhatsApp chat id.
pub fn chat_id_for_number(number: &str) -> String {
    format!("{}@c.us", normalize_number(number))
}

impl WahaClient {
    /// Creates a new WAHA client.
    ///
    /// # Arguments
    /// * `base_url` - WAHA server base URL, e.g. `http://localhost:3000`
    /// * `api_key` - optional `X-Api-Key` value
    /// * `timeout` - per-request timeout
    /// * `pacing` - delay profile for the send sequence
    pub fn new(
        base_url: String,
        api_key: Option<&str>,
        timeout: Duration,
        pacing: Pacing,
    ) -> Result<Self, PingRelayError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = api_key {
            headers.insert(
                "X-Api-Key",
                HeaderValue::from_str(key)
                    .map_err(|e| PingRelayError::Config(format!("invalid WAHA API key: {e}")))?,
            );
        }
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| {
                PingRelayError::gateway(format!("failed to build HTTP client: {e}"), Box::new(e))
            })?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            pacing,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn post_json(&self, path: &str, body: &serde_json::Value) -> Result<(), PingRelayError> {
        let response = self
            .http
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| {
                PingRelayError::gateway(format!("POST {path} failed: {e}"), Box::new(e))
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let text = response.text().await.unwrap_or_default();
        Err(PingRelayError::gateway_msg(format!(
            "POST {path} returned {status}: {text}"
        )))
    }

    /// Like [`post_json`](Self::post_json) but hands back the raw response
    /// body, which callers persist for auditing.
    async fn post_json_text(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<String, PingRelayError> {
        let response = self
            .http
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| {
                PingRelayError::gateway(format!("POST {path} failed: {e}"), Box::new(e))
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            PingRelayError::gateway(format!("failed to read {path} response: {e}"), Box::new(e))
        })?;
        if status.is_success() {
            return Ok(text);
        }
        Err(PingRelayError::gateway_msg(format!(
            "POST {path} returned {status}: {text}"
        )))
    }

    // --- session lifecycle ---

    /// Creates (and starts) a session for the given phone number.
    pub async fn create_session(&self, number: &str) -> Result<(), PingRelayError> {
        let name = normalize_number(number);
        self.post_json("/api/sessions", &json!({"name": name, "start": true}))
            .await
    }

    /// Fetches the current session state for a phone number.
    pub async fn get_session(&self, number: &str) -> Result<WahaSession, PingRelayError> {
        let name = normalize_number(number);
        let path = format!("/api/sessions/{name}");
        let response = self.http.get(self.url(&path)).send().await.map_err(|e| {
            PingRelayError::gateway(format!("GET {path} failed: {e}"), Box::new(e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(PingRelayError::gateway_msg(format!(
                "GET {path} returned {status}: {text}"
            )));
        }
        response.json::<WahaSession>().await.map_err(|e| {
            PingRelayError::gateway(format!("invalid session response: {e}"), Box::new(e))
        })
    }

    /// Starts a stopped or failed session.
    pub async fn start_session(&self, number: &str) -> Result<(), PingRelayError> {
        let name = normalize_number(number);
        self.post_json(&format!("/api/sessions/{name}/start"), &json!({}))
            .await
    }

    /// Stops a running session without logging it out.
    pub async fn stop_session(&self, number: &str) -> Result<(), PingRelayError> {
        let name = normalize_number(number);
        self.post_json(&format!("/api/sessions/{name}/stop"), &json!({}))
            .await
    }

    /// Logs out and deletes a session.
    pub async fn delete_session(&self, number: &str) -> Result<(), PingRelayError> {
        let name = normalize_number(number);
        let path = format!("/api/sessions/{name}");
        let response = self.http.delete(self.url(&path)).send().await.map_err(|e| {
            PingRelayError::gateway(format!("DELETE {path} failed: {e}"), Box::new(e))
        })?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let text = response.text().await.unwrap_or_default();
        Err(PingRelayError::gateway_msg(format!(
            "DELETE {path} returned {status}: {text}"
        )))
    }

    /// Downloads the pairing QR code as a PNG image.
    pub async fn download_qr(&self, number: &str) -> Result<Vec<u8>, PingRelayError> {
        let name = normalize_number(number);
        let path = format!("/api/{name}/auth/qr");
        let response = self
            .http
            .get(self.url(&path))
            .query(&[("format", "image")])
            .send()
            .await
            .map_err(|e| {
                PingRelayError::gateway(format!("GET {path} failed: {e}"), Box::new(e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(PingRelayError::gateway_msg(format!(
                "GET {path} returned {status}: {text}"
            )));
        }
        let bytes = response.bytes().await.map_err(|e| {
            PingRelayError::gateway(format!("failed to read QR image: {e}"), Box::new(e))
        })?;
        Ok(bytes.to_vec())
    }

    /// Polls until the session is scannable (or already paired).
    ///
    /// Checks once per second for up to 15 seconds, returning as soon as the
    /// session reports `SCAN_QR_CODE` or `WORKING`. A session that lands in
    /// `FAILED` is restarted before the next poll.
    pub async fn wait_for_scan(&self, number: &str) -> Result<WahaSession, PingRelayError> {
        retry(
            move |attempt| async move {
                let session = self.get_session(number).await?;
                debug!(number, attempt, status = ?session.status, "waiting for scan");
                match session.status {
                    SessionStatus::ScanQrCode | SessionStatus::Working => Ok(session),
                    SessionStatus::Failed => {
                        if let Err(e) = self.start_session(number).await {
                            warn!(number, error = %e, "failed to restart failed session");
                        }
                        Err(PingRelayError::gateway_msg("session failed, restarting"))
                    }
                    _ => Err(PingRelayError::Timeout {
                        duration: Duration::from_secs(1),
                    }),
                }
            },
            SCAN_WAIT_ATTEMPTS,
            |_| Duration::from_secs(1),
        )
        .await
    }

    // --- chats ---

    /// Lists all chats for a session.
    ///
    /// Gateway errors are downgraded to an empty list; callers treat a
    /// missing group as a lookup miss, not a hard failure.
    pub async fn get_chats(&self, number: &str) -> Vec<Chat> {
        let name = normalize_number(number);
        let path = format!("/api/{name}/chats");
        let response = match self.http.get(self.url(&path)).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(number, error = %e, "chat list request failed");
                return Vec::new();
            }
        };
        if !response.status().is_success() {
            warn!(number, status = %response.status(), "chat list returned error");
            return Vec::new();
        }
        match response.json::<Vec<Chat>>().await {
            Ok(chats) => chats,
            Err(e) => {
                warn!(number, error = %e, "failed to parse chat list");
                Vec::new()
            }
        }
    }

    /// Finds a group chat id by its exact display name.
    ///
    /// The comparison is case-sensitive; "Launch Group" and "launch group"
    /// are different groups.
    pub async fn find_group_id(&self, number: &str, group_name: &str) -> Option<String> {
        self.get_chats(number)
            .await
            .iter()
            .filter_map(Chat::as_group)
            .find(|(_, subject)| *subject == group_name)
            .map(|(id, _)| id.to_string())
    }

    // --- messaging ---

    async fn send_seen(&self, session: &str, chat_id: &str) {
        let body = json!({"session": session, "chatId": chat_id});
        if let Err(e) = self.post_json("/api/sendSeen", &body).await {
            warn!(session, chat_id, error = %e, "sendSeen failed");
        }
    }

    async fn start_typing(&self, session: &str, chat_id: &str) {
        let body = json!({"session": session, "chatId": chat_id});
        if let Err(e) = self.post_json("/api/startTyping", &body).await {
            warn!(session, chat_id, error = %e, "startTyping failed");
        }
    }

    async fn stop_typing(&self, session: &str, chat_id: &str) {
        let body = json!({"session": session, "chatId": chat_id});
        if let Err(e) = self.post_json("/api/stopTyping", &body).await {
            warn!(session, chat_id, error = %e, "stopTyping failed");
        }
    }

    async fn send_text_raw(
        &self,
        session: &str,
        chat_id: &str,
        text: &str,
    ) -> Result<String, PingRelayError> {
        let body = json!({"session": session, "chatId": chat_id, "text": text});
        self.post_json_text("/api/sendText", &body).await
    }

    /// Sends a text message with the full pacing sequence.
    ///
    /// Sequence: mark seen, pause, start typing, length-based typing delay,
    /// stop typing, short pause, send. The presence steps are best-effort;
    /// if the paced send itself fails, one plain send is attempted before
    /// giving up. Returns the gateway's raw response body.
    pub async fn send_text(
        &self,
        number: &str,
        chat_id: &str,
        text: &str,
    ) -> Result<String, PingRelayError> {
        let session = normalize_number(number);

        self.send_seen(&session, chat_id).await;
        tokio::time::sleep(self.pacing.pre_typing_delay()).await;

        self.start_typing(&session, chat_id).await;
        tokio::time::sleep(self.pacing.typing_delay(text.chars().count())).await;
        self.stop_typing(&session, chat_id).await;

        tokio::time::sleep(self.pacing.post_typing_delay()).await;

        match self.send_text_raw(&session, chat_id, text).await {
            Ok(body) => Ok(body),
            Err(e) => {
                warn!(session, chat_id, error = %e, "paced send failed, retrying direct");
                self.send_text_raw(&session, chat_id, text).await
            }
        }
    }

    /// Sends an image by URL with an optional caption.
    ///
    /// Paced like a human attaching a photo: open the chat, pick the file,
    /// wait for the upload, send.
    pub async fn send_image(
        &self,
        number: &str,
        chat_id: &str,
        url: &str,
        caption: Option<&str>,
    ) -> Result<(), PingRelayError> {
        let session = normalize_number(number);
        self.send_seen(&session, chat_id).await;
        let (lead, hold) = self.pacing.image_delays();
        tokio::time::sleep(lead).await;
        tokio::time::sleep(hold).await;
        let body = json!({
            "session": session,
            "chatId": chat_id,
            "file": {"mimetype": "image/jpeg", "filename": "waha.jpg", "url": url},
            "caption": caption.unwrap_or(""),
        });
        self.post_json("/api/sendImage", &body).await
    }

    /// Sends a video by URL with an optional caption.
    ///
    /// WAHA core delivers video through the sendImage endpoint; only the
    /// mimetype differs.
    pub async fn send_video(
        &self,
        number: &str,
        chat_id: &str,
        url: &str,
        caption: Option<&str>,
    ) -> Result<(), PingRelayError> {
        let session = normalize_number(number);
        self.send_seen(&session, chat_id).await;
        let (lead, hold) = self.pacing.video_delays();
        tokio::time::sleep(lead).await;
        tokio::time::sleep(hold).await;
        let body = json!({
            "session": session,
            "chatId": chat_id,
            "file": {"mimetype": "video/mp4", "filename": "video.mp4", "url": url},
            "caption": caption.unwrap_or(""),
        });
        self.post_json("/api/sendImage", &body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str) -> WahaClient {
        WahaClient::new(
            base_url.to_string(),
            Some("test-key"),
            Duration::from_secs(5),
            Pacing::none(),
        )
        .unwrap()
    }

    #[test]
    fn normalize_strips_everything_but_digits() {
        assert_eq!(normalize_number("+1 (555) 123-4567"), "15551234567");
        assert_eq!(normalize_number("15551234567"), "15551234567");
        assert_eq!(chat_id_for_number("+1 555 123 4567"), "15551234567@c.us");
    }

    #[tokio::test]
    async fn get_session_parses_waha_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/sessions/15551234567"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "15551234567",
                "status": "WORKING",
                "me": {"id": "15551234567@c.us", "pushName": "Alice"}
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let session = client.get_session("+1 555 123 4567").await.unwrap();
        assert!(session.is_connected());
        assert_eq!(session.me.unwrap().push_name.as_deref(), Some("Alice"));
    }

    #[tokio::test]
    async fn get_session_surfaces_gateway_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/sessions/15551234567"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no such session"))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client.get_session("15551234567").await.unwrap_err();
        assert!(err.to_string().contains("404"), "got: {err}");
    }

    #[tokio::test]
    async fn send_text_runs_full_pacing_sequence() {
        let server = MockServer::start().await;
        for endpoint in ["/api/sendSeen", "/api/startTyping", "/api/stopTyping"] {
            Mock::given(method("POST"))
                .and(path(endpoint))
                .and(body_partial_json(serde_json::json!({
                    "session": "15551234567",
                    "chatId": "123@g.us"
                })))
                .respond_with(ResponseTemplate::new(200))
                .expect(1)
                .mount(&server)
                .await;
        }
        Mock::given(method("POST"))
            .and(path("/api/sendText"))
            .and(body_partial_json(serde_json::json!({
                "session": "15551234567",
                "chatId": "123@g.us",
                "text": "hello"
            })))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(serde_json::json!({"id": "true_123@g.us_AAA"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let body = client
            .send_text("15551234567", "123@g.us", "hello")
            .await
            .unwrap();
        assert!(body.contains("true_123@g.us_AAA"), "got: {body}");
    }

    #[tokio::test]
    async fn send_text_falls_back_to_direct_send() {
        let server = MockServer::start().await;
        for endpoint in ["/api/sendSeen", "/api/startTyping", "/api/stopTyping"] {
            Mock::given(method("POST"))
                .and(path(endpoint))
                .respond_with(ResponseTemplate::new(500))
                .mount(&server)
                .await;
        }
        // First sendText fails, the direct retry succeeds.
        Mock::given(method("POST"))
            .and(path("/api/sendText"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/sendText"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        client
            .send_text("15551234567", "123@g.us", "hello")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn get_chats_returns_empty_on_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/15551234567/chats"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        assert!(client.get_chats("15551234567").await.is_empty());
    }

    #[tokio::test]
    async fn find_group_id_requires_an_exact_subject_match() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/15551234567/chats"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {},
                {"groupMetadata": {"id": {"_serialized": "111@g.us"}, "subject": "Family"}},
                {"groupMetadata": {"id": {"_serialized": "222@g.us"}, "subject": "Wedding Guests"}}
            ])))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let id = client.find_group_id("15551234567", "Wedding Guests").await;
        assert_eq!(id.as_deref(), Some("222@g.us"));
        // A case mismatch is a different group, not a fuzzy hit.
        assert!(
            client
                .find_group_id("15551234567", "wedding guests")
                .await
                .is_none()
        );
        assert!(client.find_group_id("15551234567", "Work").await.is_none());
    }

    #[tokio::test]
    async fn send_video_posts_to_send_image_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/sendImage"))
            .and(body_partial_json(serde_json::json!({
                "file": {"mimetype": "video/mp4", "filename": "video.mp4"}
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        client
            .send_video("15551234567", "123@g.us", "https://cdn.test/v.mp4", None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn download_qr_requests_image_format() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/15551234567/auth/qr"))
            .and(query_param("format", "image"))
            .respond_with(
                ResponseTemplate::new(200).set_body_bytes(vec![0x89, b'P', b'N', b'G']),
            )
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let bytes = client.download_qr("15551234567").await.unwrap();
        assert_eq!(bytes, vec![0x89, b'P', b'N', b'G']);
    }

    #[tokio::test]
    async fn wait_for_scan_restarts_failed_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/sessions/15551234567"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({"name": "15551234567", "status": "FAILED"}),
            ))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/sessions/15551234567/start"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/sessions/15551234567"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "15551234567",
                "status": "WORKING",
                "me": {"id": "15551234567@c.us"}
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let session = client.wait_for_scan("15551234567").await.unwrap();
        assert!(session.is_connected());
    }
}
