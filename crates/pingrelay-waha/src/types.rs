// SPDX-FileCopyrightText: 2026 PingRelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the WAHA REST API.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a WAHA session as reported by the gateway.
///
/// `Started` is the transient state between `STARTING` and the first
/// engine report. Statuses introduced by newer gateway versions fall
/// back to [`SessionStatus::Unknown`] rather than failing the whole
/// session response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Stopped,
    Starting,
    Started,
    ScanQrCode,
    Working,
    Failed,
    #[serde(other)]
    Unknown,
}

/// Authenticated account info embedded in a session response.
///
/// Present only once the session has paired with a device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMe {
    /// WhatsApp account id, e.g. `15551234567@c.us`.
    pub id: String,
    #[serde(rename = "pushName", default)]
    pub push_name: Option<String>,
}

/// A WAHA session as returned by `GET /api/sessions/{name}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WahaSession {
    pub name: String,
    pub status: SessionStatus,
    #[serde(default)]
    pub me: Option<SessionMe>,
}

impl WahaSession {
    /// A session counts as connected only when it is both in the
    /// `WORKING` state and carries authenticated account info.
    pub fn is_connected(&self) -> bool {
        self.status == SessionStatus::Working && self.me.is_some()
    }
}

/// Serialized chat id, e.g. `1203630...@g.us`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatId {
    #[serde(rename = "_serialized")]
    pub serialized: String,
}

/// Group metadata carried on group chats.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMetadata {
    pub id: ChatId,
    #[serde(default)]
    pub subject: Option<String>,
}

/// A chat entry from `GET /api/{session}/chats`.
///
/// Only group chats carry `groupMetadata`; direct chats are skipped
/// during group lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    #[serde(rename = "groupMetadata", default)]
    pub group_metadata: Option<GroupMetadata>,
}

impl Chat {
    /// Returns `(group_id, subject)` if this chat is a named group.
    pub fn as_group(&self) -> Option<(&str, &str)> {
        let meta = self.group_metadata.as_ref()?;
        let subject = meta.subject.as_deref()?;
        Some((meta.id.serialized.as_str(), subject))
    }
}
