// SPDX-FileCopyrightText: 2026 PingRelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row types and column mapping helpers.
//!
//! Timestamps are stored as RFC 3339 text, statuses as lowercase strings,
//! and error codes as SCREAMING_SNAKE_CASE strings.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use pingrelay_core::{
    DeliveryStatus, ErrorCode, PhoneStatus, PingRelayError, ScheduleStatus, TimingSpec,
    VariableEntry,
};
use serde::{Deserialize, Serialize};

/// A registered outbound phone.
#[derive(Debug, Clone)]
pub struct Phone {
    pub id: String,
    pub number: String,
    pub status: PhoneStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A message template.
///
/// `messages` holds the legacy embedded JSON array; it is only consulted
/// when the normalized `messages` table has no rows for this template.
#[derive(Debug, Clone)]
pub struct Template {
    pub id: String,
    pub title: String,
    pub messages: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One message spec embedded in a template's legacy JSON array.
///
/// Field names match the imported data format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddedMessage {
    pub message: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub video: Option<String>,
    pub phone: String,
    #[serde(rename = "sendingTime")]
    pub sending_time: EmbeddedSendingTime,
}

/// Timing fields of an embedded message spec.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddedSendingTime {
    #[serde(rename = "type")]
    pub kind: String,
    pub day: String,
    pub hour: String,
}

/// A normalized message row.
#[derive(Debug, Clone)]
pub struct MessageRow {
    pub id: String,
    pub template_id: String,
    pub phone_id: String,
    pub send_time_type: String,
    pub send_on_day: String,
    pub send_on_hour: String,
    pub body: String,
    pub image: Option<String>,
    pub video: Option<String>,
    pub ord: i64,
}

/// A template message after resolution, whichever store it came from.
///
/// `index` is the position within the template and keys the delivery ledger.
#[derive(Debug)]
pub struct ResolvedMessage {
    pub id: Option<String>,
    pub index: i64,
    pub phone_id: String,
    pub send_time_type: String,
    pub send_on_day: String,
    pub send_on_hour: String,
    pub body: String,
    pub image: Option<String>,
    pub video: Option<String>,
    pub timing: Result<TimingSpec, PingRelayError>,
}

impl MessageRow {
    /// Resolves this row into dispatch form, parsing its timing columns.
    pub fn resolve(self) -> ResolvedMessage {
        let timing = TimingSpec::parse(&self.send_time_type, &self.send_on_day, &self.send_on_hour);
        ResolvedMessage {
            id: Some(self.id),
            index: self.ord,
            phone_id: self.phone_id,
            send_time_type: self.send_time_type,
            send_on_day: self.send_on_day,
            send_on_hour: self.send_on_hour,
            body: self.body,
            image: self.image,
            video: self.video,
            timing,
        }
    }
}

impl EmbeddedMessage {
    /// Resolves an embedded spec at position `index` into dispatch form.
    pub fn resolve(self, index: i64) -> ResolvedMessage {
        let timing = TimingSpec::parse(
            &self.sending_time.kind,
            &self.sending_time.day,
            &self.sending_time.hour,
        );
        ResolvedMessage {
            id: None,
            index,
            phone_id: self.phone,
            send_time_type: self.sending_time.kind,
            send_on_day: self.sending_time.day,
            send_on_hour: self.sending_time.hour,
            body: self.message,
            image: self.image,
            video: self.video,
            timing,
        }
    }
}

/// A schedule binding a template to a group chat and an event date.
#[derive(Debug, Clone)]
pub struct Schedule {
    pub id: String,
    pub group_name: String,
    pub template_id: String,
    pub event_date: DateTime<Utc>,
    pub variables: Vec<VariableEntry>,
    pub status: ScheduleStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Content snapshot frozen on a delivery's first attempt.
///
/// Carries the timing columns alongside the resolved content so a ledger
/// row stays interpretable even after the template is edited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageSnapshot {
    pub group_name: String,
    #[serde(default)]
    pub send_time_type: String,
    #[serde(default)]
    pub send_on_day: String,
    #[serde(default)]
    pub send_on_hour: String,
    pub body: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub video: Option<String>,
}

/// One row of the delivery ledger.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub id: String,
    pub schedule_id: String,
    pub message_id: Option<String>,
    pub message_index: i64,
    pub phone_id: String,
    pub group_id: Option<String>,
    pub snapshot: String,
    pub status: DeliveryStatus,
    pub last_try_at: Option<DateTime<Utc>>,
    pub success_at: Option<DateTime<Utc>>,
    pub last_error_at: Option<DateTime<Utc>>,
    pub error_code: Option<ErrorCode>,
    pub error_data: Option<String>,
    pub error: Option<String>,
    pub waha_response: Option<String>,
}

/// One append-only log entry for a delivery.
#[derive(Debug, Clone)]
pub struct DeliveryLog {
    pub id: i64,
    pub delivery_id: String,
    pub at: DateTime<Utc>,
    pub error_code: Option<ErrorCode>,
    pub error_data: Option<String>,
    pub message: Option<String>,
}

/// Aggregated delivery counts for one schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeliveryStats {
    pub total: i64,
    pub sent: i64,
    pub failed: i64,
    pub pending: i64,
    /// Messages with no delivery row yet.
    pub not_sent: i64,
}

// --- column mapping helpers ---

/// Current time as millisecond-precision RFC 3339 text, the column format.
pub(crate) fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

fn conversion_err(
    idx: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}

/// Reads an RFC 3339 timestamp column.
pub(crate) fn column_datetime(
    row: &rusqlite::Row<'_>,
    idx: usize,
) -> Result<DateTime<Utc>, rusqlite::Error> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_err(idx, e))
}

/// Reads a nullable RFC 3339 timestamp column.
pub(crate) fn column_opt_datetime(
    row: &rusqlite::Row<'_>,
    idx: usize,
) -> Result<Option<DateTime<Utc>>, rusqlite::Error> {
    let text: Option<String> = row.get(idx)?;
    text.map(|t| {
        DateTime::parse_from_rfc3339(&t)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| conversion_err(idx, e))
    })
    .transpose()
}

/// Reads a string-backed enum column.
pub(crate) fn column_enum<T>(row: &rusqlite::Row<'_>, idx: usize) -> Result<T, rusqlite::Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let text: String = row.get(idx)?;
    text.parse().map_err(|e| conversion_err(idx, e))
}

/// Reads a nullable string-backed enum column.
pub(crate) fn column_opt_enum<T>(
    row: &rusqlite::Row<'_>,
    idx: usize,
) -> Result<Option<T>, rusqlite::Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let text: Option<String> = row.get(idx)?;
    text.map(|t| t.parse().map_err(|e| conversion_err(idx, e)))
        .transpose()
}

/// Reads a JSON column into a deserializable value.
pub(crate) fn column_json<T>(row: &rusqlite::Row<'_>, idx: usize) -> Result<T, rusqlite::Error>
where
    T: serde::de::DeserializeOwned,
{
    let text: String = row.get(idx)?;
    serde_json::from_str(&text).map_err(|e| conversion_err(idx, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_message_parses_imported_json() {
        let raw = r#"{
            "message": "Starts in one hour, {{name}}!",
            "image": "https://cdn.test/banner.jpg",
            "phone": "phone-1",
            "sendingTime": {"type": "relative_time", "day": "0", "hour": "-01:00"}
        }"#;
        let spec: EmbeddedMessage = serde_json::from_str(raw).unwrap();
        let resolved = spec.resolve(2);
        assert_eq!(resolved.index, 2);
        assert_eq!(resolved.phone_id, "phone-1");
        assert!(resolved.id.is_none());
        assert_eq!(
            resolved.timing.unwrap(),
            TimingSpec::RelativeTime {
                day_offset: 0,
                minutes: -60
            }
        );
    }

    #[test]
    fn message_row_resolution_carries_bad_timing_as_error() {
        let row = MessageRow {
            id: "m1".into(),
            template_id: "t1".into(),
            phone_id: "p1".into(),
            send_time_type: "fixed_time".into(),
            send_on_day: "not-a-number".into(),
            send_on_hour: "09:00".into(),
            body: "hi".into(),
            image: None,
            video: None,
            ord: 0,
        };
        let resolved = row.resolve();
        assert!(resolved.timing.is_err());
        assert_eq!(resolved.body, "hi");
    }

    #[test]
    fn snapshot_round_trips() {
        let snapshot = MessageSnapshot {
            group_name: "Launch Group".into(),
            send_time_type: "relative_time".into(),
            send_on_day: "0".into(),
            send_on_hour: "-01:00".into(),
            body: "resolved text".into(),
            image: None,
            video: Some("https://cdn.test/v.mp4".into()),
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: MessageSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.group_name, "Launch Group");
        assert_eq!(back.send_on_hour, "-01:00");
        assert_eq!(back.video.as_deref(), Some("https://cdn.test/v.mp4"));
    }

    #[test]
    fn snapshot_without_timing_fields_still_deserializes() {
        let back: MessageSnapshot = serde_json::from_str(
            r#"{"group_name": "Launch Group", "body": "resolved text"}"#,
        )
        .unwrap();
        assert_eq!(back.send_time_type, "");
        assert!(back.image.is_none());
    }
}
