// SPDX-FileCopyrightText: 2026 PingRelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain enums and shared types.
//!
//! Statuses are persisted as lowercase strings; structured error codes are
//! persisted as SCREAMING_SNAKE_CASE strings, matching what the dashboard
//! displays.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::PingRelayError;

/// Connectivity status of a registered outbound phone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PhoneStatus {
    Connected,
    Disconnected,
}

/// Lifecycle status of a schedule (one campaign bound to one event).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ScheduleStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Outcome status of a single delivery record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Pending,
    Sent,
    Failed,
}

/// Structured error codes recorded on delivery records and log entries.
///
/// `TemplateNotFound` is the only structural (non-retryable) failure: it fails
/// the whole schedule. Resolution and transmission codes leave the message
/// eligible for retry on a later tick. `ImageSendFailed`/`VideoSendFailed` are
/// logged against an otherwise-successful delivery and never fail it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    TemplateNotFound,
    PhoneNotFound,
    PhoneNotConnected,
    GroupNotFound,
    GroupIdMissing,
    MessageSendFailed,
    ImageSendFailed,
    VideoSendFailed,
    UnknownError,
}

/// One key→value substitution pair attached to a schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableEntry {
    pub key: String,
    pub value: String,
}

/// How a message's due instant derives from the schedule's event date.
///
/// Parsed from the stored `send_time_type` / `send_on_day` / `send_on_hour`
/// columns so that template edits between ticks are honored for not-yet-sent
/// messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimingSpec {
    /// Due exactly at the event date; day/hour fields are ignored.
    EventTime,
    /// Due on event date + `day_offset` days, at the absolute wall clock
    /// `hour:minute` (seconds zeroed).
    FixedTime {
        day_offset: i32,
        hour: u32,
        minute: u32,
    },
    /// Due at event date + `day_offset` days + `minutes` (signed duration).
    RelativeTime { day_offset: i32, minutes: i64 },
}

impl TimingSpec {
    /// Parses a timing spec from its stored string representation.
    ///
    /// `day` must be an integer in -30..=30. For `fixed_time`, `hour` must be
    /// an unsigned `HH:MM`; for `relative_time` it may carry a leading sign.
    pub fn parse(kind: &str, day: &str, hour: &str) -> Result<Self, PingRelayError> {
        match kind {
            "event_time" => Ok(Self::EventTime),
            "fixed_time" => {
                let day_offset = parse_day_offset(day)?;
                let (h, m) = parse_clock(hour)?;
                Ok(Self::FixedTime {
                    day_offset,
                    hour: h,
                    minute: m,
                })
            }
            "relative_time" => {
                let day_offset = parse_day_offset(day)?;
                let minutes = parse_signed_minutes(hour)?;
                Ok(Self::RelativeTime {
                    day_offset,
                    minutes,
                })
            }
            other => Err(PingRelayError::Internal(format!(
                "unknown send_time_type: {other}"
            ))),
        }
    }
}

fn parse_day_offset(day: &str) -> Result<i32, PingRelayError> {
    let value: i32 = day
        .trim()
        .parse()
        .map_err(|_| PingRelayError::Internal(format!("invalid send_on_day: {day:?}")))?;
    if !(-30..=30).contains(&value) {
        return Err(PingRelayError::Internal(format!(
            "send_on_day out of range (-30..=30): {value}"
        )));
    }
    Ok(value)
}

fn parse_clock(hour: &str) -> Result<(u32, u32), PingRelayError> {
    let (h, m) = hour
        .split_once(':')
        .ok_or_else(|| PingRelayError::Internal(format!("invalid send_on_hour: {hour:?}")))?;
    let h: u32 = h
        .parse()
        .map_err(|_| PingRelayError::Internal(format!("invalid hour in send_on_hour: {hour:?}")))?;
    let m: u32 = m.parse().map_err(|_| {
        PingRelayError::Internal(format!("invalid minute in send_on_hour: {hour:?}"))
    })?;
    if h > 23 || m > 59 {
        return Err(PingRelayError::Internal(format!(
            "send_on_hour out of range: {hour:?}"
        )));
    }
    Ok((h, m))
}

fn parse_signed_minutes(hour: &str) -> Result<i64, PingRelayError> {
    let trimmed = hour.trim();
    let (negative, clock) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };
    let (h, m) = parse_clock(clock)?;
    let total = i64::from(h) * 60 + i64::from(m);
    Ok(if negative { -total } else { total })
}
