// SPDX-FileCopyrightText: 2026 PingRelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Due-time calculus.
//!
//! A message's due instant is a pure function of the schedule's event date
//! and the message's timing spec, recomputed every tick so that template
//! edits take effect for anything not yet sent.

use chrono::{DateTime, Duration, Timelike, Utc};
use pingrelay_core::TimingSpec;

/// Computes the instant a message becomes due.
///
/// - `EventTime`: the event date itself.
/// - `FixedTime`: shift by whole days, then overwrite the wall clock with
///   the configured hour and minute, seconds zeroed.
/// - `RelativeTime`: shift by whole days plus a signed minute offset.
pub fn due_at(event_date: DateTime<Utc>, spec: &TimingSpec) -> DateTime<Utc> {
    match *spec {
        TimingSpec::EventTime => event_date,
        TimingSpec::FixedTime {
            day_offset,
            hour,
            minute,
        } => {
            let shifted = event_date + Duration::days(i64::from(day_offset));
            shifted
                .with_hour(hour)
                .and_then(|d| d.with_minute(minute))
                .and_then(|d| d.with_second(0))
                .and_then(|d| d.with_nanosecond(0))
                .unwrap_or(shifted)
        }
        TimingSpec::RelativeTime {
            day_offset,
            minutes,
        } => event_date + Duration::days(i64::from(day_offset)) + Duration::minutes(minutes),
    }
}

/// True once `now` has reached the message's due instant.
pub fn is_due(now: DateTime<Utc>, event_date: DateTime<Utc>, spec: &TimingSpec) -> bool {
    now >= due_at(event_date, spec)
}
