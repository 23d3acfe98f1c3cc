// SPDX-FileCopyrightText: 2026 PingRelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery ledger operations.
//!
//! One ledger row per (schedule, message index), created on the first send
//! attempt and reused on every retry. Attempt history goes to the
//! append-only `delivery_logs` table; the ledger row only carries the
//! latest state.

use pingrelay_core::{ErrorCode, PingRelayError};
use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::models::{
    Delivery, DeliveryLog, DeliveryStats, MessageSnapshot, column_datetime, column_enum,
    column_opt_datetime, column_opt_enum, now_rfc3339,
};

const DELIVERY_COLUMNS: &str =
    "id, schedule_id, message_id, message_index, phone_id, group_id, snapshot, status,
     last_try_at, success_at, last_error_at, error_code, error_data, error, waha_response";

fn row_to_delivery(row: &rusqlite::Row<'_>) -> Result<Delivery, rusqlite::Error> {
    Ok(Delivery {
        id: row.get(0)?,
        schedule_id: row.get(1)?,
        message_id: row.get(2)?,
        message_index: row.get(3)?,
        phone_id: row.get(4)?,
        group_id: row.get(5)?,
        snapshot: row.get(6)?,
        status: column_enum(row, 7)?,
        last_try_at: column_opt_datetime(row, 8)?,
        success_at: column_opt_datetime(row, 9)?,
        last_error_at: column_opt_datetime(row, 10)?,
        error_code: column_opt_enum(row, 11)?,
        error_data: row.get(12)?,
        error: row.get(13)?,
        waha_response: row.get(14)?,
    })
}

fn insert_log(
    conn: &rusqlite::Connection,
    delivery_id: &str,
    error_code: Option<ErrorCode>,
    error_data: Option<&str>,
    message: Option<&str>,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO delivery_logs (delivery_id, at, error_code, error_data, message)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            delivery_id,
            now_rfc3339(),
            error_code.map(|c| c.to_string()),
            error_data,
            message,
        ],
    )?;
    Ok(())
}

/// Returns the ledger row for (schedule, index), creating it on first use.
///
/// An existing row gets its `last_try_at` bumped and a retry log entry
/// appended; a new row captures the content snapshot and an initial log
/// entry. The snapshot is never overwritten on retry.
pub async fn find_or_create(
    db: &Database,
    schedule_id: &str,
    message_index: i64,
    message_id: Option<&str>,
    phone_id: &str,
    snapshot: &MessageSnapshot,
) -> Result<Delivery, PingRelayError> {
    let snapshot_json = serde_json::to_string(snapshot)
        .map_err(|e| PingRelayError::Internal(format!("failed to encode snapshot: {e}")))?;
    let new_id = Uuid::new_v4().to_string();
    let schedule_id = schedule_id.to_string();
    let message_id = message_id.map(str::to_string);
    let phone_id = phone_id.to_string();

    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let existing: Option<String> = {
                let result = tx.query_row(
                    "SELECT id FROM deliveries WHERE schedule_id = ?1 AND message_index = ?2",
                    params![schedule_id, message_index],
                    |row| row.get(0),
                );
                match result {
                    Ok(id) => Some(id),
                    Err(rusqlite::Error::QueryReturnedNoRows) => None,
                    Err(e) => return Err(e.into()),
                }
            };

            let id = match existing {
                Some(id) => {
                    tx.execute(
                        "UPDATE deliveries SET last_try_at = ?1, updated_at = ?1 WHERE id = ?2",
                        params![now_rfc3339(), id],
                    )?;
                    insert_log(&tx, &id, None, None, Some("retry attempt"))?;
                    id
                }
                None => {
                    tx.execute(
                        "INSERT INTO deliveries (id, schedule_id, message_id, message_index,
                             phone_id, snapshot, status, last_try_at, created_at, updated_at)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'pending', ?7, ?7, ?7)",
                        params![
                            new_id,
                            schedule_id,
                            message_id,
                            message_index,
                            phone_id,
                            snapshot_json,
                            now_rfc3339(),
                        ],
                    )?;
                    insert_log(&tx, &new_id, None, None, Some("delivery created"))?;
                    new_id
                }
            };

            let delivery = tx.query_row(
                &format!("SELECT {DELIVERY_COLUMNS} FROM deliveries WHERE id = ?1"),
                params![id],
                row_to_delivery,
            )?;
            tx.commit()?;
            Ok(delivery)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fetches the ledger row for (schedule, index), if any.
pub async fn get_delivery(
    db: &Database,
    schedule_id: &str,
    message_index: i64,
) -> Result<Option<Delivery>, PingRelayError> {
    let schedule_id = schedule_id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!(
                    "SELECT {DELIVERY_COLUMNS} FROM deliveries
                     WHERE schedule_id = ?1 AND message_index = ?2"
                ),
                params![schedule_id, message_index],
                row_to_delivery,
            );
            match result {
                Ok(delivery) => Ok(Some(delivery)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Appends one log entry to a delivery's attempt history.
pub async fn append_log(
    db: &Database,
    delivery_id: &str,
    error_code: Option<ErrorCode>,
    error_data: Option<&str>,
    message: Option<&str>,
) -> Result<(), PingRelayError> {
    let delivery_id = delivery_id.to_string();
    let error_data = error_data.map(str::to_string);
    let message = message.map(str::to_string);
    db.connection()
        .call(move |conn| {
            insert_log(conn, &delivery_id, error_code, error_data.as_deref(), message.as_deref())?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Marks a delivery as sent, at most once.
///
/// Returns false when the row was already `sent`, leaving the original
/// `success_at` untouched.
pub async fn mark_sent(
    db: &Database,
    id: &str,
    waha_response: Option<&str>,
) -> Result<bool, PingRelayError> {
    let id = id.to_string();
    let waha_response = waha_response.map(str::to_string);
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let changed = tx.execute(
                "UPDATE deliveries SET status = 'sent', success_at = ?1,
                     waha_response = ?2, updated_at = ?1
                 WHERE id = ?3 AND status != 'sent'",
                params![now_rfc3339(), waha_response, id],
            )?;
            if changed > 0 {
                insert_log(&tx, &id, None, None, Some("sent"))?;
            }
            tx.commit()?;
            Ok(changed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Records a retryable failure on the ledger row and appends a log entry.
pub async fn mark_failed(
    db: &Database,
    id: &str,
    error_code: ErrorCode,
    error_data: Option<&str>,
    message: &str,
) -> Result<(), PingRelayError> {
    let id = id.to_string();
    let error_data = error_data.map(str::to_string);
    let message = message.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "UPDATE deliveries SET status = 'failed', last_error_at = ?1,
                     error_code = ?2, error_data = ?3, error = ?4, updated_at = ?1
                 WHERE id = ?5",
                params![
                    now_rfc3339(),
                    error_code.to_string(),
                    error_data,
                    message,
                    id
                ],
            )?;
            insert_log(&tx, &id, Some(error_code), error_data.as_deref(), Some(&message))?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Stores the resolved group chat id on the ledger row.
pub async fn set_group_id(db: &Database, id: &str, group_id: &str) -> Result<(), PingRelayError> {
    let id = id.to_string();
    let group_id = group_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE deliveries SET group_id = ?1, updated_at = ?2 WHERE id = ?3",
                params![group_id, now_rfc3339(), id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Lists a delivery's log entries, oldest first.
pub async fn logs_for_delivery(
    db: &Database,
    delivery_id: &str,
) -> Result<Vec<DeliveryLog>, PingRelayError> {
    let delivery_id = delivery_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, delivery_id, at, error_code, error_data, message
                 FROM delivery_logs WHERE delivery_id = ?1 ORDER BY id ASC",
            )?;
            let logs = stmt
                .query_map(params![delivery_id], |row| {
                    Ok(DeliveryLog {
                        id: row.get(0)?,
                        delivery_id: row.get(1)?,
                        at: column_datetime(row, 2)?,
                        error_code: column_opt_enum(row, 3)?,
                        error_data: row.get(4)?,
                        message: row.get(5)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(logs)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Aggregates delivery counts for a schedule.
///
/// `total` is the template's message count; `not_sent` covers indexes with
/// no ledger row yet.
pub async fn stats_for_schedule(
    db: &Database,
    schedule_id: &str,
    total: i64,
) -> Result<DeliveryStats, PingRelayError> {
    let schedule_id = schedule_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT status, COUNT(*) FROM deliveries
                 WHERE schedule_id = ?1 GROUP BY status",
            )?;
            let counts = stmt
                .query_map(params![schedule_id], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            let mut stats = DeliveryStats {
                total,
                sent: 0,
                failed: 0,
                pending: 0,
                not_sent: 0,
            };
            for (status, count) in counts {
                match status.as_str() {
                    "sent" => stats.sent = count,
                    "failed" => stats.failed = count,
                    "pending" => stats.pending = count,
                    _ => {}
                }
            }
            stats.not_sent = (total - stats.sent - stats.failed - stats.pending).max(0);
            Ok(stats)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
