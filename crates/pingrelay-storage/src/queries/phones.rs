// SPDX-FileCopyrightText: 2026 PingRelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Phone registry operations.

use pingrelay_core::{PhoneStatus, PingRelayError};
use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::models::{Phone, column_datetime, column_enum, now_rfc3339};

fn row_to_phone(row: &rusqlite::Row<'_>) -> Result<Phone, rusqlite::Error> {
    Ok(Phone {
        id: row.get(0)?,
        number: row.get(1)?,
        status: column_enum(row, 2)?,
        created_at: column_datetime(row, 3)?,
        updated_at: column_datetime(row, 4)?,
    })
}

const PHONE_COLUMNS: &str = "id, number, status, created_at, updated_at";

/// Registers a phone. The number must already be normalized (digits only).
pub async fn create_phone(db: &Database, number: &str) -> Result<Phone, PingRelayError> {
    let phone = Phone {
        id: Uuid::new_v4().to_string(),
        number: number.to_string(),
        status: PhoneStatus::Disconnected,
        created_at: chrono::Utc::now(),
        updated_at: chrono::Utc::now(),
    };
    let row = phone.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO phones (id, number, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    row.id,
                    row.number,
                    row.status.to_string(),
                    row.created_at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
                    row.updated_at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    Ok(phone)
}

/// Fetches a phone by id.
pub async fn get_phone(db: &Database, id: &str) -> Result<Option<Phone>, PingRelayError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!("SELECT {PHONE_COLUMNS} FROM phones WHERE id = ?1"),
                params![id],
                row_to_phone,
            );
            match result {
                Ok(phone) => Ok(Some(phone)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fetches a phone by its normalized number.
pub async fn get_phone_by_number(
    db: &Database,
    number: &str,
) -> Result<Option<Phone>, PingRelayError> {
    let number = number.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!("SELECT {PHONE_COLUMNS} FROM phones WHERE number = ?1"),
                params![number],
                row_to_phone,
            );
            match result {
                Ok(phone) => Ok(Some(phone)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Lists all registered phones, oldest first.
pub async fn list_phones(db: &Database) -> Result<Vec<Phone>, PingRelayError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PHONE_COLUMNS} FROM phones ORDER BY created_at ASC"
            ))?;
            let phones = stmt
                .query_map([], row_to_phone)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(phones)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Updates a phone's connectivity status. Returns false if the id is unknown.
pub async fn update_phone_status(
    db: &Database,
    id: &str,
    status: PhoneStatus,
) -> Result<bool, PingRelayError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE phones SET status = ?1, updated_at = ?2 WHERE id = ?3",
                params![status.to_string(), now_rfc3339(), id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Deletes a phone. Returns false if the id is unknown.
pub async fn delete_phone(db: &Database, id: &str) -> Result<bool, PingRelayError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute("DELETE FROM phones WHERE id = ?1", params![id])?;
            Ok(changed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
