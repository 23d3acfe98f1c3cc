// SPDX-FileCopyrightText: 2026 PingRelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Template and message store operations.
//!
//! Message resolution prefers the normalized `messages` table; templates
//! imported from the legacy system may instead carry an embedded JSON array,
//! which is used as a fallback until their rows are migrated.

use pingrelay_core::PingRelayError;
use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::models::{
    EmbeddedMessage, MessageRow, ResolvedMessage, Template, column_datetime, now_rfc3339,
};

fn row_to_template(row: &rusqlite::Row<'_>) -> Result<Template, rusqlite::Error> {
    Ok(Template {
        id: row.get(0)?,
        title: row.get(1)?,
        messages: row.get(2)?,
        created_at: column_datetime(row, 3)?,
        updated_at: column_datetime(row, 4)?,
    })
}

fn row_to_message(row: &rusqlite::Row<'_>) -> Result<MessageRow, rusqlite::Error> {
    Ok(MessageRow {
        id: row.get(0)?,
        template_id: row.get(1)?,
        phone_id: row.get(2)?,
        send_time_type: row.get(3)?,
        send_on_day: row.get(4)?,
        send_on_hour: row.get(5)?,
        body: row.get(6)?,
        image: row.get(7)?,
        video: row.get(8)?,
        ord: row.get(9)?,
    })
}

/// Creates a template. `embedded_messages` is the legacy JSON array, if any.
pub async fn create_template(
    db: &Database,
    title: &str,
    embedded_messages: Option<&str>,
) -> Result<Template, PingRelayError> {
    let id = Uuid::new_v4().to_string();
    let title = title.to_string();
    let embedded = embedded_messages.map(str::to_string);
    let now = now_rfc3339();

    let template_id = id.clone();
    let row_title = title.clone();
    let row_embedded = embedded.clone();
    let row_now = now.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO templates (id, title, messages, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![template_id, row_title, row_embedded, row_now, row_now],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    get_template(db, &id)
        .await?
        .ok_or_else(|| PingRelayError::Internal(format!("template {id} missing after insert")))
}

/// Fetches a template by id.
pub async fn get_template(db: &Database, id: &str) -> Result<Option<Template>, PingRelayError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT id, title, messages, created_at, updated_at
                 FROM templates WHERE id = ?1",
                params![id],
                row_to_template,
            );
            match result {
                Ok(template) => Ok(Some(template)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Appends a message row to a template at position `ord`.
#[allow(clippy::too_many_arguments)]
pub async fn create_message(
    db: &Database,
    template_id: &str,
    phone_id: &str,
    send_time_type: &str,
    send_on_day: &str,
    send_on_hour: &str,
    body: &str,
    image: Option<&str>,
    video: Option<&str>,
    ord: i64,
) -> Result<MessageRow, PingRelayError> {
    let row = MessageRow {
        id: Uuid::new_v4().to_string(),
        template_id: template_id.to_string(),
        phone_id: phone_id.to_string(),
        send_time_type: send_time_type.to_string(),
        send_on_day: send_on_day.to_string(),
        send_on_hour: send_on_hour.to_string(),
        body: body.to_string(),
        image: image.map(str::to_string),
        video: video.map(str::to_string),
        ord,
    };
    let insert = row.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO messages (id, template_id, phone_id, send_time_type,
                     send_on_day, send_on_hour, body, image, video, ord,
                     created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
                params![
                    insert.id,
                    insert.template_id,
                    insert.phone_id,
                    insert.send_time_type,
                    insert.send_on_day,
                    insert.send_on_hour,
                    insert.body,
                    insert.image,
                    insert.video,
                    insert.ord,
                    now_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    Ok(row)
}

/// Lists a template's normalized message rows in template order.
pub async fn messages_for_template(
    db: &Database,
    template_id: &str,
) -> Result<Vec<MessageRow>, PingRelayError> {
    let template_id = template_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, template_id, phone_id, send_time_type, send_on_day,
                        send_on_hour, body, image, video, ord
                 FROM messages WHERE template_id = ?1 ORDER BY ord ASC",
            )?;
            let rows = stmt
                .query_map(params![template_id], row_to_message)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Resolves a template's messages for dispatch.
///
/// Normalized rows win; an empty row set falls back to the embedded JSON
/// array. Message index is the position within the template either way.
pub async fn resolve_messages(
    db: &Database,
    template: &Template,
) -> Result<Vec<ResolvedMessage>, PingRelayError> {
    let rows = messages_for_template(db, &template.id).await?;
    if !rows.is_empty() {
        return Ok(rows.into_iter().map(MessageRow::resolve).collect());
    }

    let Some(raw) = template.messages.as_deref() else {
        return Ok(Vec::new());
    };
    let embedded: Vec<EmbeddedMessage> = serde_json::from_str(raw).map_err(|e| {
        PingRelayError::Internal(format!(
            "template {} has malformed embedded messages: {e}",
            template.id
        ))
    })?;
    Ok(embedded
        .into_iter()
        .enumerate()
        .map(|(i, spec)| spec.resolve(i as i64))
        .collect())
}
