// SPDX-FileCopyrightText: 2026 PingRelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Schedule operations.

use chrono::{DateTime, SecondsFormat, Utc};
use pingrelay_core::{PingRelayError, ScheduleStatus, VariableEntry};
use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::models::{Schedule, column_datetime, column_enum, column_json, now_rfc3339};

const SCHEDULE_COLUMNS: &str =
    "id, group_name, template_id, event_date, variables, status, created_at, updated_at";

fn row_to_schedule(row: &rusqlite::Row<'_>) -> Result<Schedule, rusqlite::Error> {
    Ok(Schedule {
        id: row.get(0)?,
        group_name: row.get(1)?,
        template_id: row.get(2)?,
        event_date: column_datetime(row, 3)?,
        variables: column_json(row, 4)?,
        status: column_enum(row, 5)?,
        created_at: column_datetime(row, 6)?,
        updated_at: column_datetime(row, 7)?,
    })
}

/// Creates a pending schedule.
pub async fn create_schedule(
    db: &Database,
    group_name: &str,
    template_id: &str,
    event_date: DateTime<Utc>,
    variables: &[VariableEntry],
) -> Result<Schedule, PingRelayError> {
    let id = Uuid::new_v4().to_string();
    let variables_json = serde_json::to_string(variables)
        .map_err(|e| PingRelayError::Internal(format!("failed to encode variables: {e}")))?;

    let row_id = id.clone();
    let group_name_owned = group_name.to_string();
    let template_id_owned = template_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO schedules (id, group_name, template_id, event_date,
                     variables, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6, ?6)",
                params![
                    row_id,
                    group_name_owned,
                    template_id_owned,
                    event_date.to_rfc3339_opts(SecondsFormat::Millis, true),
                    variables_json,
                    now_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    get_schedule(db, &id)
        .await?
        .ok_or_else(|| PingRelayError::Internal(format!("schedule {id} missing after insert")))
}

/// Fetches a schedule by id.
pub async fn get_schedule(db: &Database, id: &str) -> Result<Option<Schedule>, PingRelayError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!("SELECT {SCHEDULE_COLUMNS} FROM schedules WHERE id = ?1"),
                params![id],
                row_to_schedule,
            );
            match result {
                Ok(schedule) => Ok(Some(schedule)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Lists schedules still eligible for dispatch (pending or running).
pub async fn list_active(db: &Database) -> Result<Vec<Schedule>, PingRelayError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SCHEDULE_COLUMNS} FROM schedules
                 WHERE status IN ('pending', 'running')
                 ORDER BY created_at ASC"
            ))?;
            let schedules = stmt
                .query_map([], row_to_schedule)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(schedules)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Moves a schedule to a new lifecycle status.
pub async fn update_status(
    db: &Database,
    id: &str,
    status: ScheduleStatus,
) -> Result<bool, PingRelayError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE schedules SET status = ?1, updated_at = ?2 WHERE id = ?3",
                params![status.to_string(), now_rfc3339(), id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn event_date() -> DateTime<Utc> {
        "2026-09-15T18:00:00Z".parse().unwrap()
    }

    #[tokio::test]
    async fn create_round_trips_variables_and_date() {
        let (db, _dir) = setup_db().await;

        let variables = vec![
            VariableEntry { key: "name".into(), value: "Ana".into() },
            VariableEntry { key: "link".into(), value: "https://x".into() },
        ];
        let schedule = create_schedule(&db, "Launch Group", "tmpl-1", event_date(), &variables)
            .await
            .unwrap();

        assert_eq!(schedule.status, ScheduleStatus::Pending);
        assert_eq!(schedule.event_date, event_date());
        assert_eq!(schedule.variables, variables);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn list_active_excludes_terminal_schedules() {
        let (db, _dir) = setup_db().await;

        let s1 = create_schedule(&db, "G1", "t", event_date(), &[]).await.unwrap();
        let s2 = create_schedule(&db, "G2", "t", event_date(), &[]).await.unwrap();
        let s3 = create_schedule(&db, "G3", "t", event_date(), &[]).await.unwrap();

        update_status(&db, &s1.id, ScheduleStatus::Running).await.unwrap();
        update_status(&db, &s2.id, ScheduleStatus::Completed).await.unwrap();
        update_status(&db, &s3.id, ScheduleStatus::Failed).await.unwrap();

        let active = list_active(&db).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, s1.id);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn update_status_on_unknown_id_is_false() {
        let (db, _dir) = setup_db().await;
        assert!(!update_status(&db, "nope", ScheduleStatus::Failed).await.unwrap());
        db.close().await.unwrap();
    }
}
