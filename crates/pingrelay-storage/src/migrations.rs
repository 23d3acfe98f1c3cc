// SPDX-FileCopyrightText: 2026 PingRelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedded schema migrations.
//!
//! SQL files live under `migrations/` and are compiled into the binary by
//! refinery; [`run`] is invoked once when the database is opened.

use tracing::debug;

mod embedded {
    refinery::embed_migrations!("migrations");
}

/// Applies any pending migrations to the given connection.
pub fn run(conn: &mut rusqlite::Connection) -> Result<(), refinery::Error> {
    let report = embedded::migrations::runner().run(conn)?;
    for migration in report.applied_migrations() {
        debug!(version = %migration.version(), name = %migration.name(), "applied migration");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_apply_to_fresh_database() {
        let mut conn = rusqlite::Connection::open_in_memory().unwrap();
        run(&mut conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        for expected in ["phones", "templates", "messages", "schedules", "deliveries", "delivery_logs"] {
            assert!(tables.iter().any(|t| t == expected), "missing table {expected}");
        }
    }

    #[test]
    fn migrations_are_idempotent() {
        let mut conn = rusqlite::Connection::open_in_memory().unwrap();
        run(&mut conn).unwrap();
        run(&mut conn).unwrap();
    }
}
