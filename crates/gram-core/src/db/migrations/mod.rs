//! Ordered schema migrations for the engagement store, tracked through
//! `PRAGMA user_version`.

use super::schema;
use rusqlite::{Connection, types::Type};

/// One forward-only schema step.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    pub sql: &'static str,
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "engagement tables",
        sql: schema::MIGRATION_V1_SQL,
    },
    Migration {
        version: 2,
        name: "read-path indexes",
        sql: schema::MIGRATION_V2_SQL,
    },
];

/// Latest schema version understood by this binary.
pub const LATEST_SCHEMA_VERSION: u32 = 2;

/// Schema version recorded in the database file.
///
/// # Errors
///
/// Returns an error if the pragma cannot be read or is negative.
pub fn current_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    let raw: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    u32::try_from(raw)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(0, Type::Integer, Box::new(err)))
}

/// Bring the schema up to [`LATEST_SCHEMA_VERSION`], returning the version
/// reached.
///
/// Each step commits on its own together with the bumped `user_version`, so
/// a failed step leaves the store at the previous version.
///
/// # Errors
///
/// Returns an error if any step fails.
pub fn migrate(conn: &mut Connection) -> rusqlite::Result<u32> {
    let start = current_schema_version(conn)?;
    let mut reached = start;

    for step in MIGRATIONS.iter().filter(|m| m.version > start) {
        let tx = conn.transaction()?;
        tx.execute_batch(step.sql)?;
        tx.pragma_update(None, "user_version", i64::from(step.version))?;
        tx.execute(
            "UPDATE store_meta SET schema_version = ?1 WHERE id = 1",
            [i64::from(step.version)],
        )?;
        tx.commit()?;
        tracing::debug!(version = step.version, name = step.name, "store migrated");
        reached = step.version;
    }

    Ok(reached)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object_names(conn: &Connection, kind: &str) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = ?1 ORDER BY name")
            .expect("prepare");
        stmt.query_map([kind], |row| row.get(0))
            .expect("query")
            .collect::<Result<_, _>>()
            .expect("names")
    }

    #[test]
    fn migrations_are_contiguous_and_end_at_latest() {
        for (idx, step) in MIGRATIONS.iter().enumerate() {
            assert_eq!(step.version as usize, idx + 1, "gap before {}", step.name);
        }
        assert_eq!(
            MIGRATIONS.last().map(|m| m.version),
            Some(LATEST_SCHEMA_VERSION)
        );
    }

    #[test]
    fn fresh_database_gets_every_table_and_index() {
        let mut conn = Connection::open_in_memory().expect("open");
        assert_eq!(migrate(&mut conn).expect("migrate"), LATEST_SCHEMA_VERSION);

        let tables = object_names(&conn, "table");
        for table in [
            "initiative_comments",
            "initiative_votes",
            "initiatives",
            "store_meta",
            "users",
        ] {
            assert!(tables.iter().any(|t| t == table), "missing table {table}");
        }
        let indexes = object_names(&conn, "index");
        for index in schema::REQUIRED_INDEXES {
            assert!(indexes.iter().any(|i| i == index), "missing index {index}");
        }
    }

    #[test]
    fn second_run_is_a_no_op() {
        let mut conn = Connection::open_in_memory().expect("open");
        migrate(&mut conn).expect("first");
        assert_eq!(migrate(&mut conn).expect("second"), LATEST_SCHEMA_VERSION);

        let (rows, recorded): (i64, i64) = conn
            .query_row(
                "SELECT COUNT(*), MAX(schema_version) FROM store_meta",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .expect("store_meta");
        assert_eq!(rows, 1);
        assert_eq!(recorded, i64::from(LATEST_SCHEMA_VERSION));
    }

    #[test]
    fn v1_store_upgrades_without_losing_initiatives() {
        let mut conn = Connection::open_in_memory().expect("open");
        conn.execute_batch(schema::MIGRATION_V1_SQL).expect("v1");
        conn.pragma_update(None, "user_version", 1_i64).expect("pragma");
        conn.execute(
            "INSERT INTO initiatives (initiative_id, title, creator_id, created_at_us)
             VALUES ('in-1', 'Clean the lake shore', 'alice', 1)",
            [],
        )
        .expect("seed");

        assert_eq!(migrate(&mut conn).expect("migrate"), LATEST_SCHEMA_VERSION);
        let title: String = conn
            .query_row("SELECT title FROM initiatives WHERE initiative_id = 'in-1'", [], |row| {
                row.get(0)
            })
            .expect("title");
        assert_eq!(title, "Clean the lake shore");
        assert!(object_names(&conn, "index").iter().any(|i| i == "idx_votes_user"));
    }

    #[test]
    fn negative_counters_are_rejected() {
        let mut conn = Connection::open_in_memory().expect("open");
        migrate(&mut conn).expect("migrate");
        let inserted = conn.execute(
            "INSERT INTO initiatives (initiative_id, title, creator_id, vote_count, created_at_us)
             VALUES ('in-2', 'Bad', 'alice', -1, 2)",
            [],
        );
        assert!(inserted.is_err());
    }
}
