//! Connection management for the engagement store.
//!
//! Every connection runs with `busy_timeout = 5s`, `foreign_keys = ON` and
//! `synchronous = NORMAL`. The file itself is switched to WAL once, when the
//! store is first opened.

pub mod migrations;
pub mod schema;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::{path::Path, time::Duration};

/// How long a writer waits on SQLite's write lock before giving up.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const CONNECTION_PRAGMAS: &[(&str, &str)] = &[("foreign_keys", "ON"), ("synchronous", "NORMAL")];

/// Create the store file if needed, enable WAL, and migrate it.
///
/// # Errors
///
/// Returns an error if the directory, the file, or a migration step fails.
pub fn open_store(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create store directory {}", dir.display()))?;
    }

    let mut conn = connect(path).with_context(|| format!("open store {}", path.display()))?;
    let mode: String = conn
        .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
        .context("enable WAL journal")?;
    tracing::trace!(journal_mode = %mode, path = %path.display(), "store opened");
    migrations::migrate(&mut conn).context("apply store migrations")?;
    Ok(conn)
}

/// Open one more connection to a store that [`open_store`] has prepared.
/// Store operations each take their own, so callers contend only on
/// SQLite's write lock.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or configured.
pub fn connect(path: &Path) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
    for (pragma, value) in CONNECTION_PRAGMAS {
        conn.pragma_update(None, pragma, value)?;
    }
    Ok(conn)
}
