//! The Engagement Store: authoritative per-initiative engagement state.
//!
//! Holds the vote membership set and the ordered comment log for every
//! initiative and exposes only atomic, invariant-preserving primitives for
//! mutating them:
//!
//! - [`EngagementStore::toggle_vote`] and [`EngagementStore::append_comment`]
//!   each run as one `BEGIN IMMEDIATE` transaction whose counter updates are
//!   relative to the stored value (`vote_count = vote_count + 1`)
//! - every call opens its own connection; SQLite's write lock and the busy
//!   timeout serialize concurrent writers
//!
//! Read helpers live here; mutations live in [`engagement`] and [`catalog`];
//! invariant auditing lives in [`audit`].

pub mod audit;
pub mod catalog;
pub mod engagement;

use crate::db;
use crate::error::EngagementError;
use crate::model::{
    Comment, CommentId, Gender, Initiative, InitiativeId, User, UserId, micros_to_datetime,
};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row, params, types::Type};
use std::path::{Path, PathBuf};

/// Handle to the SQLite-backed store. Cheap to clone and share across threads.
#[derive(Debug, Clone)]
pub struct EngagementStore {
    path: PathBuf,
}

impl EngagementStore {
    /// Open (creating and migrating if needed) the store at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created or migrated.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        drop(db::open_store(&path)?);
        tracing::debug!(path = %path.display(), "engagement store ready");
        Ok(Self { path })
    }

    /// Location of the backing database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn connect(&self) -> Result<Connection, EngagementError> {
        Ok(db::connect(&self.path)?)
    }

    /// Read one initiative with its membership set and full comment log.
    ///
    /// # Errors
    ///
    /// Returns [`EngagementError::NotFound`] if the initiative is absent, or
    /// [`EngagementError::Storage`] if the read fails.
    pub fn get(&self, id: &InitiativeId) -> Result<Initiative, EngagementError> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let initiative = load_initiative(&tx, id)?
            .ok_or_else(|| EngagementError::initiative_not_found(id.as_str()))?;
        tx.commit()?;
        Ok(initiative)
    }

    /// Comments of one initiative in append order.
    ///
    /// # Errors
    ///
    /// Returns [`EngagementError::NotFound`] if the initiative is absent.
    pub fn comments(&self, id: &InitiativeId) -> Result<Vec<Comment>, EngagementError> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        if !initiative_exists(&tx, id)? {
            return Err(EngagementError::initiative_not_found(id.as_str()));
        }
        let comments = load_comments(&tx, id)?;
        tx.commit()?;
        Ok(comments)
    }
}

// ---------------------------------------------------------------------------
// Row helpers
// ---------------------------------------------------------------------------

const INITIATIVE_COLUMNS: &str = "i.initiative_id, i.title, i.description, i.image_url, \
     i.creator_id, i.vote_count, i.comment_count, i.created_at_us";

pub(crate) fn initiative_exists(conn: &Connection, id: &InitiativeId) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM initiatives WHERE initiative_id = ?1)",
        params![id.as_str()],
        |row| row.get(0),
    )
}

/// Load the full aggregate, or `None` when absent.
pub(crate) fn load_initiative(
    conn: &Connection,
    id: &InitiativeId,
) -> rusqlite::Result<Option<Initiative>> {
    let sql = format!("SELECT {INITIATIVE_COLUMNS} FROM initiatives i WHERE i.initiative_id = ?1");
    let Some(mut initiative) = conn
        .query_row(&sql, params![id.as_str()], initiative_from_row)
        .optional()?
    else {
        return Ok(None);
    };
    initiative.liked_by = load_liked_by(conn, id)?;
    initiative.comments = load_comments(conn, id)?;
    Ok(Some(initiative))
}

/// Map the columns of [`INITIATIVE_COLUMNS`] (starting at index 0).
///
/// Membership and comments are left empty; callers fill them in.
pub(crate) fn initiative_from_row(row: &Row<'_>) -> rusqlite::Result<Initiative> {
    let raw_id: String = row.get(0)?;
    let id = InitiativeId::parse(&raw_id).map_err(|e| conversion_error(0, e))?;
    Ok(Initiative {
        id,
        title: row.get(1)?,
        description: row.get(2)?,
        image_url: row.get(3)?,
        creator: user_id_column(row, 4)?,
        liked_by: Vec::new(),
        vote_count: counter_column(row, 5)?,
        comments: Vec::new(),
        comment_count: counter_column(row, 6)?,
        created_at: micros_to_datetime(row.get(7)?),
    })
}

/// Voters in the order their votes were recorded.
pub(crate) fn load_liked_by(
    conn: &Connection,
    id: &InitiativeId,
) -> rusqlite::Result<Vec<UserId>> {
    let mut stmt = conn.prepare_cached(
        "SELECT user_id FROM initiative_votes WHERE initiative_id = ?1 ORDER BY rowid",
    )?;
    let rows = stmt.query_map(params![id.as_str()], |row| user_id_column(row, 0))?;
    rows.collect()
}

pub(crate) fn load_comments(
    conn: &Connection,
    id: &InitiativeId,
) -> rusqlite::Result<Vec<Comment>> {
    let mut stmt = conn.prepare_cached(
        "SELECT comment_id, author_id, body, created_at_us
         FROM initiative_comments
         WHERE initiative_id = ?1
         ORDER BY comment_id",
    )?;
    let rows = stmt.query_map(params![id.as_str()], |row| {
        Ok(Comment {
            id: CommentId(row.get(0)?),
            author: user_id_column(row, 1)?,
            text: row.get(2)?,
            created_at: micros_to_datetime(row.get(3)?),
        })
    })?;
    rows.collect()
}

/// Map `user_id, fullname, email, phone_no, gender, profile_pic_url`
/// starting at column `base`.
pub(crate) fn user_from_row(row: &Row<'_>, base: usize) -> rusqlite::Result<User> {
    let gender: String = row.get(base + 4)?;
    Ok(User {
        id: user_id_column(row, base)?,
        fullname: row.get(base + 1)?,
        email: row.get(base + 2)?,
        phone_no: row.get(base + 3)?,
        gender: gender
            .parse::<Gender>()
            .map_err(|e| conversion_error(base + 4, e))?,
        profile_pic_url: row.get(base + 5)?,
    })
}

pub(crate) fn user_id_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<UserId> {
    let raw: String = row.get(idx)?;
    UserId::parse(&raw).map_err(|e| conversion_error(idx, e))
}

/// Counters are `CHECK (>= 0)` in the schema.
pub(crate) fn counter_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<u64> {
    let raw: i64 = row.get(idx)?;
    u64::try_from(raw).map_err(|e| conversion_error(idx, e))
}

fn conversion_error(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::EngagementStore;
    use crate::model::{Initiative, NewInitiative, UserId};
    use tempfile::TempDir;

    pub fn temp_store() -> (TempDir, EngagementStore) {
        let dir = tempfile::tempdir().expect("create temp dir");
        let store = EngagementStore::open(dir.path().join("gram.sqlite3")).expect("open store");
        (dir, store)
    }

    pub fn seed(store: &EngagementStore, title: &str) -> Initiative {
        store
            .create_initiative(&NewInitiative {
                title: title.to_string(),
                description: format!("{title} description"),
                creator: UserId::parse("creator").expect("creator id"),
                image_url: None,
            })
            .expect("create initiative")
    }

    pub fn user(raw: &str) -> UserId {
        UserId::parse(raw).expect("user id")
    }
}
