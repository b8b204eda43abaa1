//! Canonical SQLite schema for the engagement store.
//!
//! - `initiatives` keeps the aggregate row, including the two counters
//! - `initiative_votes` is the `likedBy` membership set (one row per voter)
//! - `initiative_comments` is the append-only comment log; its
//!   `AUTOINCREMENT` key is the server-assigned comment id
//! - `users` holds member profiles used to resolve initiative creators
//! - `store_meta` tracks the schema version

/// Migration v1: core tables plus store metadata.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS users (
    user_id TEXT PRIMARY KEY,
    fullname TEXT NOT NULL CHECK (length(trim(fullname)) > 0),
    email TEXT UNIQUE,
    phone_no TEXT UNIQUE,
    gender TEXT NOT NULL DEFAULT 'unspecified'
        CHECK (gender IN ('male', 'female', 'unspecified')),
    profile_pic_url TEXT,
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS initiatives (
    initiative_id TEXT PRIMARY KEY,
    title TEXT NOT NULL CHECK (length(trim(title)) > 0),
    description TEXT NOT NULL DEFAULT '',
    image_url TEXT,
    creator_id TEXT NOT NULL CHECK (length(trim(creator_id)) > 0),
    vote_count INTEGER NOT NULL DEFAULT 0 CHECK (vote_count >= 0),
    comment_count INTEGER NOT NULL DEFAULT 0 CHECK (comment_count >= 0),
    created_at_us INTEGER NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS initiative_votes (
    initiative_id TEXT NOT NULL REFERENCES initiatives(initiative_id) ON DELETE CASCADE,
    user_id TEXT NOT NULL CHECK (length(trim(user_id)) > 0),
    voted_at_us INTEGER NOT NULL,
    PRIMARY KEY (initiative_id, user_id)
);

CREATE TABLE IF NOT EXISTS initiative_comments (
    comment_id INTEGER PRIMARY KEY AUTOINCREMENT,
    initiative_id TEXT NOT NULL REFERENCES initiatives(initiative_id) ON DELETE CASCADE,
    author_id TEXT NOT NULL CHECK (length(trim(author_id)) > 0),
    body TEXT NOT NULL CHECK (length(trim(body)) > 0),
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS store_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version INTEGER NOT NULL
);

INSERT OR IGNORE INTO store_meta (id, schema_version) VALUES (1, 0);
";

/// Migration v2: read-path indexes for listing, comment timelines, and
/// per-user vote lookups.
pub const MIGRATION_V2_SQL: &str = r"
CREATE INDEX IF NOT EXISTS idx_initiatives_created
    ON initiatives(created_at_us DESC);

CREATE INDEX IF NOT EXISTS idx_comments_initiative
    ON initiative_comments(initiative_id, comment_id);

CREATE INDEX IF NOT EXISTS idx_votes_user
    ON initiative_votes(user_id);
";

/// Indexes every migrated store must carry.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_initiatives_created",
    "idx_comments_initiative",
    "idx_votes_user",
];
