//! SQL schema for the Agora SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
PRAGMA busy_timeout = 5000;

CREATE TABLE IF NOT EXISTS users (
    user_id             TEXT PRIMARY KEY,
    external_subject_id TEXT NOT NULL UNIQUE,
    username            TEXT NOT NULL UNIQUE,
    first_name          TEXT NOT NULL,
    last_name           TEXT NOT NULL,
    created_at          TEXT NOT NULL
);

-- Posts are never deleted; soft deletion clears is_active.
CREATE TABLE IF NOT EXISTS posts (
    post_id    TEXT PRIMARY KEY,
    author_id  TEXT NOT NULL REFERENCES users(user_id),
    content    TEXT NOT NULL,
    category   TEXT NOT NULL CHECK (category IN ('GENERAL', 'ANNOUNCEMENT', 'QUESTION')),
    image_url  TEXT,
    is_active  INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL    -- RFC 3339, fixed microsecond precision
);

CREATE TABLE IF NOT EXISTS comments (
    comment_id TEXT PRIMARY KEY,
    post_id    TEXT NOT NULL REFERENCES posts(post_id),
    author_id  TEXT NOT NULL REFERENCES users(user_id),
    content    TEXT NOT NULL,
    is_active  INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL
);

-- One like per (user, post). The toggle protocol relies on this index.
CREATE TABLE IF NOT EXISTS likes (
    like_id    TEXT PRIMARY KEY,
    user_id    TEXT NOT NULL REFERENCES users(user_id),
    post_id    TEXT NOT NULL REFERENCES posts(post_id),
    created_at TEXT NOT NULL,
    UNIQUE (user_id, post_id)
);

-- Refresh-token sessions. Rows are superseded, never deleted.
CREATE TABLE IF NOT EXISTS sessions (
    session_id    TEXT PRIMARY KEY,
    subject_id    TEXT NOT NULL,
    refresh_hash  TEXT NOT NULL UNIQUE,
    issued_at     TEXT NOT NULL,
    expires_at    TEXT NOT NULL,
    superseded_at TEXT
);

CREATE INDEX IF NOT EXISTS posts_active_idx      ON posts(is_active, created_at, post_id);
CREATE INDEX IF NOT EXISTS comments_post_idx     ON comments(post_id, created_at);
CREATE INDEX IF NOT EXISTS likes_post_idx        ON likes(post_id);
CREATE INDEX IF NOT EXISTS sessions_subject_idx  ON sessions(subject_id) WHERE superseded_at IS NULL;

PRAGMA user_version = 1;
";
