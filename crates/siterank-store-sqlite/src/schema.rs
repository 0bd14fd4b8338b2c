//! SQL schema for the siterank SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One row per normalised host. Rows are upserted, never appended.
CREATE TABLE IF NOT EXISTS page_ranks (
    host        TEXT PRIMARY KEY,
    rank        REAL,                               -- clamped to [-1, 1] on read
    info        TEXT NOT NULL,
    categories  TEXT NOT NULL DEFAULT '[]',         -- JSON array of strings
    quality     TEXT NOT NULL DEFAULT 'unknown',
    updated_at  TEXT NOT NULL                       -- RFC 3339 UTC, fixed width
);

CREATE INDEX IF NOT EXISTS page_ranks_updated_idx ON page_ranks(updated_at);

PRAGMA user_version = 1;
";
