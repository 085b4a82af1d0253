//! SQL schema for the staffing SQLite backend.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA busy_timeout = 5000;

-- One row per collection. `value` is the whole collection as a JSON array;
-- it is stored verbatim and never parsed by SQLite.
CREATE TABLE IF NOT EXISTS documents (
    key         TEXT PRIMARY KEY,
    value       TEXT NOT NULL,
    updated_at  TEXT NOT NULL      -- ISO 8601 UTC; last write
);

PRAGMA user_version = 1;
";
