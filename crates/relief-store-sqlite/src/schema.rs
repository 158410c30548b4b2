//! SQL schema for the Relief SQLite store.
//!
//! Applied at connection startup. `PRAGMA user_version` records which
//! revision a database file carries.

/// Schema revision written by [`SCHEMA`].
pub const VERSION: i64 = 1;

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS requests (
    request_id            TEXT PRIMARY KEY,
    requester_id          TEXT NOT NULL,
    assigned_responder_id TEXT,
    kind                  TEXT NOT NULL,
    description           TEXT NOT NULL,
    location              TEXT NOT NULL,
    address               TEXT NOT NULL,
    latitude              REAL,
    longitude             REAL,
    contact_info          TEXT,
    urgency               TEXT NOT NULL,
    status                TEXT NOT NULL,  -- 'pending' | 'assigned' | 'in_progress' | 'completed' | 'cancelled'
    assigned_at           TEXT,           -- first assignment; never overwritten
    completed_at          TEXT,           -- first completion; never overwritten
    completed_by          TEXT,           -- role name
    deletable             INTEGER NOT NULL,
    created_at            TEXT NOT NULL,  -- fixed-width RFC 3339, sorts lexically
    updated_at            TEXT NOT NULL,
    version               INTEGER NOT NULL DEFAULT 0,
    CHECK ((latitude IS NULL) = (longitude IS NULL))
);

CREATE INDEX IF NOT EXISTS requests_requester_idx ON requests(requester_id);
CREATE INDEX IF NOT EXISTS requests_responder_idx ON requests(assigned_responder_id);
CREATE INDEX IF NOT EXISTS requests_status_idx    ON requests(status);
CREATE INDEX IF NOT EXISTS requests_created_idx   ON requests(created_at);

PRAGMA user_version = 1;
";
