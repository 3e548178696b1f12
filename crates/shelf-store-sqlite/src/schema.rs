//! SQL schema for the Shelf SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- `seq` preserves insertion order for listing; `book_id` is the identity.
CREATE TABLE IF NOT EXISTS books (
    seq           INTEGER PRIMARY KEY AUTOINCREMENT,
    book_id       TEXT    NOT NULL UNIQUE,
    title         TEXT    NOT NULL,
    author        TEXT    NOT NULL,
    available     INTEGER NOT NULL DEFAULT 1,
    last_checkout TEXT,                          -- RFC 3339 UTC or NULL
    details_json  TEXT    NOT NULL DEFAULT '{}'  -- JSON-encoded BookDetails
);

-- The checkout ledger is strictly append-only and outlives book records,
-- so there is no foreign key to `books`. `seq` is the only ordering.
CREATE TABLE IF NOT EXISTS checkout_events (
    seq         INTEGER PRIMARY KEY AUTOINCREMENT,
    book_id     TEXT NOT NULL,
    action      TEXT NOT NULL CHECK (action IN ('check_out', 'check_in')),
    recorded_at TEXT NOT NULL                    -- RFC 3339 UTC
);

CREATE TRIGGER IF NOT EXISTS checkout_events_no_update
BEFORE UPDATE ON checkout_events
BEGIN
    SELECT RAISE(ABORT, 'checkout events are append-only');
END;

CREATE TRIGGER IF NOT EXISTS checkout_events_no_delete
BEFORE DELETE ON checkout_events
BEGIN
    SELECT RAISE(ABORT, 'checkout events are append-only');
END;

CREATE INDEX IF NOT EXISTS books_title_idx          ON books(title);
CREATE INDEX IF NOT EXISTS checkout_events_book_idx ON checkout_events(book_id, seq);

PRAGMA user_version = 1;
";
