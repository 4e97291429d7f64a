use std::path::Path;

use rusqlite::Connection;

use crate::error::Result;
use crate::settings::{db_path, Settings};

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS institution_corrections (
    id INTEGER PRIMARY KEY,
    fingerprint TEXT NOT NULL,
    path TEXT NOT NULL,
    institution TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_corrections_fingerprint
    ON institution_corrections (fingerprint);

CREATE TRIGGER IF NOT EXISTS corrections_no_update
    BEFORE UPDATE ON institution_corrections
BEGIN
    SELECT RAISE(ABORT, 'institution_corrections is append-only');
END;

CREATE TRIGGER IF NOT EXISTS corrections_no_delete
    BEFORE DELETE ON institution_corrections
BEGIN
    SELECT RAISE(ABORT, 'institution_corrections is append-only');
END;

CREATE TABLE IF NOT EXISTS match_runs (
    id INTEGER PRIMARY KEY,
    ran_at TEXT DEFAULT (datetime('now')),
    stream_a TEXT NOT NULL,
    stream_b TEXT NOT NULL,
    checksum_a TEXT,
    checksum_b TEXT,
    accepted INTEGER NOT NULL,
    rejected INTEGER NOT NULL,
    warnings INTEGER NOT NULL,
    min_confidence REAL NOT NULL
);
";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// Connect to the configured database, creating the data dir and schema on first use.
pub fn open(settings: &Settings) -> Result<Connection> {
    std::fs::create_dir_all(&settings.data_dir)?;
    let conn = get_connection(&db_path(settings))?;
    init_db(&conn)?;
    Ok(conn)
}

#[cfg(test)]
pub(crate) fn test_db() -> (tempfile::TempDir, Connection) {
    let dir = tempfile::tempdir().unwrap();
    let conn = get_connection(&dir.path().join("test.db")).unwrap();
    init_db(&conn).unwrap();
    (dir, conn)
}
