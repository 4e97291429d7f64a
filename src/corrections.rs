//! Append-only log of user institution corrections, keyed by a fingerprint of the
//! statement file path. The latest entry for a fingerprint is the one in force.

use std::collections::HashMap;

use rusqlite::Connection;
use sha2::{Digest, Sha256};

use crate::error::{LedgerError, Result};

fn normalize_path(path: &str) -> String {
    let mut p = path.trim().replace('\\', "/");
    while p.contains("//") {
        p = p.replace("//", "/");
    }
    while let Some(rest) = p.strip_prefix("./") {
        p = rest.to_string();
    }
    p
}

/// SHA-256 of the normalized path text.
pub fn fingerprint(path: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_path(path).as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone)]
pub struct Correction {
    pub id: i64,
    pub fingerprint: String,
    pub path: String,
    pub institution: String,
    pub created_at: String,
}

pub fn record_correction(conn: &Connection, path: &str, institution: &str) -> Result<i64> {
    let institution = institution.trim();
    if institution.is_empty() {
        return Err(LedgerError::Other("institution name must not be empty".to_string()));
    }
    conn.execute(
        "INSERT INTO institution_corrections (fingerprint, path, institution) VALUES (?1, ?2, ?3)",
        rusqlite::params![fingerprint(path), normalize_path(path), institution],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn list_corrections(conn: &Connection) -> Result<Vec<Correction>> {
    let mut stmt = conn.prepare(
        "SELECT id, fingerprint, path, institution, COALESCE(created_at, '') \
         FROM institution_corrections ORDER BY id",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(Correction {
                id: row.get(0)?,
                fingerprint: row.get(1)?,
                path: row.get(2)?,
                institution: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn latest_for(conn: &Connection, path: &str) -> Result<Option<Correction>> {
    let fp = fingerprint(path);
    Ok(list_corrections(conn)?
        .into_iter()
        .filter(|c| c.fingerprint == fp)
        .last())
}

/// Fingerprint -> institution, latest entry wins.
pub fn load_overrides(conn: &Connection) -> Result<HashMap<String, String>> {
    let mut overrides = HashMap::new();
    for c in list_corrections(conn)? {
        overrides.insert(c.fingerprint, c.institution);
    }
    Ok(overrides)
}
