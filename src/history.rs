use rusqlite::Connection;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq)]
pub struct MatchRun {
    pub id: Option<i64>,
    pub ran_at: Option<String>,
    pub stream_a: String,
    pub stream_b: String,
    pub checksum_a: Option<String>,
    pub checksum_b: Option<String>,
    pub accepted: usize,
    pub rejected: usize,
    pub warnings: usize,
    pub min_confidence: f64,
}

pub fn record_run(conn: &Connection, run: &MatchRun) -> Result<i64> {
    conn.execute(
        "INSERT INTO match_runs (stream_a, stream_b, checksum_a, checksum_b, accepted, rejected, warnings, min_confidence) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            run.stream_a,
            run.stream_b,
            run.checksum_a,
            run.checksum_b,
            run.accepted as i64,
            run.rejected as i64,
            run.warnings as i64,
            run.min_confidence,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Most recent runs first.
pub fn list_runs(conn: &Connection, limit: usize) -> Result<Vec<MatchRun>> {
    let mut stmt = conn.prepare(
        "SELECT id, ran_at, stream_a, stream_b, checksum_a, checksum_b, accepted, rejected, warnings, min_confidence \
         FROM match_runs ORDER BY id DESC LIMIT ?1",
    )?;
    let rows = stmt
        .query_map([limit as i64], |row| {
            Ok(MatchRun {
                id: row.get(0)?,
                ran_at: row.get(1)?,
                stream_a: row.get(2)?,
                stream_b: row.get(3)?,
                checksum_a: row.get(4)?,
                checksum_b: row.get(5)?,
                accepted: row.get::<_, i64>(6)? as usize,
                rejected: row.get::<_, i64>(7)? as usize,
                warnings: row.get::<_, i64>(8)? as usize,
                min_confidence: row.get(9)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
