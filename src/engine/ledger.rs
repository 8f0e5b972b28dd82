//! Append-only ledger of point-awarding events; the source of truth.
//!
//! Rows are only ever inserted. The schema's triggers abort any `UPDATE` or `DELETE`,
//! so snapshot and cap state can always be re-derived from here.

use crate::core::error::ResonanceError;
use crate::core::store::Store;
use crate::engine::types::{ReasonCode, Stat, validate_id};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub id: String,
    pub user_id: String,
    pub stat: Stat,
    pub points: i64,
    pub source_object_id: String,
    pub reason_code: ReasonCode,
    pub created_at: DateTime<Utc>,
}

const ENTRY_COLUMNS: &str =
    "id, user_id, stat, points, source_object_id, reason_code, created_at";

fn row_to_entry(row: &rusqlite::Row<'_>) -> Result<LedgerEntry, rusqlite::Error> {
    Ok(LedgerEntry {
        id: row.get(0)?,
        user_id: row.get(1)?,
        stat: row.get(2)?,
        points: row.get(3)?,
        source_object_id: row.get(4)?,
        reason_code: row.get(5)?,
        created_at: row.get(6)?,
    })
}

/// Insert `entry` unless its `(user_id, stat, source_object_id)` already exists.
///
/// Returns `false` for an existing key; that is a no-op, not a conflict.
pub fn append(conn: &Connection, entry: &LedgerEntry) -> Result<bool, ResonanceError> {
    let changed = conn.execute(
        "INSERT INTO ledger_entries(id, user_id, stat, points, source_object_id, reason_code, created_at)
         VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(user_id, stat, source_object_id) DO NOTHING",
        params![
            entry.id,
            entry.user_id,
            entry.stat,
            entry.points,
            entry.source_object_id,
            entry.reason_code,
            entry.created_at,
        ],
    )?;
    Ok(changed == 1)
}

pub fn exists(
    conn: &Connection,
    user_id: &str,
    stat: Stat,
    source_object_id: &str,
) -> Result<bool, ResonanceError> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM ledger_entries WHERE user_id = ?1 AND stat = ?2 AND source_object_id = ?3",
            params![user_id, stat, source_object_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

pub fn find(
    conn: &Connection,
    user_id: &str,
    stat: Stat,
    source_object_id: &str,
) -> Result<Option<LedgerEntry>, ResonanceError> {
    let sql = format!(
        "SELECT {} FROM ledger_entries WHERE user_id = ?1 AND stat = ?2 AND source_object_id = ?3",
        ENTRY_COLUMNS
    );
    let entry = conn
        .query_row(&sql, params![user_id, stat, source_object_id], row_to_entry)
        .optional()?;
    Ok(entry)
}

/// A page of a user's entries, newest first.
///
/// `limit` must be at least 1 and is capped at `ledger.max_page_size`.
pub fn query(
    store: &Store,
    user_id: &str,
    limit: u32,
    offset: u32,
) -> Result<Vec<LedgerEntry>, ResonanceError> {
    validate_id("user_id", user_id)?;
    if limit == 0 {
        return Err(ResonanceError::ValidationError(
            "limit must be at least 1".to_string(),
        ));
    }
    let limit = limit.min(store.config.ledger.max_page_size);

    store.broker().with_conn(&store.db_path(), |conn| {
        let sql = format!(
            "SELECT {} FROM ledger_entries WHERE user_id = ?1 ORDER BY seq DESC LIMIT ?2 OFFSET ?3",
            ENTRY_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![user_id, limit, offset], row_to_entry)?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    })
}

/// Raw per-stat sums of a user's entries (not floored).
pub fn sums_by_stat(
    conn: &Connection,
    user_id: &str,
) -> Result<FxHashMap<Stat, i64>, ResonanceError> {
    let mut stmt = conn.prepare(
        "SELECT stat, COALESCE(SUM(points), 0) FROM ledger_entries WHERE user_id = ?1 GROUP BY stat",
    )?;
    let rows = stmt.query_map(params![user_id], |row| {
        Ok((row.get::<_, Stat>(0)?, row.get::<_, i64>(1)?))
    })?;
    let mut sums = FxHashMap::default();
    for r in rows {
        let (stat, sum) = r?;
        sums.insert(stat, sum);
    }
    Ok(sums)
}

/// Every user id that appears in the ledger or owns a cached snapshot, sorted.
pub fn known_users(conn: &Connection) -> Result<Vec<String>, ResonanceError> {
    let mut stmt = conn.prepare(
        "SELECT user_id FROM ledger_entries
         UNION
         SELECT user_id FROM score_snapshots
         ORDER BY user_id",
    )?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    let mut users = Vec::new();
    for r in rows {
        users.push(r?);
    }
    Ok(users)
}

/// SHA-256 over a user's entries in append order.
///
/// Each entry contributes `id|stat|points|source_object_id|reason_code|created_at\n`,
/// so the digest changes if any row is added, altered or reordered.
pub fn digest(store: &Store, user_id: &str) -> Result<String, ResonanceError> {
    validate_id("user_id", user_id)?;
    store.broker().with_conn(&store.db_path(), |conn| {
        let sql = format!(
            "SELECT {} FROM ledger_entries WHERE user_id = ?1 ORDER BY seq ASC",
            ENTRY_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![user_id], row_to_entry)?;
        let mut hasher = Sha256::new();
        for r in rows {
            let e = r?;
            hasher.update(
                format!(
                    "{}|{}|{}|{}|{}|{}\n",
                    e.id,
                    e.stat,
                    e.points,
                    e.source_object_id,
                    e.reason_code,
                    e.created_at.to_rfc3339()
                )
                .as_bytes(),
            );
        }
        Ok(format!("{:x}", hasher.finalize()))
    })
}
