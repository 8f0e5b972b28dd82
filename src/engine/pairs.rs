//! Giver/receiver interaction counts for mana awards.
//!
//! The counter only moves when an award is credited. Nothing reads it to scale points
//! yet; it is kept so a per-pair decay curve can be introduced without a backfill.

use crate::core::error::ResonanceError;
use crate::core::store::Store;
use crate::engine::types::validate_id;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairKey<'a> {
    pub giver_id: &'a str,
    pub receiver_id: &'a str,
}

/// Add exactly one interaction for the pair. Runs inside the award transaction.
pub fn increment(
    conn: &Connection,
    pair: PairKey<'_>,
    now: DateTime<Utc>,
) -> Result<i64, ResonanceError> {
    let count: i64 = conn.query_row(
        "INSERT INTO pair_interactions(giver_id, receiver_id, count, updated_at)
         VALUES(?1, ?2, 1, ?3)
         ON CONFLICT(giver_id, receiver_id) DO UPDATE SET
             count = count + 1,
             updated_at = excluded.updated_at
         RETURNING count",
        params![pair.giver_id, pair.receiver_id, now],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn count(conn: &Connection, pair: PairKey<'_>) -> Result<i64, ResonanceError> {
    let count: Option<i64> = conn
        .query_row(
            "SELECT count FROM pair_interactions WHERE giver_id = ?1 AND receiver_id = ?2",
            params![pair.giver_id, pair.receiver_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(count.unwrap_or(0))
}

/// Credited interactions from `giver_id` to `receiver_id`; zero when none.
pub fn interaction_count(
    store: &Store,
    giver_id: &str,
    receiver_id: &str,
) -> Result<i64, ResonanceError> {
    validate_id("giver_id", giver_id)?;
    validate_id("receiver_id", receiver_id)?;
    store.broker().with_conn(&store.db_path(), |conn| {
        count(
            conn,
            PairKey {
                giver_id,
                receiver_id,
            },
        )
    })
}
