//! Time-windowed quota buckets.
//!
//! A bucket is keyed by `(user_id, stat, period_key)`. A new period key starts a new
//! row, so there is no reset job. The clamp is one conditional `UPDATE … RETURNING`:
//! SQLite evaluates every `SET` expression against the pre-update row, so
//! `last_reserved` and the new `points_earned` are computed from the same snapshot of
//! `points_earned` and no two writers can both claim the last few points.

use crate::core::error::ResonanceError;
use crate::core::store::Store;
use crate::core::time;
use crate::engine::types::{Stat, validate_id};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CapBucket {
    pub user_id: String,
    pub stat: Stat,
    pub period_key: String,
    pub points_earned: i64,
    pub cap_limit: i64,
}

impl CapBucket {
    pub fn remaining(&self) -> i64 {
        (self.cap_limit - self.points_earned).max(0)
    }
}

/// Period key of `stat`'s configured window at the store's current time.
pub fn current_period_key(store: &Store, stat: Stat) -> String {
    time::period_key(store.config.caps.rule(stat).window, store.now())
}

pub fn find_bucket(
    conn: &Connection,
    user_id: &str,
    stat: Stat,
    period_key: &str,
) -> Result<Option<CapBucket>, ResonanceError> {
    let bucket = conn
        .query_row(
            "SELECT user_id, stat, period_key, points_earned, cap_limit
             FROM cap_buckets WHERE user_id = ?1 AND stat = ?2 AND period_key = ?3",
            params![user_id, stat, period_key],
            |row| {
                Ok(CapBucket {
                    user_id: row.get(0)?,
                    stat: row.get(1)?,
                    period_key: row.get(2)?,
                    points_earned: row.get(3)?,
                    cap_limit: row.get(4)?,
                })
            },
        )
        .optional()?;
    Ok(bucket)
}

/// Points `user_id` may still earn for `stat` in `period_key`.
///
/// A period with no bucket yet reports the configured limit.
pub fn get_remaining(
    store: &Store,
    user_id: &str,
    stat: Stat,
    period_key: &str,
) -> Result<i64, ResonanceError> {
    validate_id("user_id", user_id)?;
    let configured = store.config.caps.rule(stat).limit;
    store.broker().with_conn(&store.db_path(), |conn| {
        Ok(find_bucket(conn, user_id, stat, period_key)?
            .map(|b| b.remaining())
            .unwrap_or(configured))
    })
}

/// Reserve up to `gross` points in the bucket and return what was granted:
/// `max(0, min(gross, cap_limit - points_earned))`.
///
/// `cap_limit` only seeds a bucket created by this call; an existing bucket keeps the
/// limit it was created with. Must run inside the caller's write transaction.
pub fn clamp_and_reserve(
    conn: &Connection,
    user_id: &str,
    stat: Stat,
    period_key: &str,
    cap_limit: i64,
    gross: i64,
    now: DateTime<Utc>,
) -> Result<i64, ResonanceError> {
    if gross <= 0 {
        return Ok(0);
    }

    conn.execute(
        "INSERT INTO cap_buckets(user_id, stat, period_key, points_earned, cap_limit, last_reserved, updated_at)
         VALUES(?1, ?2, ?3, 0, ?4, 0, ?5)
         ON CONFLICT(user_id, stat, period_key) DO NOTHING",
        params![user_id, stat, period_key, cap_limit, now],
    )?;

    let awarded: i64 = conn.query_row(
        "UPDATE cap_buckets
         SET last_reserved = MAX(0, MIN(?4, cap_limit - points_earned)),
             points_earned = points_earned + MAX(0, MIN(?4, cap_limit - points_earned)),
             updated_at = ?5
         WHERE user_id = ?1 AND stat = ?2 AND period_key = ?3
         RETURNING last_reserved",
        params![user_id, stat, period_key, gross, now],
        |row| row.get(0),
    )?;
    Ok(awarded)
}

/// Hand back a reservation made earlier in the same transaction.
pub fn release(
    conn: &Connection,
    user_id: &str,
    stat: Stat,
    period_key: &str,
    points: i64,
    now: DateTime<Utc>,
) -> Result<(), ResonanceError> {
    if points <= 0 {
        return Ok(());
    }
    conn.execute(
        "UPDATE cap_buckets
         SET points_earned = MAX(0, points_earned - ?4),
             last_reserved = 0,
             updated_at = ?5
         WHERE user_id = ?1 AND stat = ?2 AND period_key = ?3",
        params![user_id, stat, period_key, points, now],
    )?;
    Ok(())
}
