//! Cached per-user score row, derived from the ledger.

use crate::core::error::ResonanceError;
use crate::engine::types::Stat;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ScoreSnapshot {
    pub user_id: String,
    pub questing: i64,
    pub wayfinder: i64,
    pub attunement: i64,
    pub mana: i64,
    pub nexus: i64,
    pub total: i64,
    pub last_calculated_at: DateTime<Utc>,
}

impl ScoreSnapshot {
    pub fn zeroed(user_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            questing: 0,
            wayfinder: 0,
            attunement: 0,
            mana: 0,
            nexus: 0,
            total: 0,
            last_calculated_at: now,
        }
    }

    /// Build from raw ledger sums, flooring each stat at zero.
    pub fn from_sums(user_id: &str, sums: &FxHashMap<Stat, i64>, now: DateTime<Utc>) -> Self {
        let mut snapshot = Self::zeroed(user_id, now);
        for stat in Stat::ALL {
            let value = sums.get(&stat).copied().unwrap_or(0).max(0);
            *snapshot.stat_mut(stat) = value;
        }
        snapshot.total = snapshot.stat_sum();
        snapshot
    }

    pub fn stat(&self, stat: Stat) -> i64 {
        match stat {
            Stat::Questing => self.questing,
            Stat::Wayfinder => self.wayfinder,
            Stat::Attunement => self.attunement,
            Stat::Mana => self.mana,
            Stat::Nexus => self.nexus,
        }
    }

    fn stat_mut(&mut self, stat: Stat) -> &mut i64 {
        match stat {
            Stat::Questing => &mut self.questing,
            Stat::Wayfinder => &mut self.wayfinder,
            Stat::Attunement => &mut self.attunement,
            Stat::Mana => &mut self.mana,
            Stat::Nexus => &mut self.nexus,
        }
    }

    pub fn stat_sum(&self) -> i64 {
        Stat::ALL.iter().map(|s| self.stat(*s)).sum()
    }

    /// Same five stats and total, ignoring `last_calculated_at`.
    pub fn same_scores(&self, other: &ScoreSnapshot) -> bool {
        Stat::ALL.iter().all(|s| self.stat(*s) == other.stat(*s)) && self.total == other.total
    }
}

pub fn load(conn: &Connection, user_id: &str) -> Result<Option<ScoreSnapshot>, ResonanceError> {
    let snapshot = conn
        .query_row(
            "SELECT user_id, questing, wayfinder, attunement, mana, nexus, total, last_calculated_at
             FROM score_snapshots WHERE user_id = ?1",
            params![user_id],
            |row| {
                Ok(ScoreSnapshot {
                    user_id: row.get(0)?,
                    questing: row.get(1)?,
                    wayfinder: row.get(2)?,
                    attunement: row.get(3)?,
                    mana: row.get(4)?,
                    nexus: row.get(5)?,
                    total: row.get(6)?,
                    last_calculated_at: row.get(7)?,
                })
            },
        )
        .optional()?;
    Ok(snapshot)
}

/// Create a zeroed row for `user_id` if none exists.
pub fn ensure(conn: &Connection, user_id: &str, now: DateTime<Utc>) -> Result<(), ResonanceError> {
    conn.execute(
        "INSERT INTO score_snapshots(user_id, last_calculated_at) VALUES(?1, ?2)
         ON CONFLICT(user_id) DO NOTHING",
        params![user_id, now],
    )?;
    Ok(())
}

/// `stat = max(0, stat + delta)` with `total` set to the sum of the updated columns.
pub fn apply_delta(
    conn: &Connection,
    user_id: &str,
    stat: Stat,
    delta: i64,
    now: DateTime<Utc>,
) -> Result<(), ResonanceError> {
    ensure(conn, user_id, now)?;
    let col = stat.column();
    let updated = format!("MAX(0, {col} + ?2)");
    // SET expressions all read the pre-update row.
    let total = Stat::ALL
        .iter()
        .map(|s| {
            if *s == stat {
                updated.clone()
            } else {
                s.column().to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" + ");
    let sql = format!(
        "UPDATE score_snapshots
         SET {col} = {updated},
             total = {total},
             last_calculated_at = ?3
         WHERE user_id = ?1"
    );
    conn.execute(&sql, params![user_id, delta, now])?;
    Ok(())
}

/// Replace the cached row wholesale.
pub fn overwrite(conn: &Connection, snapshot: &ScoreSnapshot) -> Result<(), ResonanceError> {
    conn.execute(
        "INSERT INTO score_snapshots(user_id, questing, wayfinder, attunement, mana, nexus, total, last_calculated_at)
         VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(user_id) DO UPDATE SET
             questing = excluded.questing,
             wayfinder = excluded.wayfinder,
             attunement = excluded.attunement,
             mana = excluded.mana,
             nexus = excluded.nexus,
             total = excluded.total,
             last_calculated_at = excluded.last_calculated_at",
        params![
            snapshot.user_id,
            snapshot.questing,
            snapshot.wayfinder,
            snapshot.attunement,
            snapshot.mana,
            snapshot.nexus,
            snapshot.total,
            snapshot.last_calculated_at,
        ],
    )?;
    Ok(())
}
