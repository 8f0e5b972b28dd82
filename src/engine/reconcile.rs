//! Rebuild cached scores from the ledger.
//!
//! The ledger is ground truth. A snapshot is disposable: `recalculate` re-derives it
//! from entry sums and overwrites whatever was cached.

use crate::core::error::ResonanceError;
use crate::core::store::Store;
use crate::engine::ledger;
use crate::engine::snapshot::{self, ScoreSnapshot};
use crate::engine::types::validate_id;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// A user whose cached row disagreed with the ledger.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Drift {
    pub user_id: String,
    /// `None` when the user had ledger entries but no cached row.
    pub cached: Option<ScoreSnapshot>,
    pub rebuilt: ScoreSnapshot,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ReconcileReport {
    pub users_checked: usize,
    pub drifts: Vec<Drift>,
}

/// Re-derive `user_id`'s snapshot from the ledger, store it and return it.
pub fn recalculate(store: &Store, user_id: &str) -> Result<ScoreSnapshot, ResonanceError> {
    let (_, rebuilt) = rebuild(store, user_id)?;
    Ok(rebuilt)
}

/// Compare the cached row with the ledger without writing.
pub fn audit_user(store: &Store, user_id: &str) -> Result<Option<Drift>, ResonanceError> {
    validate_id("user_id", user_id)?;
    let now = store.now();
    store.broker().with_conn(&store.db_path(), |conn| {
        let sums = ledger::sums_by_stat(conn, user_id)?;
        let rebuilt = ScoreSnapshot::from_sums(user_id, &sums, now);
        let cached = snapshot::load(conn, user_id)?;
        Ok(drift_between(user_id, cached, rebuilt))
    })
}

/// SHA-256 attestation of `user_id`'s ledger, as audited.
pub fn ledger_digest(store: &Store, user_id: &str) -> Result<String, ResonanceError> {
    ledger::digest(store, user_id)
}

/// Recalculate every known user and report those whose cache had drifted.
pub fn reconcile_all(store: &Store) -> Result<ReconcileReport, ResonanceError> {
    let users = store
        .broker()
        .with_conn(&store.db_path(), ledger::known_users)?;

    let rebuilt: Vec<Result<Option<Drift>, ResonanceError>> = users
        .par_iter()
        .map(|user_id| {
            let (cached, rebuilt) = rebuild(store, user_id)?;
            Ok(drift_between(user_id, cached, rebuilt))
        })
        .collect();

    let mut report = ReconcileReport {
        users_checked: users.len(),
        drifts: Vec::new(),
    };
    for result in rebuilt {
        if let Some(drift) = result? {
            report.drifts.push(drift);
        }
    }

    tracing::info!(
        users = report.users_checked,
        drifted = report.drifts.len(),
        "reconciliation pass complete"
    );
    Ok(report)
}

/// Overwrite one user's snapshot from ledger sums; returns `(cached_before, rebuilt)`.
fn rebuild(
    store: &Store,
    user_id: &str,
) -> Result<(Option<ScoreSnapshot>, ScoreSnapshot), ResonanceError> {
    validate_id("user_id", user_id)?;
    let now = store.now();
    let (cached, rebuilt) = store.broker().with_tx(
        &store.db_path(),
        "reconciler",
        "snapshot.recalculate",
        |tx| {
            let cached = snapshot::load(tx, user_id)?;
            let sums = ledger::sums_by_stat(tx, user_id)?;
            let rebuilt = ScoreSnapshot::from_sums(user_id, &sums, now);
            snapshot::overwrite(tx, &rebuilt)?;
            Ok((cached, rebuilt))
        },
    )?;

    if let Some(cached) = &cached {
        if !cached.same_scores(&rebuilt) {
            tracing::warn!(
                user_id,
                cached_total = cached.total,
                ledger_total = rebuilt.total,
                "snapshot drift corrected"
            );
        }
    }
    Ok((cached, rebuilt))
}

fn drift_between(
    user_id: &str,
    cached: Option<ScoreSnapshot>,
    rebuilt: ScoreSnapshot,
) -> Option<Drift> {
    let unchanged = match &cached {
        Some(c) => c.same_scores(&rebuilt),
        // No row and nothing to show equals a lazily-created zero row.
        None => rebuilt.total == 0,
    };
    if unchanged {
        return None;
    }
    Some(Drift {
        user_id: user_id.to_string(),
        cached,
        rebuilt,
    })
}
