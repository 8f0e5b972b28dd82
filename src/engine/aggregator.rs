//! Award orchestration: dedupe, compute, clamp, append, cache.
//!
//! One award is one `BEGIN IMMEDIATE` transaction covering the cap bucket, the ledger
//! row, the snapshot row and the pair counter. Either all of them move or none do.

use crate::core::error::ResonanceError;
use crate::core::store::Store;
use crate::core::time;
use crate::engine::caps;
use crate::engine::ledger::{self, LedgerEntry};
use crate::engine::pairs::{self, PairKey};
use crate::engine::snapshot::{self, ScoreSnapshot};
use crate::engine::types::{ReasonCode, Stat, validate_id};
use serde::{Deserialize, Serialize};

/// A request to credit one stat for one source object.
#[derive(Debug, Clone, Copy)]
pub struct AwardRequest<'a> {
    pub user_id: &'a str,
    pub stat: Stat,
    pub source_object_id: &'a str,
    pub reason: ReasonCode,
    /// Mana awards count the helper/receiver pair once credited.
    pub pair: Option<PairKey<'a>>,
}

/// What an award did. Every variant is a success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AwardOutcome {
    Credited {
        entry_id: String,
        gross: i64,
        awarded: i64,
    },
    /// The source object was already rewarded for this stat.
    Duplicate,
    /// The period's quota had nothing left.
    CapExhausted { gross: i64 },
    /// The formula produced no points (e.g. a non-positive mana rating).
    NothingDue,
}

impl AwardOutcome {
    pub fn awarded(&self) -> i64 {
        match self {
            AwardOutcome::Credited { awarded, .. } => *awarded,
            _ => 0,
        }
    }

    pub fn is_credited(&self) -> bool {
        matches!(self, AwardOutcome::Credited { .. })
    }
}

/// Credit `request.stat` for `request.user_id`, at most once per source object and
/// never beyond the current period's cap.
///
/// `gross_points` is evaluated inside the transaction, after the duplicate check.
pub fn award<F>(
    store: &Store,
    request: &AwardRequest<'_>,
    gross_points: F,
) -> Result<AwardOutcome, ResonanceError>
where
    F: Fn() -> i64,
{
    validate_id("user_id", request.user_id)?;
    validate_id("source_object_id", request.source_object_id)?;

    let now = store.now();
    let rule = store.config.caps.rule(request.stat);
    let period_key = time::period_key(rule.window, now);
    let op = format!("award.{}", request.stat);

    let outcome = store
        .broker()
        .with_tx(&store.db_path(), request.user_id, &op, |tx| {
            if ledger::exists(tx, request.user_id, request.stat, request.source_object_id)? {
                return Ok(AwardOutcome::Duplicate);
            }

            let gross = gross_points();
            if gross <= 0 {
                return Ok(AwardOutcome::NothingDue);
            }

            let awarded = caps::clamp_and_reserve(
                tx,
                request.user_id,
                request.stat,
                &period_key,
                rule.limit,
                gross,
                now,
            )?;
            if awarded == 0 {
                return Ok(AwardOutcome::CapExhausted { gross });
            }

            let entry = LedgerEntry {
                id: time::new_entry_id(),
                user_id: request.user_id.to_string(),
                stat: request.stat,
                points: awarded,
                source_object_id: request.source_object_id.to_string(),
                reason_code: request.reason,
                created_at: now,
            };
            if !ledger::append(tx, &entry)? {
                // Unreachable under an immediate transaction; refund rather than double count.
                caps::release(tx, request.user_id, request.stat, &period_key, awarded, now)?;
                return Ok(AwardOutcome::Duplicate);
            }

            snapshot::apply_delta(tx, request.user_id, request.stat, awarded, now)?;

            if let Some(pair) = request.pair {
                pairs::increment(tx, pair, now)?;
            }

            Ok(AwardOutcome::Credited {
                entry_id: entry.id,
                gross,
                awarded,
            })
        })?;

    match &outcome {
        AwardOutcome::Credited { gross, awarded, .. } => tracing::info!(
            user_id = request.user_id,
            stat = %request.stat,
            source = request.source_object_id,
            gross,
            awarded,
            period = %period_key,
            "resonance credited"
        ),
        other => tracing::debug!(
            user_id = request.user_id,
            stat = %request.stat,
            source = request.source_object_id,
            outcome = ?other,
            "award was a no-op"
        ),
    }
    Ok(outcome)
}

/// Append a negative corrective entry.
///
/// Corrections bypass caps (they never consume quota) and dedupe on the source object
/// like any other entry. The recorded amount is clamped to the stat's current ledger
/// balance, so a stat never sums below zero; a stat already at zero yields `NothingDue`.
pub fn record_correction(
    store: &Store,
    user_id: &str,
    stat: Stat,
    source_object_id: &str,
    delta: i64,
) -> Result<AwardOutcome, ResonanceError> {
    validate_id("user_id", user_id)?;
    validate_id("source_object_id", source_object_id)?;
    if delta >= 0 {
        return Err(ResonanceError::ValidationError(format!(
            "correction delta must be negative (got {})",
            delta
        )));
    }

    let now = store.now();
    let outcome = store
        .broker()
        .with_tx(&store.db_path(), user_id, "ledger.correct", |tx| {
            if ledger::exists(tx, user_id, stat, source_object_id)? {
                return Ok(AwardOutcome::Duplicate);
            }

            let balance = ledger::sums_by_stat(tx, user_id)?
                .get(&stat)
                .copied()
                .unwrap_or(0)
                .max(0);
            let applied = delta.max(-balance);
            if applied == 0 {
                return Ok(AwardOutcome::NothingDue);
            }

            let entry = LedgerEntry {
                id: time::new_entry_id(),
                user_id: user_id.to_string(),
                stat,
                points: applied,
                source_object_id: source_object_id.to_string(),
                reason_code: ReasonCode::Correction,
                created_at: now,
            };
            if !ledger::append(tx, &entry)? {
                return Ok(AwardOutcome::Duplicate);
            }
            snapshot::apply_delta(tx, user_id, stat, applied, now)?;
            Ok(AwardOutcome::Credited {
                entry_id: entry.id,
                gross: delta,
                awarded: applied,
            })
        })?;

    tracing::info!(user_id, stat = %stat, source = source_object_id, delta, outcome = ?outcome, "correction recorded");
    Ok(outcome)
}

/// The cached score row, created zeroed on first access.
pub fn get_score(store: &Store, user_id: &str) -> Result<ScoreSnapshot, ResonanceError> {
    validate_id("user_id", user_id)?;

    let cached = store
        .broker()
        .with_conn(&store.db_path(), |conn| snapshot::load(conn, user_id))?;
    if let Some(snapshot) = cached {
        return Ok(snapshot);
    }

    let now = store.now();
    store
        .broker()
        .with_tx(&store.db_path(), user_id, "snapshot.create", |tx| {
            snapshot::ensure(tx, user_id, now)?;
            snapshot::load(tx, user_id)?.ok_or_else(|| {
                ResonanceError::NotFound(format!("snapshot for '{}' vanished after create", user_id))
            })
        })
}
