//! Award entry points called by upstream flows.
//!
//! Each function validates its input, picks the stat, source key and formula, and
//! hands off to [`aggregator::award`]. Duplicates, exhausted caps and zero-point
//! results come back as `Ok`; only malformed input and storage failures are `Err`.

use crate::core::error::ResonanceError;
use crate::core::store::Store;
use crate::core::time;
use crate::engine::aggregator::{self, AwardOutcome, AwardRequest};
use crate::engine::bonus::{self, GuildContribution, HelpfulnessRating};
use crate::engine::ledger::{self, LedgerEntry};
use crate::engine::pairs::PairKey;
use crate::engine::reconcile;
use crate::engine::snapshot::ScoreSnapshot;
use crate::engine::types::{ReasonCode, Stat, validate_id};

/// Source-key prefix reserved for monthly profile refreshes.
const PROFILE_SOURCE_PREFIX: &str = "profile:";

/// Event-confirmation flow: the attendee showed up.
pub fn award_questing(
    store: &Store,
    user_id: &str,
    event_id: &str,
    early_confirm: bool,
    on_time_checkin: bool,
) -> Result<AwardOutcome, ResonanceError> {
    validate_id("event_id", event_id)?;
    aggregator::award(
        store,
        &AwardRequest {
            user_id,
            stat: Stat::Questing,
            source_object_id: event_id,
            reason: ReasonCode::EventAttended,
            pair: None,
        },
        || bonus::questing_points(early_confirm, on_time_checkin),
    )
}

/// Hosting-verification flow: the host ran the event.
pub fn award_wayfinder(
    store: &Store,
    host_id: &str,
    event_id: &str,
    attendee_count: i64,
    early_confirm: bool,
) -> Result<AwardOutcome, ResonanceError> {
    validate_id("event_id", event_id)?;
    if attendee_count < 0 {
        return Err(ResonanceError::ValidationError(format!(
            "attendee_count must be >= 0 (got {})",
            attendee_count
        )));
    }
    aggregator::award(
        store,
        &AwardRequest {
            user_id: host_id,
            stat: Stat::Wayfinder,
            source_object_id: event_id,
            reason: ReasonCode::EventHosted,
            pair: None,
        },
        || bonus::wayfinder_points(attendee_count, early_confirm),
    )
}

/// Questionnaire service: one distinct question answered.
pub fn award_attunement(
    store: &Store,
    user_id: &str,
    question_id: &str,
) -> Result<AwardOutcome, ResonanceError> {
    validate_id("question_id", question_id)?;
    if question_id.starts_with(PROFILE_SOURCE_PREFIX) {
        return Err(ResonanceError::ValidationError(format!(
            "question_id '{}' uses the reserved '{}' prefix",
            question_id, PROFILE_SOURCE_PREFIX
        )));
    }
    aggregator::award(
        store,
        &AwardRequest {
            user_id,
            stat: Stat::Attunement,
            source_object_id: question_id,
            reason: ReasonCode::QuestionAnswered,
            pair: None,
        },
        bonus::attunement_question_points,
    )
}

/// Profile refresh; keyed by calendar month so it fires at most once per month.
pub fn award_monthly_profile_refresh(
    store: &Store,
    user_id: &str,
) -> Result<AwardOutcome, ResonanceError> {
    let source = format!("{}{}", PROFILE_SOURCE_PREFIX, time::month_key(store.now()));
    aggregator::award(
        store,
        &AwardRequest {
            user_id,
            stat: Stat::Attunement,
            source_object_id: &source,
            reason: ReasonCode::ProfileRefresh,
            pair: None,
        },
        bonus::profile_refresh_points,
    )
}

/// Hangout-feedback flow: `receiver_id` rated a help session by `helper_id`.
///
/// A non-positive rating is not an award attempt: nothing is written, no quota is
/// consumed and the pair counter does not move.
pub fn award_mana(
    store: &Store,
    helper_id: &str,
    receiver_id: &str,
    session_id: &str,
    rating: HelpfulnessRating,
    early_confirm: bool,
    on_time_checkin: bool,
) -> Result<AwardOutcome, ResonanceError> {
    validate_id("helper_id", helper_id)?;
    validate_id("receiver_id", receiver_id)?;
    validate_id("session_id", session_id)?;
    if helper_id == receiver_id {
        return Err(ResonanceError::ValidationError(
            "helper_id and receiver_id must differ".to_string(),
        ));
    }
    if !rating.is_positive() {
        tracing::debug!(helper_id, session_id, rating = %rating, "mana skipped for non-positive rating");
        return Ok(AwardOutcome::NothingDue);
    }

    aggregator::award(
        store,
        &AwardRequest {
            user_id: helper_id,
            stat: Stat::Mana,
            source_object_id: session_id,
            reason: ReasonCode::HangoutHelpful,
            pair: Some(PairKey {
                giver_id: helper_id,
                receiver_id,
            }),
        },
        || bonus::mana_points(rating, early_confirm, on_time_checkin),
    )
}

/// Guild-activity batch: one award per user per month, summing guild contributions.
pub fn award_nexus(
    store: &Store,
    user_id: &str,
    contributions: &[GuildContribution],
) -> Result<AwardOutcome, ResonanceError> {
    for contribution in contributions {
        validate_id("guild_id", &contribution.guild_id)?;
        if contribution.points < 0 {
            return Err(ResonanceError::ValidationError(format!(
                "contribution for guild '{}' is negative ({})",
                contribution.guild_id, contribution.points
            )));
        }
    }
    let points = bonus::nexus_points(contributions).ok_or_else(|| {
        ResonanceError::ValidationError("guild contributions overflow the point total".to_string())
    })?;
    let source = format!("guilds:{}", time::month_key(store.now()));
    aggregator::award(
        store,
        &AwardRequest {
            user_id,
            stat: Stat::Nexus,
            source_object_id: &source,
            reason: ReasonCode::GuildActivity,
            pair: None,
        },
        || points,
    )
}

pub fn get_user_score(store: &Store, user_id: &str) -> Result<ScoreSnapshot, ResonanceError> {
    aggregator::get_score(store, user_id)
}

pub fn get_user_ledger(
    store: &Store,
    user_id: &str,
    limit: u32,
    offset: u32,
) -> Result<Vec<LedgerEntry>, ResonanceError> {
    ledger::query(store, user_id, limit, offset)
}

pub fn recalculate_score(store: &Store, user_id: &str) -> Result<ScoreSnapshot, ResonanceError> {
    reconcile::recalculate(store, user_id)
}
