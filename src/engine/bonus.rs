//! Point formulas.
//!
//! Everything here is pure: inputs in, gross points out. Caps, dedupe and persistence
//! are applied afterwards by the aggregator, identically for every stat.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::error::ResonanceError;

pub const QUESTING_BASE: i64 = 10;
pub const WAYFINDER_BASE: i64 = 8;
pub const WAYFINDER_PER_ATTENDEE: i64 = 2;
/// Attendees beyond this count earn the host nothing extra.
pub const WAYFINDER_MAX_BONUS_ATTENDEES: i64 = 4;
pub const ATTUNEMENT_PER_QUESTION: i64 = 2;
pub const PROFILE_REFRESH_POINTS: i64 = 10;
pub const MANA_BASE: i64 = 12;
pub const EARLY_CONFIRM_BONUS: i64 = 2;
pub const ON_TIME_CHECKIN_BONUS: i64 = 2;

/// Minimum lead time for a confirmation to count as early.
pub const EARLY_CONFIRM_LEAD_HOURS: i64 = 2;
/// Check-in window, relative to the event start.
pub const CHECKIN_OPENS_MINUTES_BEFORE: i64 = 30;
pub const CHECKIN_CLOSES_MINUTES_AFTER: i64 = 15;

/// Feedback left by the receiver of a help session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HelpfulnessRating {
    Yes,
    Somewhat,
    NotReally,
}

impl HelpfulnessRating {
    pub fn is_positive(self) -> bool {
        matches!(self, HelpfulnessRating::Yes)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HelpfulnessRating::Yes => "YES",
            HelpfulnessRating::Somewhat => "SOMEWHAT",
            HelpfulnessRating::NotReally => "NOT_REALLY",
        }
    }
}

impl fmt::Display for HelpfulnessRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HelpfulnessRating {
    type Err = ResonanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "YES" => Ok(HelpfulnessRating::Yes),
            "SOMEWHAT" => Ok(HelpfulnessRating::Somewhat),
            "NOT_REALLY" | "NO" => Ok(HelpfulnessRating::NotReally),
            other => Err(ResonanceError::ValidationError(format!(
                "unknown helpfulness rating '{}'",
                other
            ))),
        }
    }
}

/// One guild's share of a nexus award.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildContribution {
    pub guild_id: String,
    pub points: i64,
}

fn punctuality(early_confirm: bool, on_time_checkin: bool) -> i64 {
    let mut points = 0;
    if early_confirm {
        points += EARLY_CONFIRM_BONUS;
    }
    if on_time_checkin {
        points += ON_TIME_CHECKIN_BONUS;
    }
    points
}

pub fn questing_points(early_confirm: bool, on_time_checkin: bool) -> i64 {
    QUESTING_BASE + punctuality(early_confirm, on_time_checkin)
}

/// Host points. `attendee_count` must already be validated as non-negative.
pub fn wayfinder_points(attendee_count: i64, early_confirm: bool) -> i64 {
    let counted = attendee_count.clamp(0, WAYFINDER_MAX_BONUS_ATTENDEES);
    WAYFINDER_BASE + WAYFINDER_PER_ATTENDEE * counted + punctuality(early_confirm, false)
}

pub fn attunement_question_points() -> i64 {
    ATTUNEMENT_PER_QUESTION
}

pub fn profile_refresh_points() -> i64 {
    PROFILE_REFRESH_POINTS
}

/// Zero for any non-positive rating; callers skip the award entirely in that case.
pub fn mana_points(rating: HelpfulnessRating, early_confirm: bool, on_time_checkin: bool) -> i64 {
    if !rating.is_positive() {
        return 0;
    }
    MANA_BASE + punctuality(early_confirm, on_time_checkin)
}

/// Sum of guild contributions; `None` if the sum overflows `i64`.
pub fn nexus_points(contributions: &[GuildContribution]) -> Option<i64> {
    contributions
        .iter()
        .try_fold(0i64, |acc, c| acc.checked_add(c.points))
}

/// Confirmed at least two hours before the event starts.
pub fn is_early_confirmation(confirmed_at: DateTime<Utc>, starts_at: DateTime<Utc>) -> bool {
    starts_at - confirmed_at >= Duration::hours(EARLY_CONFIRM_LEAD_HOURS)
}

/// Checked in between 30 minutes before and 15 minutes after the start, inclusive.
pub fn is_on_time_checkin(checked_in_at: DateTime<Utc>, starts_at: DateTime<Utc>) -> bool {
    let opens = starts_at - Duration::minutes(CHECKIN_OPENS_MINUTES_BEFORE);
    let closes = starts_at + Duration::minutes(CHECKIN_CLOSES_MINUTES_AFTER);
    checked_in_at >= opens && checked_in_at <= closes
}
