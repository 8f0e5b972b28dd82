//! Stat and reason-code vocabulary shared across the engine.

use crate::core::error::ResonanceError;
use regex::Regex;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Longest accepted user/source identifier.
pub const MAX_ID_LEN: usize = 128;

static ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_.:@-]+$").expect("identifier pattern is a valid regex")
});

/// One of the five point categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stat {
    Questing,
    Wayfinder,
    Attunement,
    Mana,
    Nexus,
}

impl Stat {
    pub const ALL: [Stat; 5] = [
        Stat::Questing,
        Stat::Wayfinder,
        Stat::Attunement,
        Stat::Mana,
        Stat::Nexus,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Stat::Questing => "questing",
            Stat::Wayfinder => "wayfinder",
            Stat::Attunement => "attunement",
            Stat::Mana => "mana",
            Stat::Nexus => "nexus",
        }
    }

    /// Snapshot column holding this stat. Column names equal the stat names.
    pub fn column(self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Stat {
    type Err = ResonanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "questing" => Ok(Stat::Questing),
            "wayfinder" => Ok(Stat::Wayfinder),
            "attunement" => Ok(Stat::Attunement),
            "mana" => Ok(Stat::Mana),
            "nexus" => Ok(Stat::Nexus),
            other => Err(ResonanceError::ValidationError(format!(
                "unknown stat '{}'",
                other
            ))),
        }
    }
}

impl ToSql for Stat {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Stat {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: ResonanceError| FromSqlError::Other(Box::new(e)))
    }
}

/// Why an entry was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    EventAttended,
    EventHosted,
    QuestionAnswered,
    ProfileRefresh,
    HangoutHelpful,
    GuildActivity,
    Correction,
}

impl ReasonCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ReasonCode::EventAttended => "event_attended",
            ReasonCode::EventHosted => "event_hosted",
            ReasonCode::QuestionAnswered => "question_answered",
            ReasonCode::ProfileRefresh => "profile_refresh",
            ReasonCode::HangoutHelpful => "hangout_helpful",
            ReasonCode::GuildActivity => "guild_activity",
            ReasonCode::Correction => "correction",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ReasonCode {
    type Err = ResonanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "event_attended" => Ok(ReasonCode::EventAttended),
            "event_hosted" => Ok(ReasonCode::EventHosted),
            "question_answered" => Ok(ReasonCode::QuestionAnswered),
            "profile_refresh" => Ok(ReasonCode::ProfileRefresh),
            "hangout_helpful" => Ok(ReasonCode::HangoutHelpful),
            "guild_activity" => Ok(ReasonCode::GuildActivity),
            "correction" => Ok(ReasonCode::Correction),
            other => Err(ResonanceError::ValidationError(format!(
                "unknown reason code '{}'",
                other
            ))),
        }
    }
}

impl ToSql for ReasonCode {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for ReasonCode {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: ResonanceError| FromSqlError::Other(Box::new(e)))
    }
}

/// Reject blank, oversized or non-token identifiers before any side effect.
pub fn validate_id(field: &str, value: &str) -> Result<(), ResonanceError> {
    if value.is_empty() {
        return Err(ResonanceError::ValidationError(format!(
            "{} must not be empty",
            field
        )));
    }
    if value.len() > MAX_ID_LEN {
        return Err(ResonanceError::ValidationError(format!(
            "{} exceeds {} bytes",
            field, MAX_ID_LEN
        )));
    }
    if !ID_PATTERN.is_match(value) {
        return Err(ResonanceError::ValidationError(format!(
            "{} '{}' contains characters outside [A-Za-z0-9_.:@-]",
            field, value
        )));
    }
    Ok(())
}
