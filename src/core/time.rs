//! Shared clock, period-key and id helpers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Quota window a cap bucket covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapWindow {
    Daily,
    Monthly,
}

/// Source of "now" for a store.
///
/// Production stores use `System`; tests pin time with `Fixed` so period keys are
/// deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Clock {
    #[default]
    System,
    Fixed(DateTime<Utc>),
}

impl Clock {
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::System => Utc::now(),
            Clock::Fixed(ts) => *ts,
        }
    }
}

/// `YYYY-MM-DD` in UTC.
pub fn day_key(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d").to_string()
}

/// `YYYY-MM` in UTC.
pub fn month_key(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m").to_string()
}

pub fn period_key(window: CapWindow, ts: DateTime<Utc>) -> String {
    match window {
        CapWindow::Daily => day_key(ts),
        CapWindow::Monthly => month_key(ts),
    }
}

pub fn new_entry_id() -> String {
    Ulid::new().to_string()
}
