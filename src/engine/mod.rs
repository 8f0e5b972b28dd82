//! The resonance scoring engine.
//!
//! Leaves first: [`types`] and [`bonus`] are pure; [`ledger`], [`caps`], [`pairs`] and
//! [`snapshot`] own one table each; [`aggregator`] composes them into a single award
//! transaction; [`reconcile`] rebuilds snapshots from the ledger; [`awards`] is the
//! surface upstream flows call.

pub mod aggregator;
pub mod awards;
pub mod bonus;
pub mod caps;
pub mod ledger;
pub mod pairs;
pub mod reconcile;
pub mod snapshot;
pub mod types;

pub use aggregator::{AwardOutcome, AwardRequest};
pub use bonus::{GuildContribution, HelpfulnessRating};
pub use ledger::LedgerEntry;
pub use snapshot::ScoreSnapshot;
pub use types::{ReasonCode, Stat};
