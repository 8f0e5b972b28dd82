//! CLI struct definitions for the resonance command-line interface.
//!
//! All clap-derived types live here. Dispatch lives in `lib.rs`.

use crate::engine::{HelpfulnessRating, Stat};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "resonance",
    version = env!("CARGO_PKG_VERSION"),
    about = "Operate the resonance ledger: award points, inspect scores, reconcile snapshots."
)]
pub(crate) struct Cli {
    /// Store directory holding resonance.db and resonance.toml.
    #[clap(long, global = true, default_value = ".resonance")]
    pub root: PathBuf,
    /// Output format: 'text' or 'json'.
    #[clap(long, global = true, default_value = "text")]
    pub format: String,
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Credit points for one upstream action
    Award(AwardCli),
    /// Show a user's cached score
    Score {
        #[clap(long)]
        user: String,
    },
    /// Page through a user's ledger, newest first
    Ledger {
        #[clap(long)]
        user: String,
        #[clap(long, default_value = "20")]
        limit: u32,
        #[clap(long, default_value = "0")]
        offset: u32,
    },
    /// Rebuild cached scores from the ledger
    Recalc {
        /// Single user to rebuild.
        #[clap(long, conflicts_with = "all")]
        user: Option<String>,
        /// Rebuild every known user and report drift.
        #[clap(long)]
        all: bool,
    },
    /// Compare a user's cached score with the ledger without writing
    Audit {
        #[clap(long)]
        user: String,
    },
    /// Append a negative corrective entry
    Correct {
        #[clap(long)]
        user: String,
        #[clap(long)]
        stat: Stat,
        #[clap(long)]
        source: String,
        /// Negative amount to apply.
        #[clap(long, allow_hyphen_values = true)]
        delta: i64,
    },
    /// Show remaining quota for a stat
    Remaining {
        #[clap(long)]
        user: String,
        #[clap(long)]
        stat: Stat,
        /// Period key (YYYY-MM-DD or YYYY-MM); defaults to the current period.
        #[clap(long)]
        period: Option<String>,
    },
    /// Show credited interactions between a helper and a receiver
    Pair {
        #[clap(long)]
        giver: String,
        #[clap(long)]
        receiver: String,
    },
}

#[derive(clap::Args, Debug)]
pub(crate) struct AwardCli {
    #[clap(subcommand)]
    pub command: AwardCommand,
}

#[derive(Subcommand, Debug)]
pub(crate) enum AwardCommand {
    /// Attendance at an event
    Questing {
        #[clap(long)]
        user: String,
        #[clap(long)]
        event: String,
        #[clap(long)]
        early: bool,
        #[clap(long)]
        on_time: bool,
    },
    /// Hosting an event
    Wayfinder {
        #[clap(long)]
        host: String,
        #[clap(long)]
        event: String,
        #[clap(long, allow_hyphen_values = true)]
        attendees: i64,
        #[clap(long)]
        early: bool,
    },
    /// Answering a profile question
    Attunement {
        #[clap(long)]
        user: String,
        #[clap(long)]
        question: String,
    },
    /// Monthly profile refresh
    ProfileRefresh {
        #[clap(long)]
        user: String,
    },
    /// A rated help session
    Mana {
        #[clap(long)]
        helper: String,
        #[clap(long)]
        receiver: String,
        #[clap(long)]
        session: String,
        /// YES, SOMEWHAT or NOT_REALLY.
        #[clap(long)]
        rating: HelpfulnessRating,
        #[clap(long)]
        early: bool,
        #[clap(long)]
        on_time: bool,
    },
    /// Monthly guild activity
    Nexus {
        #[clap(long)]
        user: String,
        /// Repeatable `guild_id=points`.
        #[clap(long = "contribution")]
        contributions: Vec<String>,
    },
}
