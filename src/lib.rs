//! Resonance: the ledger behind a community reputation score.
//!
//! Upstream flows (event confirmation, hosting verification, questionnaires, hangout
//! feedback, guild activity) decide *when* points are due. This crate decides *how
//! many* may be credited and records them so that retries, races and cache drift can
//! never inflate a score.
//!
//! # Architecture
//!
//! ## Ledger first
//!
//! Every credited point is an immutable row in `ledger_entries`, unique per
//! `(user, stat, source object)`. The per-user score row is a cache of that ledger and
//! can be rebuilt from it at any time ([`engine::reconcile`]).
//!
//! ## One transaction per award
//!
//! All writes go through [`core::broker::DbBroker`], which runs them in a SQLite
//! `BEGIN IMMEDIATE` transaction and appends an audit line to `broker.events.jsonl`.
//! An award's duplicate check, cap reservation, ledger append, snapshot update and pair
//! counter increment commit together or not at all.
//!
//! ## Quotas
//!
//! Each stat has a daily or monthly cap ([`core::config`]). The clamp is a single
//! conditional `UPDATE`, so concurrent workers never jointly exceed a cap.
//!
//! # Examples
//!
//! ```bash
//! resonance award questing --user u1 --event ev-42 --early
//! resonance score --user u1
//! resonance ledger --user u1 --limit 10
//! resonance recalc --all --format json
//! ```
//!
//! # Crate Structure
//!
//! - [`core`]: store handle, broker, schema, configuration, clock, errors
//! - [`engine`]: ledger, bonus formulas, caps, pair tracking, aggregation, reconciliation

pub mod core;
pub mod engine;

mod cli;

use crate::cli::{AwardCommand, Cli, Command};
use crate::core::{error::ResonanceError, store::Store};
use crate::engine::{GuildContribution, aggregator, awards, caps, pairs, reconcile};
use clap::Parser;
use serde::Serialize;

fn emit<T: Serialize>(format: &str, value: &T, text: impl FnOnce(&T)) -> Result<(), ResonanceError> {
    if format == "json" {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        text(value);
    }
    Ok(())
}

fn parse_contribution(raw: &str) -> Result<GuildContribution, ResonanceError> {
    let (guild_id, points) = raw.split_once('=').ok_or_else(|| {
        ResonanceError::ValidationError(format!(
            "contribution '{}' must look like guild_id=points",
            raw
        ))
    })?;
    let points = points.trim().parse::<i64>().map_err(|e| {
        ResonanceError::ValidationError(format!("contribution '{}': {}", raw, e))
    })?;
    Ok(GuildContribution {
        guild_id: guild_id.trim().to_string(),
        points,
    })
}

fn run_award(store: &Store, format: &str, command: AwardCommand) -> Result<(), ResonanceError> {
    let outcome = match command {
        AwardCommand::Questing {
            user,
            event,
            early,
            on_time,
        } => awards::award_questing(store, &user, &event, early, on_time)?,
        AwardCommand::Wayfinder {
            host,
            event,
            attendees,
            early,
        } => awards::award_wayfinder(store, &host, &event, attendees, early)?,
        AwardCommand::Attunement { user, question } => {
            awards::award_attunement(store, &user, &question)?
        }
        AwardCommand::ProfileRefresh { user } => {
            awards::award_monthly_profile_refresh(store, &user)?
        }
        AwardCommand::Mana {
            helper,
            receiver,
            session,
            rating,
            early,
            on_time,
        } => awards::award_mana(store, &helper, &receiver, &session, rating, early, on_time)?,
        AwardCommand::Nexus {
            user,
            contributions,
        } => {
            let parsed = contributions
                .iter()
                .map(String::as_str)
                .map(parse_contribution)
                .collect::<Result<Vec<_>, _>>()?;
            awards::award_nexus(store, &user, &parsed)?
        }
    };
    emit(format, &outcome, |o| println!("{:?}", o))
}

pub fn run() -> Result<(), ResonanceError> {
    use colored::Colorize;

    let cli = Cli::parse();
    let store = Store::open(&cli.root)?;
    let format = cli.format.as_str();

    match cli.command {
        Command::Award(award) => run_award(&store, format, award.command)?,
        Command::Score { user } => {
            let score = awards::get_user_score(&store, &user)?;
            emit(format, &score, |s| {
                println!(
                    "{}: total {} (questing {}, wayfinder {}, attunement {}, mana {}, nexus {})",
                    s.user_id.bold(),
                    s.total.to_string().bright_green(),
                    s.questing,
                    s.wayfinder,
                    s.attunement,
                    s.mana,
                    s.nexus
                )
            })?;
        }
        Command::Ledger {
            user,
            limit,
            offset,
        } => {
            let entries = awards::get_user_ledger(&store, &user, limit, offset)?;
            emit(format, &entries, |list| {
                for e in list {
                    println!(
                        "{}  {:<10} {:>5}  {:<20} {}",
                        e.created_at.to_rfc3339(),
                        e.stat,
                        e.points,
                        e.reason_code,
                        e.source_object_id
                    );
                }
            })?;
        }
        Command::Recalc { user, all } => {
            if all {
                let report = reconcile::reconcile_all(&store)?;
                emit(format, &report, |r| {
                    println!("Checked {} users", r.users_checked);
                    for d in &r.drifts {
                        let cached = d.cached.as_ref().map(|c| c.total).unwrap_or(0);
                        println!(
                            "{} {}: cached total {} -> ledger total {}",
                            "DRIFT".bright_red().bold(),
                            d.user_id,
                            cached,
                            d.rebuilt.total
                        );
                    }
                })?;
            } else {
                let user = user.ok_or_else(|| {
                    ResonanceError::ValidationError("recalc needs --user or --all".to_string())
                })?;
                let score = awards::recalculate_score(&store, &user)?;
                emit(format, &score, |s| {
                    println!("{} rebuilt: total {}", s.user_id, s.total)
                })?;
            }
        }
        Command::Audit { user } => {
            let drift = reconcile::audit_user(&store, &user)?;
            let digest = reconcile::ledger_digest(&store, &user)?;
            let report = serde_json::json!({
                "user_id": user,
                "ledger_sha256": digest,
                "drift": drift,
            });
            emit(format, &report, |_| match &drift {
                None => println!("{} {} ledger {}", "OK".bright_green(), user, digest),
                Some(d) => println!(
                    "{} {}: cached total {} vs ledger total {} (ledger {})",
                    "DRIFT".bright_red().bold(),
                    user,
                    d.cached.as_ref().map(|c| c.total).unwrap_or(0),
                    d.rebuilt.total,
                    digest
                ),
            })?;
        }
        Command::Correct {
            user,
            stat,
            source,
            delta,
        } => {
            let outcome = aggregator::record_correction(&store, &user, stat, &source, delta)?;
            emit(format, &outcome, |o| println!("{:?}", o))?;
        }
        Command::Remaining { user, stat, period } => {
            let period = period.unwrap_or_else(|| caps::current_period_key(&store, stat));
            let remaining = caps::get_remaining(&store, &user, stat, &period)?;
            let report = serde_json::json!({
                "user_id": user,
                "stat": stat,
                "period_key": period,
                "remaining": remaining,
            });
            emit(format, &report, |_| {
                println!("{} {} {}: {} remaining", user, stat, period, remaining)
            })?;
        }
        Command::Pair { giver, receiver } => {
            let count = pairs::interaction_count(&store, &giver, &receiver)?;
            let report = serde_json::json!({
                "giver_id": giver,
                "receiver_id": receiver,
                "count": count,
            });
            emit(format, &report, |_| {
                println!("{} -> {}: {} credited sessions", giver, receiver, count)
            })?;
        }
    }
    Ok(())
}
