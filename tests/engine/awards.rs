use chrono::{DateTime, TimeZone, Utc};
use resonance::core::error::ResonanceError;
use resonance::core::store::Store;
use resonance::engine::awards::{
    award_attunement, award_mana, award_monthly_profile_refresh, award_nexus, award_questing,
    award_wayfinder, get_user_ledger, get_user_score,
};
use resonance::engine::pairs::interaction_count;
use resonance::engine::{AwardOutcome, GuildContribution, HelpfulnessRating, ReasonCode, Stat};
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::tempdir;

fn monday() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 19, 10, 0, 0).unwrap()
}

fn open_store(root: &std::path::Path) -> Store {
    Store::open(root).expect("open store").at(monday())
}

#[test]
fn scenario_a_first_questing_award() {
    let tmp = tempdir().unwrap();
    let store = open_store(tmp.path());

    let outcome = award_questing(&store, "u1", "event1", false, false).unwrap();
    assert_eq!(outcome.awarded(), 10);

    let score = get_user_score(&store, "u1").unwrap();
    assert_eq!(score.questing, 10);
    assert_eq!(score.total, 10);
}

#[test]
fn scenario_b_replayed_event_is_idempotent() {
    let tmp = tempdir().unwrap();
    let store = open_store(tmp.path());

    award_questing(&store, "u1", "event1", false, false).unwrap();
    let before = get_user_score(&store, "u1").unwrap();

    let replay = award_questing(&store, "u1", "event1", true, true).unwrap();
    assert_eq!(replay, AwardOutcome::Duplicate);

    let after = get_user_score(&store, "u1").unwrap();
    assert_eq!(after.questing, 10);
    assert_eq!(before, after);
    assert_eq!(get_user_ledger(&store, "u1", 50, 0).unwrap().len(), 1);
}

#[test]
fn scenario_c_wayfinder_attendee_bonus_caps_at_four() {
    let tmp = tempdir().unwrap();
    let store = open_store(tmp.path());

    let outcome = award_wayfinder(&store, "u1", "host1", 10, false).unwrap();
    assert_eq!(outcome.awarded(), 16);
    assert_eq!(get_user_score(&store, "u1").unwrap().wayfinder, 16);
}

#[test]
fn scenario_d_daily_cap_stops_fifth_questing_award() {
    let tmp = tempdir().unwrap();
    let store = open_store(tmp.path());

    for i in 0..4 {
        let outcome = award_questing(&store, "u1", &format!("ev{}", i), false, false).unwrap();
        assert_eq!(outcome.awarded(), 10);
    }
    assert_eq!(get_user_score(&store, "u1").unwrap().questing, 40);

    let fifth = award_questing(&store, "u1", "ev4", true, true).unwrap();
    assert_eq!(fifth, AwardOutcome::CapExhausted { gross: 14 });
    assert_eq!(fifth.awarded(), 0);

    let score = get_user_score(&store, "u1").unwrap();
    assert_eq!(score.questing, 40);
    assert_eq!(get_user_ledger(&store, "u1", 50, 0).unwrap().len(), 4);
}

#[test]
fn partial_award_records_only_the_credited_amount() {
    let tmp = tempdir().unwrap();
    let store = open_store(tmp.path());

    for i in 0..3 {
        award_questing(&store, "u1", &format!("ev{}", i), false, false).unwrap();
    }

    let outcome = award_questing(&store, "u1", "ev-late", true, true).unwrap();
    match outcome {
        AwardOutcome::Credited { gross, awarded, .. } => {
            assert_eq!(gross, 14);
            assert_eq!(awarded, 10);
        }
        other => panic!("expected a partial credit, got {:?}", other),
    }

    let newest = &get_user_ledger(&store, "u1", 1, 0).unwrap()[0];
    assert_eq!(newest.source_object_id, "ev-late");
    assert_eq!(newest.points, 10);
    assert_eq!(get_user_score(&store, "u1").unwrap().questing, 40);
}

#[test]
fn scenario_e_unhelpful_mana_leaves_no_trace() {
    let tmp = tempdir().unwrap();
    let store = open_store(tmp.path());

    let outcome = award_mana(
        &store,
        "helper",
        "receiver",
        "s1",
        HelpfulnessRating::NotReally,
        true,
        true,
    )
    .unwrap();
    assert_eq!(outcome, AwardOutcome::NothingDue);

    assert!(get_user_ledger(&store, "helper", 50, 0).unwrap().is_empty());
    assert_eq!(interaction_count(&store, "helper", "receiver").unwrap(), 0);
    assert_eq!(get_user_score(&store, "helper").unwrap().mana, 0);
}

#[test]
fn helpful_mana_credits_helper_and_counts_pair_once() {
    let tmp = tempdir().unwrap();
    let store = open_store(tmp.path());

    let outcome =
        award_mana(&store, "helper", "receiver", "s1", HelpfulnessRating::Yes, false, false)
            .unwrap();
    assert_eq!(outcome.awarded(), 12);
    // Retried delivery of the same session.
    let replay =
        award_mana(&store, "helper", "receiver", "s1", HelpfulnessRating::Yes, false, false)
            .unwrap();
    assert_eq!(replay, AwardOutcome::Duplicate);

    assert_eq!(get_user_score(&store, "helper").unwrap().mana, 12);
    assert_eq!(get_user_score(&store, "receiver").unwrap().mana, 0);
    assert_eq!(interaction_count(&store, "helper", "receiver").unwrap(), 1);
    assert_eq!(interaction_count(&store, "receiver", "helper").unwrap(), 0);
}

#[test]
fn capped_mana_does_not_count_pair() {
    let tmp = tempdir().unwrap();
    let store = open_store(tmp.path());

    // Default mana cap is 36 a day: three flat sessions fill it.
    for i in 0..3 {
        let outcome = award_mana(
            &store,
            "helper",
            "receiver",
            &format!("s{}", i),
            HelpfulnessRating::Yes,
            false,
            false,
        )
        .unwrap();
        assert!(outcome.is_credited());
    }
    let capped =
        award_mana(&store, "helper", "receiver", "s3", HelpfulnessRating::Yes, false, false)
            .unwrap();
    assert_eq!(capped, AwardOutcome::CapExhausted { gross: 12 });
    assert_eq!(interaction_count(&store, "helper", "receiver").unwrap(), 3);
}

#[test]
fn attunement_questions_dedupe_by_question_id() {
    let tmp = tempdir().unwrap();
    let store = open_store(tmp.path());

    award_attunement(&store, "u1", "q-1").unwrap();
    award_attunement(&store, "u1", "q-2").unwrap();
    award_attunement(&store, "u1", "q-1").unwrap();

    assert_eq!(get_user_score(&store, "u1").unwrap().attunement, 4);
}

#[test]
fn profile_refresh_fires_once_per_calendar_month() {
    let tmp = tempdir().unwrap();
    let store = open_store(tmp.path());

    let first = award_monthly_profile_refresh(&store, "u1").unwrap();
    assert_eq!(first.awarded(), 10);

    let later_same_month = store.at(Utc.with_ymd_and_hms(2026, 10, 30, 8, 0, 0).unwrap());
    assert_eq!(
        award_monthly_profile_refresh(&later_same_month, "u1").unwrap(),
        AwardOutcome::Duplicate
    );

    let next_month = store.at(Utc.with_ymd_and_hms(2026, 11, 2, 8, 0, 0).unwrap());
    assert_eq!(
        award_monthly_profile_refresh(&next_month, "u1")
            .unwrap()
            .awarded(),
        10
    );

    let entries = get_user_ledger(&store, "u1", 10, 0).unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.reason_code == ReasonCode::ProfileRefresh));
    assert_eq!(entries[0].source_object_id, "profile:2026-11");
    assert_eq!(entries[1].source_object_id, "profile:2026-10");
}

#[test]
fn nexus_sums_guild_contributions_once_per_month() {
    let tmp = tempdir().unwrap();
    let store = open_store(tmp.path());
    let contributions = vec![
        GuildContribution {
            guild_id: "g-hikers".to_string(),
            points: 15,
        },
        GuildContribution {
            guild_id: "g-chess".to_string(),
            points: 6,
        },
    ];

    assert_eq!(award_nexus(&store, "u1", &contributions).unwrap().awarded(), 21);
    assert_eq!(
        award_nexus(&store, "u1", &contributions).unwrap(),
        AwardOutcome::Duplicate
    );
    assert_eq!(award_nexus(&store, "u2", &[]).unwrap(), AwardOutcome::NothingDue);

    let entry = &get_user_ledger(&store, "u1", 1, 0).unwrap()[0];
    assert_eq!(entry.stat, Stat::Nexus);
    assert_eq!(entry.source_object_id, "guilds:2026-10");
}

#[test]
fn invalid_input_is_rejected_before_any_write() {
    let tmp = tempdir().unwrap();
    let store = open_store(tmp.path());

    let err = award_wayfinder(&store, "host", "ev1", -1, false).unwrap_err();
    assert!(matches!(err, ResonanceError::ValidationError(_)));

    let err = award_questing(&store, "", "ev1", false, false).unwrap_err();
    assert!(matches!(err, ResonanceError::ValidationError(_)));

    let err = award_questing(&store, "u1", "bad id", false, false).unwrap_err();
    assert!(matches!(err, ResonanceError::ValidationError(_)));

    let err = award_mana(&store, "u1", "u1", "s1", HelpfulnessRating::Yes, false, false)
        .unwrap_err();
    assert!(matches!(err, ResonanceError::ValidationError(_)));

    let negative = vec![GuildContribution {
        guild_id: "g1".to_string(),
        points: -4,
    }];
    let err = award_nexus(&store, "u1", &negative).unwrap_err();
    assert!(matches!(err, ResonanceError::ValidationError(_)));

    assert!(get_user_ledger(&store, "host", 10, 0).unwrap().is_empty());
    assert!(get_user_ledger(&store, "u1", 10, 0).unwrap().is_empty());
    assert_eq!(get_user_score(&store, "host").unwrap().total, 0);
}

#[test]
fn concurrent_awards_never_exceed_the_cap() {
    let tmp = tempdir().unwrap();
    let store = open_store(tmp.path());
    let workers = 12;
    let barrier = Arc::new(Barrier::new(workers));

    let handles: Vec<_> = (0..workers)
        .map(|i| {
            let store = store.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                award_questing(&store, "u1", &format!("race-{}", i), true, true)
                    .expect("award under contention")
            })
        })
        .collect();

    let outcomes: Vec<AwardOutcome> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let credited: i64 = outcomes.iter().map(|o| o.awarded()).sum();
    assert_eq!(credited, 40, "sum of awarded must equal the cap exactly");

    let ledger_sum: i64 = get_user_ledger(&store, "u1", 200, 0)
        .unwrap()
        .iter()
        .map(|e| e.points)
        .sum();
    assert_eq!(ledger_sum, 40);
    assert_eq!(get_user_score(&store, "u1").unwrap().questing, 40);
}

#[test]
fn concurrent_retries_of_one_event_credit_once() {
    let tmp = tempdir().unwrap();
    let store = open_store(tmp.path());
    let workers = 8;
    let barrier = Arc::new(Barrier::new(workers));

    let handles: Vec<_> = (0..workers)
        .map(|_| {
            let store = store.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                award_questing(&store, "u1", "same-event", false, false).expect("award")
            })
        })
        .collect();

    let outcomes: Vec<AwardOutcome> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(outcomes.iter().filter(|o| o.is_credited()).count(), 1);
    assert_eq!(
        outcomes
            .iter()
            .filter(|o| **o == AwardOutcome::Duplicate)
            .count(),
        workers - 1
    );
    assert_eq!(get_user_score(&store, "u1").unwrap().questing, 10);
}

#[test]
fn question_ids_cannot_claim_the_profile_refresh_key() {
    let tmp = tempdir().unwrap();
    let store = open_store(tmp.path());

    let err = award_attunement(&store, "u1", "profile:2026-10").unwrap_err();
    assert!(matches!(err, ResonanceError::ValidationError(_)));
    assert!(get_user_ledger(&store, "u1", 10, 0).unwrap().is_empty());

    assert_eq!(
        award_monthly_profile_refresh(&store, "u1")
            .unwrap()
            .awarded(),
        10
    );
}

#[test]
fn overflowing_nexus_contributions_are_rejected_before_any_write() {
    let tmp = tempdir().unwrap();
    let store = open_store(tmp.path());
    let contributions = vec![
        GuildContribution {
            guild_id: "g1".to_string(),
            points: i64::MAX,
        },
        GuildContribution {
            guild_id: "g2".to_string(),
            points: 1,
        },
    ];

    let err = award_nexus(&store, "u1", &contributions).unwrap_err();
    assert!(matches!(err, ResonanceError::ValidationError(_)));
    assert!(get_user_ledger(&store, "u1", 10, 0).unwrap().is_empty());
    assert_eq!(get_user_score(&store, "u1").unwrap().nexus, 0);
}
