//! End-to-end progression: messages in, levels and Ignis out, records on disk.

use std::sync::Arc;
use std::thread;

use chrono::{DateTime, Duration, TimeZone, Utc};
use tempfile::TempDir;

use lady_flamme::clock::ManualClock;
use lady_flamme::notify::RecordingSink;
use lady_flamme::progression::LevelUp;
use lady_flamme::store::{JsonFileStore, MemoryStore, UserStore, WriteBackCache};
use lady_flamme::{build_curve, CurveParams, GainRules, MessageEvent, ProgressionSession};

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 6, 8, 0, 0).unwrap()
}

fn session_over(store: Arc<dyn UserStore>) -> (ProgressionSession, Arc<RecordingSink>, Arc<ManualClock>) {
    let curve = Arc::new(build_curve(&CurveParams::default()).unwrap());
    let cache = Arc::new(WriteBackCache::new(store));
    let sink = Arc::new(RecordingSink::new());
    let clock = Arc::new(ManualClock::new(start()));
    let session = ProgressionSession::new(curve, GainRules::default(), cache, sink.clone(), clock.clone());
    (session, sink, clock)
}

/// Ten messages a day, one per cooldown, starting each morning
fn chat_for_days(session: &ProgressionSession, clock: &ManualClock, days: i64) {
    let msg = MessageEvent::text(42, "Ember", "good morning everyone");
    for day in 0..days {
        clock.set(start() + Duration::days(day));
        for _ in 0..10 {
            assert!(session.handle_message(&msg).unwrap().is_some());
            clock.advance(Duration::seconds(30));
        }
    }
}

#[test]
fn test_reference_member_first_three_days() {
    let (session, sink, clock) = session_over(Arc::new(MemoryStore::new()));

    chat_for_days(&session, &clock, 1);
    let user = session.cache().get(42).unwrap();
    assert_eq!(user.xp, 640);
    assert_eq!(user.level, 3);
    assert_eq!(user.coins, 25);
    assert_eq!(sink.total_bonus(), 0);

    sink.clear();
    clock.set(start() + Duration::days(1));
    let msg = MessageEvent::text(42, "Ember", "good morning everyone");
    for _ in 0..10 {
        session.handle_message(&msg).unwrap();
        clock.advance(Duration::seconds(30));
    }
    clock.set(start() + Duration::days(2));
    for _ in 0..10 {
        session.handle_message(&msg).unwrap();
        clock.advance(Duration::seconds(30));
    }

    // Levels 4 and 5 each announced once, the milestone paid once
    assert_eq!(
        sink.events(),
        vec![(42, LevelUp { level: 4, bonus: 0 }), (42, LevelUp { level: 5, bonus: 250 })]
    );
    let user = session.cache().get(42).unwrap();
    assert_eq!(user.xp, 1_920);
    assert_eq!(user.level, 5);
    assert_eq!(user.coins, 3 * 25 + 250);
}

#[test]
fn test_levels_announced_once_per_crossing() {
    let (session, sink, clock) = session_over(Arc::new(MemoryStore::new()));
    chat_for_days(&session, &clock, 7);

    let levels: Vec<u32> = sink.events().iter().map(|(_, up)| up.level).collect();
    assert_eq!(levels, (1..=9).collect::<Vec<u32>>());
    assert_eq!(sink.total_bonus(), 250);

    let user = session.cache().get(42).unwrap();
    assert_eq!(user.xp, 4_480);
    assert_eq!(user.level, 9);
}

#[test]
fn test_daily_counters_restart_each_day() {
    let (session, _sink, clock) = session_over(Arc::new(MemoryStore::new()));
    let msg = MessageEvent::text(42, "Ember", "good morning everyone");

    let first = session.handle_message(&msg).unwrap().unwrap();
    clock.advance(Duration::seconds(30));
    let second = session.handle_message(&msg).unwrap().unwrap();
    assert_eq!((first.xp_gain, second.xp_gain), (133, 100));

    clock.set(start() + Duration::days(1));
    let next_day = session.handle_message(&msg).unwrap().unwrap();
    assert_eq!(next_day.xp_gain, 133);
    assert_eq!(next_day.salary, 5);
}

#[test]
fn test_progress_survives_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("users.json");

    {
        let store = Arc::new(JsonFileStore::open(&path).unwrap());
        let (session, _sink, clock) = session_over(store);
        chat_for_days(&session, &clock, 2);
        let report = session.cache().flush();
        assert_eq!(report.written, 1);
        assert_eq!(report.failed, 0);
    }

    let reopened = JsonFileStore::open(&path).unwrap();
    let user = reopened.fetch(42).unwrap();
    assert_eq!(user.xp, 1_280);
    assert_eq!(user.level, 4);
    assert_eq!(user.coins, 50);
    assert_eq!(user.nick.as_deref(), Some("Ember"));
}

#[test]
fn test_failed_flush_is_retried() {
    let store = Arc::new(MemoryStore::new());
    let (session, _sink, clock) = session_over(store.clone());
    chat_for_days(&session, &clock, 1);

    store.set_unavailable(true);
    let report = session.cache().flush();
    assert_eq!(report.failed, 1);
    assert!(store.peek(42).map_or(true, |u| u.xp == 0));

    store.set_unavailable(false);
    let report = session.cache().flush();
    assert_eq!(report.written, 1);
    assert_eq!(store.peek(42).unwrap().xp, 640);
}

#[test]
fn test_members_progress_independently_across_threads() {
    let (session, sink, _clock) = session_over(Arc::new(MemoryStore::new()));
    let session = Arc::new(session);

    let handles: Vec<_> = (1..=4u64)
        .map(|user_id| {
            let session = Arc::clone(&session);
            thread::spawn(move || {
                let msg = MessageEvent::text(user_id, "Member", "chatting away here");
                for i in 0..10 {
                    let at = start() + Duration::seconds(30 * i);
                    session.handle_message_at(&msg, at).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    for user_id in 1..=4 {
        let user = session.cache().get(user_id).unwrap();
        assert_eq!(user.xp, 640);
        assert_eq!(user.level, 3);
        assert_eq!(user.messages_today, 10);
    }
    assert_eq!(sink.events().len(), 4 * 3);
    assert_eq!(session.cache().dirty_count(), 4);
}
