use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use chrono::{DateTime, Duration, FixedOffset, TimeZone};
use hydrate_engine::{
    clock::{Clock, ManualClock},
    config::EngineConfig,
    notification::StaticAuthorizer,
    errors::StorageError,
    storage::{self, MemorySettingsStore, SettingsStore},
    structs::{NotificationRequest, ReminderKind},
    HydrationEngine, NotificationSink,
};
use pretty_assertions::assert_eq;

#[derive(Default)]
struct RecordingSink {
    pending: Mutex<Vec<NotificationRequest>>,
    clears: Mutex<usize>,
}

impl NotificationSink for RecordingSink {
    fn clear_pending(&self) {
        self.pending.lock().unwrap().clear();
        *self.clears.lock().unwrap() += 1;
    }

    fn add_request(&self, request: NotificationRequest) {
        let mut pending = self.pending.lock().unwrap();
        pending.retain(|r| r.identifier != request.identifier);
        pending.push(request);
    }
}

impl RecordingSink {
    fn identifiers(&self) -> Vec<String> {
        let mut ids: Vec<_> = self
            .pending
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.identifier.clone())
            .collect();
        ids.sort();
        ids
    }

    fn checkpoint(&self) -> Option<NotificationRequest> {
        self.pending
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.identifier == "daily-completion-check")
            .cloned()
    }
}

struct Harness {
    clock: Arc<ManualClock>,
    sink: Arc<RecordingSink>,
    store: Arc<MemorySettingsStore>,
    engine: Arc<HydrationEngine>,
}

fn local(day: u32, hour: u32, minute: u32) -> DateTime<FixedOffset> {
    FixedOffset::east_opt(3 * 3600)
        .unwrap()
        .with_ymd_and_hms(2025, 10, day, hour, minute, 0)
        .unwrap()
}

fn harness_at(now: DateTime<FixedOffset>) -> Harness {
    let clock = Arc::new(ManualClock::new(now));
    let sink = Arc::new(RecordingSink::default());
    let store = Arc::new(MemorySettingsStore::default());
    let engine = HydrationEngine::builder(store.clone(), sink.clone())
        .clock(clock.clone())
        .seed(11)
        .build()
        .unwrap();

    Harness {
        clock,
        sink,
        store,
        engine: Arc::new(engine),
    }
}

impl Harness {
    fn rebuild(&self) -> HydrationEngine {
        HydrationEngine::builder(self.store.clone(), self.sink.clone())
            .clock(self.clock.clone())
            .seed(12)
            .build()
            .unwrap()
    }
}

#[tokio::test]
async fn permission_grant_publishes_default_schedule() {
    let h = harness_at(local(6, 7, 0));

    h.engine
        .request_permission(Arc::new(StaticAuthorizer(true)))
        .await
        .unwrap();

    assert_eq!(
        h.sink.identifiers(),
        vec![
            "adaptive-reminder-13",
            "adaptive-reminder-17",
            "adaptive-reminder-9",
            "daily-completion-check",
        ]
    );
    let snapshot = h.engine.snapshot();
    assert!(snapshot.has_permission);
    assert_eq!(snapshot.schedule.len(), 4);
    assert!(snapshot
        .schedule
        .iter()
        .filter(|e| e.kind == ReminderKind::Adaptive)
        .all(|e| e.minute < 30));

    let checkpoint = h.sink.checkpoint().unwrap();
    assert_eq!((checkpoint.hour, checkpoint.minute), (20, 0));
    assert!(checkpoint.body.contains("2250ml"));
}

#[tokio::test]
async fn denied_permission_stays_idle() {
    let h = harness_at(local(6, 7, 0));

    h.engine
        .request_permission(Arc::new(StaticAuthorizer(false)))
        .await
        .unwrap();
    h.engine.log_intake(250).unwrap();

    assert!(h.sink.identifiers().is_empty());
    assert!(h.engine.snapshot().schedule.is_empty());
    assert!(!h.engine.reschedule());
}

#[test]
fn learned_hours_replace_default_reminders() {
    let h = harness_at(local(1, 8, 0));
    h.engine.set_permission(true);

    let hours = [8, 8, 8, 8, 8, 14, 14, 14, 20, 20];
    for (i, hour) in hours.iter().enumerate() {
        h.clock.set(local(1 + i as u32, *hour, 10));
        let logged = h.engine.log_intake(300).unwrap();
        assert_eq!(logged.hours_learned, i + 1 >= 10);
        assert!(logged.rescheduled);
    }

    assert_eq!(h.engine.snapshot().profile.optimal_hours, vec![8, 13, 19]);
    assert_eq!(
        h.sink.identifiers(),
        vec![
            "adaptive-reminder-13",
            "adaptive-reminder-19",
            "adaptive-reminder-8",
            "daily-completion-check",
        ]
    );
    // every reschedule starts from a clean slate: grant + 10 logs + day rollovers
    assert!(*h.sink.clears.lock().unwrap() >= 11);
}

#[test]
fn revoking_permission_clears_reminders() {
    let h = harness_at(local(6, 7, 0));
    h.engine.set_permission(true);
    assert_eq!(h.sink.identifiers().len(), 4);

    h.engine.set_permission(false);
    assert!(h.sink.identifiers().is_empty());
    assert!(h.engine.snapshot().schedule.is_empty());

    h.engine.log_intake(500).unwrap();
    assert!(h.sink.identifiers().is_empty());
}

#[test]
fn day_rollover_happens_once() {
    let h = harness_at(local(6, 21, 0));
    h.engine.log_intake(2250).unwrap();

    assert!(!h.engine.check_for_new_day());

    h.clock.set(local(7, 0, 5));
    assert!(h.engine.check_for_new_day());
    let after_first = h.engine.snapshot();
    assert!(!h.engine.check_for_new_day());

    assert_eq!(h.engine.snapshot(), after_first);
    assert_eq!(after_first.today_intake_ml, 0);
    assert_eq!(after_first.history.len(), 2);
    assert_eq!(after_first.streak_days, 1);
}

#[test]
fn logging_after_midnight_rolls_over_first() {
    let h = harness_at(local(6, 23, 0));
    h.engine.log_intake(400).unwrap();

    h.clock.advance(Duration::hours(2));
    let logged = h.engine.log_intake(300).unwrap();

    assert!(logged.rolled_over);
    assert_eq!(logged.today_total_ml, 300);
    let totals: Vec<_> = h
        .engine
        .snapshot()
        .history
        .iter()
        .map(|r| r.total_intake_ml)
        .collect();
    assert_eq!(totals, vec![400, 300]);
}

#[test]
fn state_survives_restart() {
    let h = harness_at(local(6, 9, 0));
    h.engine
        .update_config(EngineConfig {
            daily_goal_ml: 3000,
            ..Default::default()
        })
        .unwrap();
    for _ in 0..6 {
        h.engine.log_intake(250).unwrap();
        h.clock.advance(Duration::minutes(45));
    }

    let before = h.engine.snapshot();
    let restarted = h.rebuild();
    let after = restarted.snapshot();

    assert_eq!(after.today_intake_ml, 1500);
    assert_eq!(after.daily_goal_ml, 3000);
    assert_eq!(after.history, before.history);
    assert_eq!(after.profile, before.profile);
    assert_eq!(after.profile.average_gap_seconds, 45.0 * 60.0);
    assert_eq!(after.event_count, 6);
    assert!(!after.has_permission);
}

#[test]
fn corrupted_state_falls_back_to_defaults() {
    let h = harness_at(local(6, 9, 0));
    h.store.set(storage::DAILY_HISTORY_KEY, b"[{]").unwrap();
    h.store.set(storage::DRINKING_PATTERN_KEY, b"42").unwrap();
    h.store.set(storage::SETTINGS_KEY, b"nope").unwrap();

    let engine = h.rebuild();
    let snapshot = engine.snapshot();

    assert!(snapshot.history.is_empty());
    assert_eq!(snapshot.event_count, 0);
    assert_eq!(snapshot.daily_goal_ml, 2250);
    assert_eq!(snapshot.profile.optimal_hours, vec![9, 13, 17]);
    assert_eq!(snapshot.weekly_average_ml, 0.0);
}

#[test]
fn partner_message_is_used_for_checkpoint() {
    let h = harness_at(local(6, 9, 0));
    h.engine.set_permission(true);

    let mut config = EngineConfig::default();
    config.partner.connected = true;
    config.partner.name = "Alex".into();
    config.partner.message = "Alex says: {volume}ml to go".into();
    h.engine.update_config(config).unwrap();
    h.engine.log_intake(250).unwrap();

    assert_eq!(h.sink.checkpoint().unwrap().body, "Alex says: 2000ml to go");
}

#[tokio::test]
async fn observers_see_every_change() {
    let h = harness_at(local(6, 9, 0));
    let mut changes = h.engine.subscribe();

    h.engine.log_intake(330).unwrap();
    changes.changed().await.unwrap();
    assert_eq!(changes.borrow_and_update().today_intake_ml, 330);

    h.engine.log_intake(170).unwrap();
    changes.changed().await.unwrap();
    assert_eq!(changes.borrow_and_update().today_intake_ml, 500);
}

#[test]
fn recent_events_are_read_lazily() {
    let h = harness_at(local(1, 9, 0));
    for day in 1..=10 {
        h.clock.set(local(day, 12, 0));
        h.engine.log_intake(100 * day).unwrap();
    }

    let last_week: u32 = h.engine.with_events(|log| {
        log.since(local(10, 12, 0) - Duration::days(7))
            .map(|e| e.volume_ml)
            .sum()
    });
    assert_eq!(last_week, (3..=10).map(|d| 100 * d).sum::<u32>());

    let summary = h.engine.daily_summary(local(10, 0, 0).date_naive());
    assert_eq!(summary.total_ml, 1000);
    assert_eq!(summary.logs_count, 1);
}

/// Counts how many separate commits reach the underlying store.
#[derive(Default)]
struct CountingStore {
    inner: MemorySettingsStore,
    commits: AtomicUsize,
}

impl SettingsStore for CountingStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value)
    }

    fn set_many(&self, entries: &[(&str, Vec<u8>)]) -> Result<(), StorageError> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        self.inner.set_many(entries)
    }
}

#[test]
fn each_logged_intake_is_one_commit() {
    let clock = Arc::new(ManualClock::new(local(6, 9, 0)));
    let store = Arc::new(CountingStore::default());
    let engine = HydrationEngine::builder(store.clone(), Arc::new(RecordingSink::default()))
        .clock(clock.clone())
        .seed(5)
        .build()
        .unwrap();
    assert_eq!(store.commits.load(Ordering::SeqCst), 0);

    for i in 1..=3 {
        engine.log_intake(250).unwrap();
        assert_eq!(store.commits.load(Ordering::SeqCst), i);
    }

    let restored = storage::load_state(&*store, None, clock.now());
    assert_eq!(restored.events.len(), 3);
    assert_eq!(restored.history.today_intake(clock.now()), 750);
}
