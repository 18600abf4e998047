use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::Serialize;
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, instrument, trace, warn};

use crate::{
    analytics::DailySummary,
    clock::{Clock, SystemClock},
    config::EngineConfig,
    errors::EngineError,
    event_log::EventLog,
    learning::PatternLearner,
    messages::MessageContext,
    notification::{NotificationAuthorizer, NotificationSink},
    scheduler::{ReminderScheduler, SchedulerState},
    storage::{self, PersistedState, SettingsStore},
    structs::{DailyRecord, IntakeEvent, ReminderProfile, ScheduleEntry},
};

/// A consistent copy of everything a display needs.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct EngineSnapshot {
    pub today: NaiveDate,
    pub today_intake_ml: u32,
    pub daily_goal_ml: u32,
    pub completion_ratio: Option<f64>,
    pub weekly_average_ml: f64,
    pub streak_days: u32,
    pub best_day: Option<DailyRecord>,
    pub history: Vec<DailyRecord>,
    pub profile: ReminderProfile,
    /// Empty while no reminders are published
    pub schedule: Vec<ScheduleEntry>,
    pub has_permission: bool,
    pub event_count: usize,
    pub last_intake: Option<IntakeEvent>,
    pub config: EngineConfig,
}

/// Result of [`HydrationEngine::log_intake`].
#[derive(Debug, Clone, PartialEq)]
pub struct LoggedIntake {
    pub event: IntakeEvent,
    pub today_total_ml: u32,
    /// The day changed since the previous mutation
    pub rolled_over: bool,
    /// Enough events to replace the default hours
    pub hours_learned: bool,
    pub rescheduled: bool,
}

struct EngineState {
    data: PersistedState,
    learner: PatternLearner,
    scheduler: ReminderScheduler,
    has_permission: bool,
}

impl EngineState {
    fn publish(&mut self, sink: &dyn NotificationSink, now: DateTime<FixedOffset>) {
        let remaining_ml = self
            .data
            .history
            .today(now)
            .map_or(self.data.config.daily_goal_ml, |r| r.remaining_ml());
        let ctx = MessageContext {
            template: self.data.config.checkpoint_template(),
            remaining_ml,
        };
        self.scheduler.publish(&self.data.profile, sink, &ctx);
    }

    fn relearn(&mut self, now: DateTime<FixedOffset>) -> bool {
        let outcome = self.learner.learn(&self.data.events, now);
        self.data.profile = outcome.profile;
        outcome.hours_learned
    }

    fn snapshot(&self, now: DateTime<FixedOffset>) -> EngineSnapshot {
        let history = &self.data.history;
        let today = history.today(now);

        EngineSnapshot {
            today: now.date_naive(),
            today_intake_ml: history.today_intake(now),
            daily_goal_ml: self.data.config.daily_goal_ml,
            completion_ratio: today.and_then(|r| r.completion_ratio()),
            weekly_average_ml: history.weekly_average(now),
            streak_days: history.current_streak(now),
            best_day: history.best_day().copied(),
            history: history.records().to_vec(),
            profile: self.data.profile.clone(),
            schedule: match self.scheduler.state() {
                SchedulerState::Scheduled(entries) => entries.clone(),
                SchedulerState::Idle => Vec::new(),
            },
            has_permission: self.has_permission,
            event_count: self.data.events.len(),
            last_intake: self.data.events.last().copied(),
            config: self.data.config.clone(),
        }
    }
}

pub struct EngineBuilder {
    store: Arc<dyn SettingsStore>,
    sink: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
    config: Option<EngineConfig>,
    seed: Option<u64>,
}

impl EngineBuilder {
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Use this config instead of the stored settings.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Seeds the reminder minute randomization.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn build(self) -> Result<HydrationEngine, EngineError> {
        if let Some(config) = &self.config {
            config.validate()?;
        }

        let now = self.clock.now();
        let mut data = storage::load_state(&*self.store, self.config, now);
        let rolled_over = data.history.ensure_current_day(now);

        let mut scheduler = match self.seed {
            Some(seed) => ReminderScheduler::seeded(seed),
            None => ReminderScheduler::new(),
        };
        scheduler.set_checkpoint_hour(data.config.checkpoint_hour);

        let state = EngineState {
            learner: PatternLearner::new(data.config.learning_window_days),
            data,
            scheduler,
            has_permission: false,
        };

        if rolled_over {
            if let Err(e) = storage::save_state(&*self.store, &state.data, now) {
                warn!("Unable to save state after day rollover: {e}");
            }
        }

        let (changes, _) = watch::channel(state.snapshot(now));
        debug!(
            events = state.data.events.len(),
            days = state.data.history.records().len(),
            "Engine ready"
        );

        Ok(HydrationEngine {
            state: RwLock::new(state),
            sink: self.sink,
            store: self.store,
            clock: self.clock,
            changes,
        })
    }
}

/// Owns all hydration state. Mutations are serialized through one lock; reads get copies.
pub struct HydrationEngine {
    state: RwLock<EngineState>,
    sink: Arc<dyn NotificationSink>,
    store: Arc<dyn SettingsStore>,
    clock: Arc<dyn Clock>,
    changes: watch::Sender<EngineSnapshot>,
}

impl HydrationEngine {
    pub fn builder(
        store: Arc<dyn SettingsStore>,
        sink: Arc<dyn NotificationSink>,
    ) -> EngineBuilder {
        EngineBuilder {
            store,
            sink,
            clock: Arc::new(SystemClock),
            config: None,
            seed: None,
        }
    }

    /// Current time according to the engine's clock.
    pub fn now(&self) -> DateTime<FixedOffset> {
        self.clock.now()
    }

    fn read(&self) -> RwLockReadGuard<'_, EngineState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, EngineState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    fn persist(&self, state: &EngineState, now: DateTime<FixedOffset>) {
        if let Err(e) = storage::save_state(&*self.store, &state.data, now) {
            warn!("Unable to save state: {e}");
        }
    }

    /// Tells observers about the new state. Must be called with the state lock released.
    fn notify(&self) {
        self.changes.send_replace(self.snapshot());
    }

    /// Logs a drink, learns from it and, with permission, republishes reminders.
    #[instrument(skip(self))]
    pub fn log_intake(&self, volume_ml: u32) -> Result<LoggedIntake, EngineError> {
        if volume_ml == 0 {
            return Err(EngineError::InvalidVolume);
        }

        let now = self.clock.now();
        let logged = {
            let mut guard = self.write();
            let state = &mut *guard;

            let rolled_over = state.data.history.ensure_current_day(now);
            let event = *state.data.events.append(volume_ml, now);
            let goal_ml = state.data.config.daily_goal_ml;
            state.data.history.record_intake(volume_ml, goal_ml, now);

            let hours_learned = state.relearn(now);
            let rescheduled = state.has_permission;
            if rescheduled {
                state.publish(&*self.sink, now);
            }

            self.persist(state, now);

            LoggedIntake {
                event,
                today_total_ml: state.data.history.today_intake(now),
                rolled_over,
                hours_learned,
                rescheduled,
            }
        };

        trace!("Logged {volume_ml}ml, {}ml today", logged.today_total_ml);
        self.notify();
        Ok(logged)
    }

    /// Runs the day transition if the date changed. Returns whether it did.
    #[instrument(skip(self))]
    pub fn check_for_new_day(&self) -> bool {
        let now = self.clock.now();
        let rolled_over = {
            let mut guard = self.write();
            let state = &mut *guard;

            let rolled_over = state.data.history.ensure_current_day(now);
            if rolled_over {
                trace!("New day, today is {}", now.date_naive());
                // The checkpoint body mentions what is left for today
                if state.has_permission {
                    state.publish(&*self.sink, now);
                }
                self.persist(state, now);
            }
            rolled_over
        };

        if rolled_over {
            self.notify();
        }
        rolled_over
    }

    /// Replaces the engine's configuration.
    #[instrument(skip_all)]
    pub fn update_config(&self, config: EngineConfig) -> Result<(), EngineError> {
        config.validate()?;

        let now = self.clock.now();
        {
            let mut guard = self.write();
            let state = &mut *guard;

            state.data.history.set_goal(config.daily_goal_ml, now);
            state.learner = PatternLearner::new(config.learning_window_days);
            state.scheduler.set_checkpoint_hour(config.checkpoint_hour);
            state.data.config = config;

            state.relearn(now);
            if state.has_permission {
                state.publish(&*self.sink, now);
            }
            self.persist(state, now);
        }

        debug!("Config updated");
        self.notify();
        Ok(())
    }

    /// Records the outcome of a permission request. A fresh grant publishes reminders
    /// once; a revocation clears them.
    #[instrument(skip(self))]
    pub fn set_permission(&self, granted: bool) {
        let now = self.clock.now();
        let changed = {
            let mut guard = self.write();
            let state = &mut *guard;

            let was_granted = state.has_permission;
            state.has_permission = granted;
            match (was_granted, granted) {
                (false, true) => state.publish(&*self.sink, now),
                (true, false) => state.scheduler.cancel(&*self.sink),
                _ => {}
            }
            was_granted != granted
        };

        if changed {
            self.notify();
        }
    }

    /// Asks `authorizer` for permission without waiting for the answer.
    pub fn request_permission(
        self: &Arc<Self>,
        authorizer: Arc<dyn NotificationAuthorizer>,
    ) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            let granted = authorizer.request_authorization().await;
            trace!("Notification permission granted: {granted}");
            engine.set_permission(granted);
        })
    }

    /// Republishes reminders from the current profile. Does nothing without permission.
    pub fn reschedule(&self) -> bool {
        let now = self.clock.now();
        let published = {
            let mut guard = self.write();
            let state = &mut *guard;
            if state.has_permission {
                state.publish(&*self.sink, now);
            }
            state.has_permission
        };

        if published {
            self.notify();
        }
        published
    }

    /// Clears every published reminder.
    pub fn cancel_reminders(&self) {
        self.write().scheduler.cancel(&*self.sink);
        self.notify();
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        let now = self.clock.now();
        self.read().snapshot(now)
    }

    /// Receives a fresh snapshot after every change.
    pub fn subscribe(&self) -> watch::Receiver<EngineSnapshot> {
        self.changes.subscribe()
    }

    /// Runs `f` against the event log under the read lock.
    pub fn with_events<T>(&self, f: impl FnOnce(&EventLog) -> T) -> T {
        f(&self.read().data.events)
    }

    pub fn daily_summary(&self, date: NaiveDate) -> DailySummary {
        let state = self.read();
        DailySummary::for_date(
            date,
            &state.data.events,
            &state.data.history,
            state.data.config.daily_goal_ml,
        )
    }

    /// Writes the current state, reporting failures instead of logging them.
    pub fn flush(&self) -> Result<(), EngineError> {
        let now = self.clock.now();
        storage::save_state(&*self.store, &self.read().data, now)?;
        Ok(())
    }
}
