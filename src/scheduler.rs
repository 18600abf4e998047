use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::trace;

use crate::{
    config::DEFAULT_CHECKPOINT_HOUR,
    messages::{self, MessageContext},
    notification::NotificationSink,
    structs::{NotificationRequest, ReminderProfile, ScheduleEntry},
};

/// Adaptive reminders fire somewhere in the first half hour of their hour
const MINUTE_SPREAD: u32 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SchedulerState {
    /// Nothing published
    #[default]
    Idle,
    /// The sink holds exactly these entries
    Scheduled(Vec<ScheduleEntry>),
}

/// Turns a reminder profile into the set of published daily reminders.
#[derive(Debug)]
pub struct ReminderScheduler<R = StdRng> {
    state: SchedulerState,
    checkpoint_hour: u32,
    rng: R,
}

impl ReminderScheduler<StdRng> {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }
}

impl Default for ReminderScheduler<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> ReminderScheduler<R> {
    pub fn with_rng(rng: R) -> Self {
        Self {
            state: SchedulerState::Idle,
            checkpoint_hour: DEFAULT_CHECKPOINT_HOUR,
            rng,
        }
    }

    pub fn set_checkpoint_hour(&mut self, hour: u32) {
        self.checkpoint_hour = hour;
    }

    pub fn state(&self) -> &SchedulerState {
        &self.state
    }

    pub fn is_scheduled(&self) -> bool {
        matches!(self.state, SchedulerState::Scheduled(_))
    }

    /// Entries for `profile` with freshly drawn minutes. The checkpoint always comes first.
    pub fn plan(&mut self, profile: &ReminderProfile) -> Vec<ScheduleEntry> {
        let mut entries = Vec::with_capacity(profile.optimal_hours.len() + 1);
        entries.push(ScheduleEntry::checkpoint(self.checkpoint_hour));
        for &hour in &profile.optimal_hours {
            let minute = self.rng.random_range(0..MINUTE_SPREAD);
            entries.push(ScheduleEntry::adaptive(hour, minute));
        }
        entries
    }

    /// Replaces everything pending in `sink` with a fresh schedule for `profile`.
    pub fn publish(
        &mut self,
        profile: &ReminderProfile,
        sink: &dyn NotificationSink,
        ctx: &MessageContext<'_>,
    ) -> &[ScheduleEntry] {
        let entries = self.plan(profile);

        sink.clear_pending();
        for entry in &entries {
            let title = messages::title(&mut self.rng, entry.kind);
            let body = messages::body(&mut self.rng, entry, ctx);
            sink.add_request(NotificationRequest::new(entry, title, body));
        }

        trace!("Published {} reminders", entries.len());
        self.state = SchedulerState::Scheduled(entries);
        match &self.state {
            SchedulerState::Scheduled(entries) => entries.as_slice(),
            SchedulerState::Idle => &[],
        }
    }

    /// Clears the sink and goes back to idle.
    pub fn cancel(&mut self, sink: &dyn NotificationSink) {
        sink.clear_pending();
        if self.is_scheduled() {
            trace!("Cancelled all reminders");
        }
        self.state = SchedulerState::Idle;
    }
}
