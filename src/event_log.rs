use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::structs::IntakeEvent;

/// Append-only, chronological list of every drink ever logged.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct EventLog {
    events: Vec<IntakeEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a log from persisted events. Events are kept in the order given.
    pub fn from_events(events: Vec<IntakeEvent>) -> Self {
        Self { events }
    }

    pub fn append(&mut self, volume_ml: u32, now: DateTime<FixedOffset>) -> &IntakeEvent {
        let previous = self.events.last();
        if let Some(prev) = previous {
            if now < prev.timestamp {
                warn!(
                    "Clock went backwards ({} < {}), recording a zero gap",
                    now, prev.timestamp
                );
            }
        }

        let event = IntakeEvent::new(volume_ml, now, previous);
        self.events.push(event);
        &self.events[self.events.len() - 1]
    }

    pub fn events(&self) -> &[IntakeEvent] {
        &self.events
    }

    pub fn last(&self) -> Option<&IntakeEvent> {
        self.events.last()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Lazily walks the events logged at or after `cutoff`, in log order.
    ///
    /// The log is only mostly chronological (see [`EventLog::append`]), so every event is
    /// checked rather than searching for a split point.
    pub fn since(&self, cutoff: DateTime<FixedOffset>) -> impl Iterator<Item = &IntakeEvent> {
        self.events.iter().filter(move |e| e.timestamp >= cutoff)
    }

    /// Events logged on the given local calendar day.
    pub fn logged_on(&self, date: NaiveDate) -> impl Iterator<Item = &IntakeEvent> {
        self.events.iter().filter(move |e| e.date() == date)
    }
}
