use std::collections::HashMap;

use chrono::{DateTime, Duration, FixedOffset};
use tracing::debug;

use crate::{
    event_log::EventLog,
    structs::{
        reminder_profile::{DEFAULT_AVERAGE_GAP_SECONDS, DEFAULT_OPTIMAL_HOURS},
        IntakeEvent, ReminderProfile,
    },
};

/// Events needed before the learned hours replace the defaults
pub const MIN_EVENTS_FOR_HOURS: usize = 10;
/// Events needed before the learned gap replaces the default
pub const MIN_EVENTS_FOR_GAP: usize = 5;

const MAX_OPTIMAL_HOURS: usize = 3;
/// Reminders never fire before this hour
const EARLIEST_REMINDER_HOUR: u32 = 8;

#[derive(Debug, Clone, PartialEq)]
pub struct LearningOutcome {
    pub profile: ReminderProfile,

    /// Enough events to trust the learned hours
    pub hours_learned: bool,

    /// Enough events to trust the learned gap
    pub gap_learned: bool,
}

/// Infers when the user tends to drink. Recomputes from scratch on every call.
#[derive(Debug, Clone, Default)]
pub struct PatternLearner {
    window_days: Option<u32>,
}

impl PatternLearner {
    pub fn new(window_days: Option<u32>) -> Self {
        Self { window_days }
    }

    /// Builds a fresh profile from the events in the learning window.
    pub fn learn(&self, log: &EventLog, now: DateTime<FixedOffset>) -> LearningOutcome {
        let events: Vec<&IntakeEvent> = match self.window_days {
            Some(days) => log.since(now - Duration::days(days as i64)).collect(),
            None => log.events().iter().collect(),
        };

        let hours = optimal_hours(&events);
        let gap = average_gap_seconds(&events);

        let outcome = LearningOutcome {
            hours_learned: hours.is_some(),
            gap_learned: gap.is_some(),
            profile: ReminderProfile {
                optimal_hours: hours.unwrap_or_else(|| DEFAULT_OPTIMAL_HOURS.to_vec()),
                average_gap_seconds: gap.unwrap_or(DEFAULT_AVERAGE_GAP_SECONDS),
            },
        };

        debug!(
            samples = events.len(),
            hours = ?outcome.profile.optimal_hours,
            gap = outcome.profile.average_gap_seconds,
            "Learned drinking pattern"
        );

        outcome
    }
}

/// Hours to remind at: one hour before each of the three most frequent drinking hours.
fn optimal_hours(events: &[&IntakeEvent]) -> Option<Vec<u32>> {
    if events.len() < MIN_EVENTS_FOR_HOURS {
        return None;
    }

    let mut hour_counts: HashMap<u32, usize> = HashMap::new();
    for event in events {
        *hour_counts.entry(event.hour()).or_default() += 1;
    }

    let mut ranked: Vec<(u32, usize)> = hour_counts.into_iter().collect();
    ranked.sort_by(|(a_hour, a_count), (b_hour, b_count)| {
        b_count.cmp(a_count).then(a_hour.cmp(b_hour))
    });

    let mut hours = Vec::with_capacity(MAX_OPTIMAL_HOURS);
    for (hour, _) in ranked.into_iter().take(MAX_OPTIMAL_HOURS) {
        let reminder_hour = hour.saturating_sub(1).max(EARLIEST_REMINDER_HOUR);
        // 8 and 9 both land on 8
        if !hours.contains(&reminder_hour) {
            hours.push(reminder_hour);
        }
    }

    Some(hours)
}

fn average_gap_seconds(events: &[&IntakeEvent]) -> Option<f64> {
    if events.len() < MIN_EVENTS_FOR_GAP {
        return None;
    }

    let gaps: Vec<f64> = events.iter().filter_map(|e| e.gap_since_last_secs).collect();
    if gaps.is_empty() {
        return None;
    }

    let mean = gaps.iter().sum::<f64>() / gaps.len() as f64;
    (mean > 0.0 && mean.is_finite()).then_some(mean)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    use super::*;

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<FixedOffset> {
        FixedOffset::west_opt(5 * 3600)
            .unwrap()
            .with_ymd_and_hms(2025, 10, day, hour, minute, 0)
            .unwrap()
    }

    fn log_at_hours(hours: &[u32]) -> EventLog {
        let mut log = EventLog::new();
        for (i, hour) in hours.iter().enumerate() {
            log.append(250, at(1 + i as u32, *hour, 15));
        }
        log
    }

    #[test]
    fn cold_start_keeps_default_hours() {
        let log = log_at_hours(&[20, 20, 20, 20, 20, 20, 20, 20, 20]);
        let outcome = PatternLearner::default().learn(&log, at(28, 12, 0));

        assert!(!outcome.hours_learned);
        assert_eq!(outcome.profile.optimal_hours, vec![9, 13, 17]);
    }

    #[test]
    fn learns_one_hour_before_habitual_hours() {
        let log = log_at_hours(&[8, 8, 8, 8, 8, 14, 14, 14, 20, 20]);
        let outcome = PatternLearner::default().learn(&log, at(28, 12, 0));

        assert!(outcome.hours_learned);
        assert_eq!(outcome.profile.optimal_hours, vec![8, 13, 19]);
    }

    #[test]
    fn frequency_ties_go_to_earlier_hour() {
        let log = log_at_hours(&[16, 16, 11, 11, 18, 18, 22, 22, 22, 13]);
        let outcome = PatternLearner::default().learn(&log, at(28, 12, 0));

        assert_eq!(outcome.profile.optimal_hours, vec![21, 10, 15]);
    }

    #[test]
    fn floored_hours_are_not_duplicated() {
        let log = log_at_hours(&[3, 3, 3, 3, 9, 9, 9, 15, 15, 2]);
        let outcome = PatternLearner::default().learn(&log, at(28, 12, 0));

        assert_eq!(outcome.profile.optimal_hours, vec![8, 14]);
        assert!(outcome.profile.is_valid());
    }

    #[test]
    fn gap_needs_five_events() {
        let mut log = EventLog::new();
        for i in 0..4 {
            log.append(200, at(1, 8 + i, 0));
        }
        let outcome = PatternLearner::default().learn(&log, at(1, 20, 0));
        assert!(!outcome.gap_learned);
        assert_eq!(outcome.profile.average_gap_seconds, 10800.0);

        log.append(200, at(1, 14, 0));
        let outcome = PatternLearner::default().learn(&log, at(1, 20, 0));
        assert!(outcome.gap_learned);
        // gaps: 1h, 1h, 1h, 3h
        assert_eq!(outcome.profile.average_gap_seconds, 6.0 * 3600.0 / 4.0);
    }

    #[test]
    fn window_limits_what_is_learned() {
        let mut log = EventLog::new();
        for day in 1..=10 {
            log.append(250, at(day, 20, 0));
        }
        for day in 20..=24 {
            log.append(250, at(day, 10, 0));
        }

        let everything = PatternLearner::new(None).learn(&log, at(25, 12, 0));
        assert_eq!(everything.profile.optimal_hours, vec![19, 9]);

        let recent = PatternLearner::new(Some(7)).learn(&log, at(25, 12, 0));
        assert!(!recent.hours_learned);
        assert_eq!(recent.profile.optimal_hours, vec![9, 13, 17]);
        assert!(recent.gap_learned);
    }
}
