use chrono::NaiveDate;
use serde::Serialize;

use crate::{event_log::EventLog, history::HistoryStore};

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    GoalAchieved,
    OnTrack,
    BehindGoal,
    FarBehind,
}

impl GoalStatus {
    pub fn from_progress(percent: f64) -> Self {
        if percent >= 100.0 {
            Self::GoalAchieved
        } else if percent >= 75.0 {
            Self::OnTrack
        } else if percent >= 50.0 {
            Self::BehindGoal
        } else {
            Self::FarBehind
        }
    }
}

/// How a single day went.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub total_ml: u32,
    pub goal_ml: u32,
    /// Rounded to one decimal. 0 when there is no goal.
    pub progress_percent: f64,
    pub logs_count: usize,
    /// Rounded to one decimal. 0 when nothing was logged.
    pub average_per_log_ml: f64,
    pub status: GoalStatus,
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

impl DailySummary {
    /// Summarizes `date` from the raw event log. The goal comes from that day's history
    /// record, or `fallback_goal_ml` when the day has fallen out of the window.
    pub fn for_date(
        date: NaiveDate,
        log: &EventLog,
        history: &HistoryStore,
        fallback_goal_ml: u32,
    ) -> Self {
        let (total_ml, logs_count) = log
            .logged_on(date)
            .fold((0u32, 0usize), |(total, count), e| {
                (total.saturating_add(e.volume_ml), count + 1)
            });

        let goal_ml = history
            .window()
            .get(date)
            .map_or(fallback_goal_ml, |r| r.goal_ml);

        let progress_percent = if goal_ml > 0 {
            round_one_decimal(total_ml as f64 / goal_ml as f64 * 100.0)
        } else {
            0.0
        };

        let average_per_log_ml = if logs_count > 0 {
            round_one_decimal(total_ml as f64 / logs_count as f64)
        } else {
            0.0
        };

        Self {
            date,
            total_ml,
            goal_ml,
            progress_percent,
            logs_count,
            average_per_log_ml,
            status: GoalStatus::from_progress(progress_percent),
        }
    }
}
