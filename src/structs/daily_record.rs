use {
    chrono::NaiveDate,
    serde::{Deserialize, Serialize},
};

/// One calendar day of intake measured against that day's goal.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyRecord {
    /// Local calendar day
    pub date: NaiveDate,

    pub total_intake_ml: u32,

    pub goal_ml: u32,
}

impl DailyRecord {
    pub fn new(date: NaiveDate, goal_ml: u32) -> Self {
        Self {
            date,
            total_intake_ml: 0,
            goal_ml,
        }
    }

    /// `total / goal`, or `None` when no goal is set.
    pub fn completion_ratio(&self) -> Option<f64> {
        if self.goal_ml == 0 {
            return None;
        }
        Some(self.total_intake_ml as f64 / self.goal_ml as f64)
    }

    pub fn is_completed(&self) -> bool {
        self.completion_ratio().is_some_and(|ratio| ratio >= 1.0)
    }

    /// Milliliters still missing to reach the goal
    pub fn remaining_ml(&self) -> u32 {
        self.goal_ml.saturating_sub(self.total_intake_ml)
    }
}
