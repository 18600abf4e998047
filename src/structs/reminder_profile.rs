use serde::{Deserialize, Serialize};

pub const DEFAULT_OPTIMAL_HOURS: [u32; 3] = [9, 13, 17];
pub const DEFAULT_AVERAGE_GAP_SECONDS: f64 = 3.0 * 60.0 * 60.0;

/// What the learner currently believes about the user's drinking rhythm.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ReminderProfile {
    /// Up to three hours of day (8..=23) to remind at
    pub optimal_hours: Vec<u32>,

    pub average_gap_seconds: f64,
}

impl Default for ReminderProfile {
    fn default() -> Self {
        Self {
            optimal_hours: DEFAULT_OPTIMAL_HOURS.to_vec(),
            average_gap_seconds: DEFAULT_AVERAGE_GAP_SECONDS,
        }
    }
}

impl ReminderProfile {
    /// Whether a deserialized profile still respects its invariants.
    pub fn is_valid(&self) -> bool {
        self.optimal_hours.len() <= 3
            && self.optimal_hours.iter().all(|h| (8..=23).contains(h))
            && self.average_gap_seconds.is_finite()
            && self.average_gap_seconds > 0.0
    }
}
