use {
    chrono::{DateTime, Duration, FixedOffset, NaiveDate, Timelike},
    serde::{Deserialize, Serialize},
};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct IntakeEvent {
    /// Local wall-clock time of the drink, with the offset it was logged in
    pub timestamp: DateTime<FixedOffset>,

    /// Amount of water drank in milliliters
    pub volume_ml: u32,

    /// Seconds since the previous drink. `None` for the very first one.
    pub gap_since_last_secs: Option<f64>,
}

impl IntakeEvent {
    pub fn new(
        volume_ml: u32,
        timestamp: DateTime<FixedOffset>,
        previous: Option<&IntakeEvent>,
    ) -> Self {
        let gap_since_last_secs = previous.map(|prev| {
            let gap = timestamp.signed_duration_since(prev.timestamp);
            (gap.num_milliseconds() as f64 / 1000.0).max(0.0)
        });

        Self {
            timestamp,
            volume_ml,
            gap_since_last_secs,
        }
    }

    /// Local hour of day the drink was logged at, 0 to 23
    pub fn hour(&self) -> u32 {
        self.timestamp.hour()
    }

    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    pub fn gap_since_last(&self) -> Option<Duration> {
        self.gap_since_last_secs
            .map(|secs| Duration::milliseconds((secs * 1000.0) as i64))
    }
}
