use chrono::{DateTime, Days, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::structs::DailyRecord;

/// Number of distinct days kept in the history window
pub const HISTORY_CAPACITY: usize = 30;

/// Daily records ordered by date, at most one per day and at most [`HISTORY_CAPACITY`] days.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(from = "Vec<DailyRecord>", into = "Vec<DailyRecord>")]
pub struct HistoryWindow {
    records: Vec<DailyRecord>,
}

impl From<Vec<DailyRecord>> for HistoryWindow {
    /// Restores ordering, uniqueness and capacity on untrusted input. The last record
    /// wins when a date appears twice.
    fn from(records: Vec<DailyRecord>) -> Self {
        let mut window = HistoryWindow::default();
        for record in records {
            window.upsert(record);
        }
        window
    }
}

impl From<HistoryWindow> for Vec<DailyRecord> {
    fn from(window: HistoryWindow) -> Self {
        window.records
    }
}

impl HistoryWindow {
    pub fn records(&self) -> &[DailyRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, date: NaiveDate) -> Option<&DailyRecord> {
        self.records
            .binary_search_by_key(&date, |r| r.date)
            .ok()
            .map(|i| &self.records[i])
    }

    pub fn latest(&self) -> Option<&DailyRecord> {
        self.records.last()
    }

    /// Inserts or replaces the record for `record.date`, evicting the oldest days
    /// beyond capacity.
    pub fn upsert(&mut self, record: DailyRecord) {
        match self.records.binary_search_by_key(&record.date, |r| r.date) {
            Ok(i) => self.records[i] = record,
            Err(i) => {
                self.records.insert(i, record);
                self.evict();
            }
        }
    }

    /// The record for `date`, created with `goal_ml` when missing.
    /// Returns `None` only if the date is too old to fit in a full window.
    fn entry(&mut self, date: NaiveDate, goal_ml: u32) -> Option<&mut DailyRecord> {
        if self.get(date).is_none() {
            self.upsert(DailyRecord::new(date, goal_ml));
        }
        let i = self.records.binary_search_by_key(&date, |r| r.date).ok()?;
        Some(&mut self.records[i])
    }

    fn evict(&mut self) {
        while self.records.len() > HISTORY_CAPACITY {
            let evicted = self.records.remove(0);
            trace!("Evicting history record for {}", evicted.date);
        }
    }
}

/// Rolls intake into one record per day and answers the streak/average questions.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryStore {
    window: HistoryWindow,
    last_reset_date: NaiveDate,
    goal_ml: u32,
}

impl HistoryStore {
    pub fn new(goal_ml: u32, now: DateTime<FixedOffset>) -> Self {
        Self {
            window: HistoryWindow::default(),
            last_reset_date: now.date_naive(),
            goal_ml,
        }
    }

    pub fn from_parts(window: HistoryWindow, last_reset_date: NaiveDate, goal_ml: u32) -> Self {
        Self {
            window,
            last_reset_date,
            goal_ml,
        }
    }

    pub fn window(&self) -> &HistoryWindow {
        &self.window
    }

    pub fn records(&self) -> &[DailyRecord] {
        self.window.records()
    }

    pub fn last_reset_date(&self) -> NaiveDate {
        self.last_reset_date
    }

    pub fn goal_ml(&self) -> u32 {
        self.goal_ml
    }

    /// Today's record, if anything has been logged or rolled over into it.
    pub fn today(&self, now: DateTime<FixedOffset>) -> Option<&DailyRecord> {
        self.window.get(self.open_day(now))
    }

    /// Total for today, 0 when nothing is recorded yet.
    pub fn today_intake(&self, now: DateTime<FixedOffset>) -> u32 {
        self.today(now).map_or(0, |r| r.total_intake_ml)
    }

    /// The day that accepts intake at `now`. A clock behind the last reset keeps
    /// writing to the open day so closed days stay untouched.
    fn open_day(&self, now: DateTime<FixedOffset>) -> NaiveDate {
        now.date_naive().max(self.last_reset_date)
    }

    pub fn record_intake(&mut self, volume_ml: u32, goal_ml: u32, now: DateTime<FixedOffset>) {
        self.ensure_current_day(now);
        self.goal_ml = goal_ml;

        let today = self.open_day(now);
        if today != now.date_naive() {
            warn!("Clock is behind the last reset, adding intake to {today}");
        }
        match self.window.entry(today, goal_ml) {
            Some(record) => {
                record.total_intake_ml = record.total_intake_ml.saturating_add(volume_ml);
                record.goal_ml = goal_ml;
                trace!(
                    "Today's intake is now {}/{}ml",
                    record.total_intake_ml,
                    record.goal_ml
                );
            }
            None => warn!("No room in history for {today}, intake not aggregated"),
        }
    }

    /// Changes the goal for today and every day after it. Finished days keep theirs.
    pub fn set_goal(&mut self, goal_ml: u32, now: DateTime<FixedOffset>) {
        self.ensure_current_day(now);
        self.goal_ml = goal_ml;
        let today = self.open_day(now);
        if let Some(record) = self.window.entry(today, goal_ml) {
            record.goal_ml = goal_ml;
        }
    }

    /// Runs the day transition if the wall clock has moved past the last reset.
    pub fn ensure_current_day(&mut self, now: DateTime<FixedOffset>) -> bool {
        self.rollover_day(self.last_reset_date, now)
    }

    /// Closes `previous_date` and opens a zeroed record for `now`'s date.
    ///
    /// Returns `false` without touching anything when the transition already happened,
    /// so calling it twice for the same change of date is harmless.
    pub fn rollover_day(&mut self, previous_date: NaiveDate, now: DateTime<FixedOffset>) -> bool {
        let today = now.date_naive();
        if self.last_reset_date == today {
            return false;
        }
        if today < self.last_reset_date {
            warn!(
                "Clock is behind the last reset ({today} < {}), skipping rollover",
                self.last_reset_date
            );
            return false;
        }

        match self.window.get(previous_date) {
            Some(done) => trace!(
                "Closing {previous_date} at {}/{}ml",
                done.total_intake_ml,
                done.goal_ml
            ),
            None => trace!("Closing {previous_date} with nothing logged"),
        }

        if self.window.get(today).is_none() {
            self.window.upsert(DailyRecord::new(today, self.goal_ml));
        }
        self.last_reset_date = today;

        true
    }

    /// Mean daily total over the records of the last 7 days (today and the 6 before it),
    /// 0 when there are none.
    pub fn weekly_average(&self, now: DateTime<FixedOffset>) -> f64 {
        let Some(cutoff) = now.date_naive().checked_sub_days(Days::new(6)) else {
            return 0.0;
        };

        let (sum, count) = self
            .window
            .records()
            .iter()
            .filter(|r| r.date >= cutoff)
            .fold((0u64, 0u64), |(sum, count), r| {
                (sum + r.total_intake_ml as u64, count + 1)
            });

        if count == 0 {
            return 0.0;
        }
        sum as f64 / count as f64
    }

    /// Consecutive completed days ending today, or yesterday while today is still
    /// in progress. A missing day ends the streak.
    ///
    /// An unfinished today does not reset the count to 0; it is simply not counted yet.
    pub fn current_streak(&self, now: DateTime<FixedOffset>) -> u32 {
        let today = now.date_naive();
        let start = match self.window.get(today) {
            Some(record) if record.is_completed() => today,
            _ => match today.pred_opt() {
                Some(yesterday) => yesterday,
                None => return 0,
            },
        };

        let mut expected = start;
        let mut streak = 0;
        for record in self
            .window
            .records()
            .iter()
            .rev()
            .skip_while(|r| r.date > start)
        {
            if record.date != expected || !record.is_completed() {
                break;
            }
            streak += 1;
            match expected.pred_opt() {
                Some(day) => expected = day,
                None => break,
            }
        }

        streak
    }

    /// Highest total in the window; the most recent day wins a tie.
    pub fn best_day(&self) -> Option<&DailyRecord> {
        self.window.records().iter().max_by(|a, b| {
            a.total_intake_ml
                .cmp(&b.total_intake_ml)
                .then(a.date.cmp(&b.date))
        })
    }
}
