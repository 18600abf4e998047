use std::sync::Arc;

use chrono::{DateTime, Days, FixedOffset};
use tokio::{select, sync::Notify};
use tracing::{instrument, trace};

use crate::engine::HydrationEngine;

/// Wake up at least this often, in case the machine slept through midnight
const MAX_WAIT: std::time::Duration = std::time::Duration::from_secs(15 * 60);

/// Keeps the day rollover happening while nobody is logging anything.
#[instrument(skip_all)]
pub async fn watch_day_changes(engine: Arc<HydrationEngine>, shutdown: Arc<Notify>) {
    loop {
        let wait = until_next_midnight(engine.now()).min(MAX_WAIT);
        trace!("Checking for a new day in {wait:?}");

        select! {
            () = tokio::time::sleep(wait) => {
                if engine.check_for_new_day() {
                    trace!("Rolled over to a new day");
                }
            },
            () = shutdown.notified() => {
                trace!("Shutting down day watch");
                break;
            },
        };
    }
}

/// Time left until local midnight, plus a second so the date has surely changed.
pub fn until_next_midnight(now: DateTime<FixedOffset>) -> std::time::Duration {
    let next_midnight = now
        .date_naive()
        .checked_add_days(Days::new(1))
        .and_then(|day| day.and_hms_opt(0, 0, 1));

    match next_midnight {
        Some(next) => (next - now.naive_local())
            .to_std()
            .unwrap_or(std::time::Duration::from_secs(1)),
        None => MAX_WAIT,
    }
}
