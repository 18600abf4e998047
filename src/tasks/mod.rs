pub mod day_watch;

pub use day_watch::watch_day_changes;
