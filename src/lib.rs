//! Learns when you tend to drink water and schedules hydration reminders around it.
//!
//! [`HydrationEngine`] is the single owner of state: the append-only [`EventLog`],
//! the 30-day [`HistoryStore`], the learned [`ReminderProfile`] and the
//! [`ReminderScheduler`] that hands reminders to a [`NotificationSink`].

pub mod analytics;
pub mod clock;
pub mod config;
pub mod engine;
pub mod errors;
pub mod event_log;
pub mod history;
pub mod learning;
pub mod logging;
pub mod messages;
pub mod notification;
pub mod paths;
pub mod scheduler;
pub mod storage;
pub mod structs;
pub mod tasks;

pub use engine::{EngineSnapshot, HydrationEngine, LoggedIntake};
pub use errors::{EngineError, StorageError};
pub use event_log::EventLog;
pub use history::HistoryStore;
pub use notification::{NotificationAuthorizer, NotificationSink};
pub use scheduler::ReminderScheduler;
pub use structs::{DailyRecord, IntakeEvent, ReminderProfile, ScheduleEntry};
