pub mod daily_record;
pub mod intake_event;
pub mod reminder_profile;
pub mod schedule_entry;

pub use daily_record::DailyRecord;
pub use intake_event::IntakeEvent;
pub use reminder_profile::ReminderProfile;
pub use schedule_entry::{NotificationRequest, ReminderKind, ScheduleEntry};
