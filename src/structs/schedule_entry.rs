use serde::{Deserialize, Serialize};

pub const CHECKPOINT_IDENTIFIER: &str = "daily-completion-check";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ReminderKind {
    /// Fixed end-of-day progress check
    Checkpoint,
    /// Derived from the learned drinking hours
    Adaptive,
}

/// A daily repeating trigger time.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleEntry {
    pub hour: u32,
    pub minute: u32,
    pub kind: ReminderKind,
}

impl ScheduleEntry {
    pub fn checkpoint(hour: u32) -> Self {
        Self {
            hour,
            minute: 0,
            kind: ReminderKind::Checkpoint,
        }
    }

    pub fn adaptive(hour: u32, minute: u32) -> Self {
        Self {
            hour,
            minute,
            kind: ReminderKind::Adaptive,
        }
    }

    /// Stable identifier, so re-publishing replaces the previous request of the same kind.
    pub fn identifier(&self) -> String {
        match self.kind {
            ReminderKind::Checkpoint => CHECKPOINT_IDENTIFIER.to_string(),
            ReminderKind::Adaptive => format!("adaptive-reminder-{}", self.hour),
        }
    }
}

/// What gets handed to the notification sink.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NotificationRequest {
    pub identifier: String,
    pub hour: u32,
    pub minute: u32,
    pub title: String,
    pub body: String,
    pub repeats: bool,
}

impl NotificationRequest {
    pub fn new(entry: &ScheduleEntry, title: String, body: String) -> Self {
        Self {
            identifier: entry.identifier(),
            hour: entry.hour,
            minute: entry.minute,
            title,
            body,
            repeats: true,
        }
    }
}
